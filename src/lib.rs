//! Solo FTP Server
//!
//! A single-session FTP server whose whole protocol state machine is
//! advanced by an external poll tick.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod navigate;
pub mod protocol;
pub mod server;
pub mod storage;
pub mod transfer;
pub mod utils;

pub use config::ServerConfig;
pub use server::FtpServer;
