//! Transfer module for FTP server
//!
//! Handles the connection collaborators, data channel negotiation and the
//! chunked file transfer engine.

pub mod connection;
pub mod data_channel;
pub mod file_ops;
pub mod memory;
pub mod modes;
pub mod tcp;

// Re-export key types and functions
pub use connection::{Connection, Transport};
pub use data_channel::DataChannel;
pub use file_ops::{Transfer, TransferDirection, TransferProgress, TransferSummary, abort_transfer};
pub use memory::{MemoryConnection, MemoryPeer, MemoryTransport};
pub use modes::{TransferMode, format_endpoint, parse_port_argument};
pub use tcp::{TcpConnection, TcpTransport};
