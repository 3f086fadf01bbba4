//! Server core functionality
//!
//! This module contains the session state machine driven by the poll tick.

pub mod core;

pub use core::{FtpServer, VERSION};
