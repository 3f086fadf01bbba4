//! Client management system
//!
//! Holds the per-session state of the connected client.

pub mod state;

pub use state::{Session, SessionState};
