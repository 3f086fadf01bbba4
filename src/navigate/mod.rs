//! Navigate module
//!
//! Resolves client path parameters against the session's current
//! directory.

mod operations;

// Re-export public types and functions
pub use operations::{parent_directory, resolve_path};
