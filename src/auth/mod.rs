//! Authentication system
//!
//! Handles credential validation for the USER and PASS login phases.

pub mod credentials;
pub mod validator;

pub use credentials::{ANONYMOUS, Credentials};
pub use validator::{validate_password, validate_user};
