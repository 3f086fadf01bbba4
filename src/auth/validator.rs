//! Authentication validator
//!
//! Checks the USER and PASS phases of a login against the configured
//! credentials.

use super::credentials::Credentials;
use crate::error::AuthError;
use crate::protocol::Command;

/// Validates the command received while waiting for USER.
pub fn validate_user(command: &Command, credentials: &Credentials) -> Result<(), AuthError> {
    match command {
        Command::USER(username) if username == credentials.username() => Ok(()),
        Command::USER(username) => Err(AuthError::UserNotFound(username.clone())),
        other => Err(AuthError::UnexpectedCommand {
            expected: "USER",
            received: other.verb().to_string(),
        }),
    }
}

/// Validates the command received while waiting for PASS.
pub fn validate_password(command: &Command, credentials: &Credentials) -> Result<(), AuthError> {
    match command {
        Command::PASS(password) if credentials.password_matches(password) => Ok(()),
        Command::PASS(_) => Err(AuthError::InvalidPassword(
            credentials.username().to_string(),
        )),
        other => Err(AuthError::UnexpectedCommand {
            expected: "PASS",
            received: other.verb().to_string(),
        }),
    }
}
