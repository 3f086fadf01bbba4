//! Error types
//!
//! Defines domain-specific error types for each module of the FTP server.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Command line parsing errors, reported to the client as `500 Syntax error`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("command line exceeds {capacity} bytes")]
    LineTooLong { capacity: usize },

    #[error("command token `{0}` is longer than 4 characters")]
    TokenTooLong(String),
}

/// Path resolution errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path of {len} bytes exceeds capacity of {capacity} bytes")]
    TooLong { len: usize, capacity: usize },
}

/// Authentication module errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("expected {expected}, got {received}")]
    UnexpectedCommand {
        expected: &'static str,
        received: String,
    },

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("invalid password for user: {0}")]
    InvalidPassword(String),
}

/// Storage module errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("not a file: {0}")]
    NotAFile(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("path traversal attempt: {0}")]
    PathTraversal(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Transfer module errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("invalid PORT command: {0}")]
    InvalidPortCommand(String),

    #[error("no data connection established")]
    NoDataConnection,
}

/// Errors that prevent the server from starting
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("invalid listen address {0}")]
    InvalidAddress(String),
}
