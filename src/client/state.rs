//! Module `client`
//!
//! Defines the `Session` value holding everything the server knows about the
//! one connected client, and the `SessionState` phases it moves through.

use std::fmt;
use std::time::Instant;

use crate::protocol::parser::LineReader;

/// Phase of the control session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Previous client is being dropped.
    Disconnected,
    /// Clearing leftovers of the previous session.
    AwaitingConnection,
    /// Waiting for a control connection.
    Idle,
    AwaitingUser,
    AwaitingPassword,
    /// Logged in; commands are dispatched.
    Ready,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::AwaitingConnection => "awaiting connection",
            SessionState::Idle => "idle",
            SessionState::AwaitingUser => "awaiting user",
            SessionState::AwaitingPassword => "awaiting password",
            SessionState::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// State of the single live control session.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    current_directory: String,
    rename_source: Option<String>,
    command_deadline: Option<Instant>,
    line_reader: LineReader,
}

impl Session {
    pub fn new(line_capacity: usize) -> Self {
        Self {
            state: SessionState::Disconnected,
            current_directory: "/".to_string(),
            rename_source: None,
            command_deadline: None,
            line_reader: LineReader::new(line_capacity),
        }
    }

    /// Forgets everything about the previous client. The state is left as is.
    pub fn reset(&mut self) {
        self.current_directory = "/".to_string();
        self.rename_source = None;
        self.command_deadline = None;
        self.line_reader.clear();
    }

    // --------------------
    // Getter methods
    // --------------------

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current_directory(&self) -> &str {
        &self.current_directory
    }

    pub fn rename_source(&self) -> Option<&str> {
        self.rename_source.as_deref()
    }

    pub fn command_deadline(&self) -> Option<Instant> {
        self.command_deadline
    }

    /// Returns whether the deadline is set and has passed at `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.command_deadline.is_some_and(|deadline| now >= deadline)
    }

    pub fn line_reader_mut(&mut self) -> &mut LineReader {
        &mut self.line_reader
    }

    // --------------------
    // Setter methods
    // --------------------

    pub fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }

    pub fn set_current_directory(&mut self, path: String) {
        self.current_directory = path;
    }

    pub fn set_rename_source(&mut self, path: Option<String>) {
        self.rename_source = path;
    }

    /// Takes the pending rename source, leaving none behind.
    pub fn take_rename_source(&mut self) -> Option<String> {
        self.rename_source.take()
    }

    pub fn set_command_deadline(&mut self, deadline: Instant) {
        self.command_deadline = Some(deadline);
    }
}
