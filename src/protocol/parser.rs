//! FTP Command parsing
//!
//! Accumulates control connection bytes into command lines and splits each
//! line into a command token and its parameters.

use log::debug;

use crate::error::SyntaxError;
use crate::transfer::connection::Connection;

/// Longest accepted command token.
pub const MAX_TOKEN_LENGTH: usize = 4;

/// A complete, well-formed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    /// Uppercased command token.
    pub token: String,
    /// Everything after the first run of spaces following the token.
    pub params: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// No line terminator seen yet.
    Incomplete,
    Empty,
    Invalid(SyntaxError),
    Ready(ParsedLine),
}

/// Bounded accumulator for one command line.
#[derive(Debug)]
pub struct LineReader {
    buffer: Vec<u8>,
    capacity: usize,
    discarding: bool,
}

impl LineReader {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            capacity,
            discarding: false,
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.discarding = false;
    }

    /// Consumes pending bytes until one line is complete or nothing is left.
    ///
    /// Bytes after the line terminator stay in the connection for the next
    /// call, so commands are handled strictly one line at a time.
    pub fn poll<C: Connection + ?Sized>(&mut self, conn: &mut C) -> LineOutcome {
        while conn.available() {
            let Some(byte) = conn.read_byte() else {
                break;
            };
            if let Some(outcome) = self.push(byte) {
                return outcome;
            }
        }
        LineOutcome::Incomplete
    }

    /// Feeds one byte; returns an outcome when the byte ends a line or
    /// overflows the buffer.
    pub fn push(&mut self, byte: u8) -> Option<LineOutcome> {
        match byte {
            b'\r' => None,
            b'\n' => {
                if self.discarding {
                    self.discarding = false;
                    return None;
                }
                let line = std::mem::take(&mut self.buffer);
                Some(parse_line(&line))
            }
            _ if self.discarding => None,
            _ if self.buffer.len() >= self.capacity => {
                debug!("Command line exceeds {} bytes, discarding", self.capacity);
                self.buffer.clear();
                self.discarding = true;
                Some(LineOutcome::Invalid(SyntaxError::LineTooLong {
                    capacity: self.capacity,
                }))
            }
            b'\\' => {
                self.buffer.push(b'/');
                None
            }
            _ => {
                self.buffer.push(byte);
                None
            }
        }
    }
}

/// Splits a complete line into token and parameters.
pub fn parse_line(line: &[u8]) -> LineOutcome {
    if line.is_empty() {
        return LineOutcome::Empty;
    }

    let line = String::from_utf8_lossy(line);
    let (token, params) = match line.split_once(' ') {
        Some((token, rest)) => (token, rest.trim_start_matches(' ')),
        None => (line.as_ref(), ""),
    };

    if token.chars().count() > MAX_TOKEN_LENGTH {
        return LineOutcome::Invalid(SyntaxError::TokenTooLong(token.to_string()));
    }

    LineOutcome::Ready(ParsedLine {
        token: token.to_ascii_uppercase(),
        params: params.to_string(),
    })
}
