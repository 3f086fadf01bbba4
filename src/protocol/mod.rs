//! FTP Protocol implementation
//!
//! Handles command line parsing, command dispatch and response generation.

pub mod commands;
pub mod handlers;
pub mod parser;
pub mod responses;

pub use commands::{Command, CommandStatus};
pub use handlers::{CommandContext, handle_command};
pub use parser::{LineOutcome, LineReader, ParsedLine, parse_line};
