//! FTP Response handling
//!
//! Defines FTP response codes and formatting.

use log::debug;

use crate::transfer::connection::Connection;

/// Standard FTP response codes
pub const FILE_STATUS_OK: u16 = 150;
pub const OK: u16 = 200;
pub const SYSTEM_STATUS: u16 = 211;
pub const FILE_STATUS: u16 = 213;
pub const READY: u16 = 220;
pub const GOODBYE: u16 = 221;
pub const TRANSFER_COMPLETE: u16 = 226;
pub const PASSIVE_MODE: u16 = 227;
pub const LOGIN_SUCCESS: u16 = 230;
pub const FILE_ACTION_OK: u16 = 250;
pub const PATH_CREATED: u16 = 257;
pub const PASSWORD_REQUIRED: u16 = 331;
pub const PENDING_FURTHER_INFO: u16 = 350;
pub const CANT_OPEN_DATA_CONNECTION: u16 = 425;
pub const TRANSFER_ABORTED: u16 = 426;
pub const FILE_UNAVAILABLE: u16 = 450;
pub const LOCAL_ERROR: u16 = 451;
pub const SYNTAX_ERROR: u16 = 500;
pub const PARAMETER_SYNTAX_ERROR: u16 = 501;
pub const NOT_IMPLEMENTED: u16 = 502;
pub const BAD_SEQUENCE: u16 = 503;
pub const PARAMETER_NOT_IMPLEMENTED: u16 = 504;
pub const AUTH_FAILED: u16 = 530;
pub const FILE_NOT_FOUND: u16 = 550;
pub const FILE_NAME_NOT_ALLOWED: u16 = 553;

/// Format an FTP response message
pub fn format_response(code: u16, message: &str) -> String {
    format!("{} {}\r\n", code, message)
}

/// Format a continuation line of a multi-line reply
pub fn format_continuation(code: u16, message: &str) -> String {
    format!("{}-{}\r\n", code, message)
}

/// Writes a final reply line. A failed write only means the client is gone,
/// which the session notices on its next read.
pub fn send_response<C: Connection + ?Sized>(conn: &mut C, code: u16, message: &str) {
    write_reply(conn, &format_response(code, message));
}

pub fn send_continuation<C: Connection + ?Sized>(conn: &mut C, code: u16, message: &str) {
    write_reply(conn, &format_continuation(code, message));
}

/// Writes an unnumbered line inside a multi-line reply.
pub fn send_line<C: Connection + ?Sized>(conn: &mut C, text: &str) {
    write_reply(conn, &format!("{text}\r\n"));
}

fn write_reply<C: Connection + ?Sized>(conn: &mut C, reply: &str) {
    debug!("-> {}", reply.trim_end());
    if let Err(e) = conn.write(reply.as_bytes()) {
        debug!("Failed to send reply: {e}");
    }
}
