//! FTP Transfer modes
//!
//! Handles active and passive mode endpoints.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};

use crate::error::TransferError;

/// Who opens the data connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Server listens, client connects.
    Passive,
    /// Server connects to the endpoint given by PORT.
    Active,
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferMode::Passive => write!(f, "passive"),
            TransferMode::Active => write!(f, "active"),
        }
    }
}

/// Parses a PORT argument `a,b,c,d,p1,p2` into an IPv4 endpoint.
pub fn parse_port_argument(argument: &str) -> Result<SocketAddrV4, TransferError> {
    let fields = argument
        .split(',')
        .map(|field| field.trim().parse::<u8>())
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|e| TransferError::InvalidPortCommand(format!("{argument}: {e}")))?;

    let [a, b, c, d, p1, p2] = fields[..] else {
        return Err(TransferError::InvalidPortCommand(format!(
            "{argument}: expected 6 fields, got {}",
            fields.len()
        )));
    };

    let port = u16::from(p1) << 8 | u16::from(p2);
    Ok(SocketAddrV4::new(Ipv4Addr::new(a, b, c, d), port))
}

/// Formats an endpoint the way PASV advertises it: `a,b,c,d,p1,p2`.
pub fn format_endpoint(endpoint: &SocketAddrV4) -> String {
    let [a, b, c, d] = endpoint.ip().octets();
    let port = endpoint.port();
    format!("{a},{b},{c},{d},{},{}", port >> 8, port & 0xFF)
}
