//! Module `connection`
//!
//! Abstract byte-stream collaborators consumed by the server. The control
//! connection, the data connection and the two listeners are all reached
//! through these traits, so the protocol core never touches a socket type.

use std::io;
use std::net::{IpAddr, SocketAddrV4};

/// A bidirectional, nonblocking byte stream.
pub trait Connection {
    /// Returns whether at least one byte can be read without waiting.
    fn available(&mut self) -> bool;

    /// Reads whatever is pending into `buf`.
    ///
    /// `Ok(0)` means nothing is pending right now; loss of the peer is
    /// reported through [`Connection::connected`].
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Writes all of `data`, waiting a bounded time if the peer is slow.
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Returns false once the peer has gone away and no unread data remains.
    fn connected(&mut self) -> bool;

    fn close(&mut self);

    /// Local address of this end, used to advertise the passive endpoint.
    fn local_ip(&self) -> Option<IpAddr>;

    fn read_byte(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        match self.read(&mut byte) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }
}

/// Source of new connections: the control listener, the passive data
/// listener and outbound data connections for active mode.
pub trait Transport {
    type Conn: Connection;

    /// Returns a freshly accepted control connection, if one is pending.
    fn accept_control(&mut self) -> Option<Self::Conn>;

    /// Returns a freshly accepted passive data connection, if one is pending.
    fn accept_data(&mut self) -> Option<Self::Conn>;

    /// Opens a data connection to a client-supplied endpoint (active mode).
    fn connect_data(&mut self, addr: SocketAddrV4) -> Option<Self::Conn>;
}
