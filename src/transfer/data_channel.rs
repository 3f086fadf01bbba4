//! Module `data_channel`
//!
//! Negotiates and owns the second connection used for file transfers and
//! directory listings. PASV and PORT only record where the connection will
//! come from; the connection itself is opened lazily by the first command
//! that needs it.

use log::{debug, info, warn};
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

use crate::error::TransferError;
use crate::transfer::connection::{Connection, Transport};
use crate::transfer::modes::{TransferMode, parse_port_argument};
use crate::utils::clock::{Clock, poll_until};

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Mode, endpoint and live connection of the data channel.
#[derive(Debug)]
pub struct DataChannel<C> {
    mode: TransferMode,
    endpoint: SocketAddrV4,
    connection: Option<C>,
    passive_port: u16,
    connect_timeout: Duration,
}

impl<C: Connection> DataChannel<C> {
    pub fn new(passive_port: u16, connect_timeout: Duration) -> Self {
        Self {
            mode: TransferMode::Passive,
            endpoint: SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, passive_port),
            connection: None,
            passive_port,
            connect_timeout,
        }
    }

    /// Drops any connection and returns to the default passive setup.
    pub fn reset(&mut self) {
        self.close();
        self.mode = TransferMode::Passive;
        self.endpoint = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, self.passive_port);
    }

    pub fn mode(&self) -> TransferMode {
        self.mode
    }

    pub fn endpoint(&self) -> SocketAddrV4 {
        self.endpoint
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    /// Switches to passive mode, advertising `ip` and the fixed passive port.
    pub fn enter_passive(&mut self, ip: Ipv4Addr) -> SocketAddrV4 {
        self.close();
        self.mode = TransferMode::Passive;
        self.endpoint = SocketAddrV4::new(ip, self.passive_port);
        info!("Data connection set to passive on {}", self.endpoint);
        self.endpoint
    }

    /// Switches to active mode using a PORT argument.
    ///
    /// Any existing data connection is dropped even if the argument turns
    /// out to be malformed.
    pub fn enter_active(&mut self, argument: &str) -> Result<SocketAddrV4, TransferError> {
        self.close();
        let endpoint = parse_port_argument(argument)?;
        self.mode = TransferMode::Active;
        self.endpoint = endpoint;
        info!("Data connection set to active towards {endpoint}");
        Ok(endpoint)
    }

    /// Makes sure a data connection is open.
    ///
    /// In passive mode this waits at most the configured timeout for the
    /// client to connect; in active mode the transport dials the recorded
    /// endpoint.
    pub fn connect<T>(&mut self, transport: &mut T, clock: &dyn Clock) -> Result<(), TransferError>
    where
        T: Transport<Conn = C>,
    {
        if let Some(connection) = self.connection.as_mut() {
            if connection.connected() {
                return Ok(());
            }
            debug!("Discarding stale data connection");
            self.close();
        }

        let connection = match self.mode {
            TransferMode::Passive => poll_until(clock, self.connect_timeout, ACCEPT_POLL_INTERVAL, || {
                transport.accept_data()
            }),
            TransferMode::Active => transport.connect_data(self.endpoint),
        };

        match connection {
            Some(connection) => {
                debug!("Data connection established ({} mode)", self.mode);
                self.connection = Some(connection);
                Ok(())
            }
            None => {
                warn!("No data connection within {:?} ({} mode)", self.connect_timeout, self.mode);
                Err(TransferError::NoDataConnection)
            }
        }
    }

    /// Hands the open connection over to a transfer.
    pub fn take_connection(&mut self) -> Option<C> {
        self.connection.take()
    }

    /// Writes one CRLF-terminated line on the open connection.
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?;
        connection.write(line.as_bytes())?;
        connection.write(b"\r\n")
    }

    pub fn close(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.close();
        }
    }
}
