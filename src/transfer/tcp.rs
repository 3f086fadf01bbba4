//! Module `tcp`
//!
//! TCP implementation of the transport collaborators. Both listeners and
//! every accepted stream run in nonblocking mode so that a poll tick never
//! waits on the network; writes retry for a bounded time.

use log::{debug, error, info, warn};
use std::io::{self, ErrorKind, Read, Write};
use std::net::{IpAddr, Shutdown, SocketAddr, SocketAddrV4, TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::transfer::connection::{Connection, Transport};

const WRITE_TIMEOUT: Duration = Duration::from_secs(10);
const WRITE_RETRY_DELAY: Duration = Duration::from_millis(1);

/// A nonblocking TCP stream.
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
    open: bool,
}

impl TcpConnection {
    pub fn from_stream(stream: TcpStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        stream.set_nodelay(true)?;
        Ok(Self { stream, open: true })
    }

    /// Peeks one byte: `Some(true)` data pending, `Some(false)` nothing yet,
    /// `None` peer gone.
    fn probe(&mut self) -> Option<bool> {
        let mut byte = [0u8; 1];
        match self.stream.peek(&mut byte) {
            Ok(0) => None,
            Ok(_) => Some(true),
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => Some(false),
            Err(e) => {
                debug!("Peek failed: {e}");
                None
            }
        }
    }
}

impl Connection for TcpConnection {
    fn available(&mut self) -> bool {
        if !self.open {
            return false;
        }
        match self.probe() {
            Some(pending) => pending,
            None => {
                self.open = false;
                false
            }
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.open {
            return Ok(0);
        }
        match self.stream.read(buf) {
            Ok(0) => {
                self.open = false;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(ref e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::Interrupted => {
                Ok(0)
            }
            Err(e) => {
                self.open = false;
                Err(e)
            }
        }
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        let deadline = Instant::now() + WRITE_TIMEOUT;
        let mut written = 0;

        while written < data.len() {
            match self.stream.write(&data[written..]) {
                Ok(0) => return Err(io::Error::from(ErrorKind::WriteZero)),
                Ok(n) => written += n,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return Err(io::Error::from(ErrorKind::TimedOut));
                    }
                    thread::sleep(WRITE_RETRY_DELAY);
                }
                Err(e) => {
                    self.open = false;
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    fn connected(&mut self) -> bool {
        if !self.open {
            return false;
        }
        if self.probe().is_none() {
            self.open = false;
        }
        self.open
    }

    fn close(&mut self) {
        if self.open {
            let _ = self.stream.flush();
            let _ = self.stream.shutdown(Shutdown::Both);
            self.open = false;
        }
    }

    fn local_ip(&self) -> Option<IpAddr> {
        self.stream.local_addr().ok().map(|addr| addr.ip())
    }
}

/// Control listener, passive data listener and outbound connector.
#[derive(Debug)]
pub struct TcpTransport {
    control: TcpListener,
    data: TcpListener,
    connect_timeout: Duration,
}

impl TcpTransport {
    /// Binds the control and passive data listeners described by `config`.
    pub fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        let control = bind_listener(&config.bind_address, config.control_port)?;
        let data = bind_listener(&config.bind_address, config.passive_port)?;

        info!(
            "Listening for control connections on {}:{}, passive data on port {}",
            config.bind_address, config.control_port, config.passive_port
        );

        Ok(Self {
            control,
            data,
            connect_timeout: config.data_connect_timeout(),
        })
    }
}

fn bind_listener(host: &str, port: u16) -> Result<TcpListener, ServerError> {
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|_| ServerError::InvalidAddress(format!("{host}:{port}")))?;

    let listener = TcpListener::bind(addr).map_err(|source| ServerError::Bind { addr, source })?;
    listener
        .set_nonblocking(true)
        .map_err(|source| ServerError::Bind { addr, source })?;

    Ok(listener)
}

fn accept_from(listener: &TcpListener, role: &str) -> Option<TcpConnection> {
    match listener.accept() {
        Ok((stream, peer)) => {
            debug!("Accepted {role} connection from {peer}");
            match TcpConnection::from_stream(stream) {
                Ok(connection) => Some(connection),
                Err(e) => {
                    warn!("Failed to configure {role} connection from {peer}: {e}");
                    None
                }
            }
        }
        Err(ref e) if e.kind() == ErrorKind::WouldBlock => None,
        Err(e) => {
            error!("Error accepting {role} connection: {e}");
            None
        }
    }
}

impl Transport for TcpTransport {
    type Conn = TcpConnection;

    fn accept_control(&mut self) -> Option<TcpConnection> {
        accept_from(&self.control, "control")
    }

    fn accept_data(&mut self) -> Option<TcpConnection> {
        accept_from(&self.data, "data")
    }

    fn connect_data(&mut self, addr: SocketAddrV4) -> Option<TcpConnection> {
        info!("Active mode: connecting to client data port {addr}");

        match TcpStream::connect_timeout(&SocketAddr::V4(addr), self.connect_timeout) {
            Ok(stream) => match TcpConnection::from_stream(stream) {
                Ok(connection) => Some(connection),
                Err(e) => {
                    warn!("Failed to configure data connection to {addr}: {e}");
                    None
                }
            },
            Err(e) => {
                error!("Failed to connect to client data port {addr}: {e}");
                None
            }
        }
    }
}
