//! Module `memory`
//!
//! In-process transport. Each [`MemoryConnection`] is the server end of a
//! pipe whose other end, a [`MemoryPeer`], is held by whoever plays the
//! client. Handles are reference counted so both ends stay usable while the
//! server owns its side.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, ErrorKind};
use std::net::{IpAddr, Ipv4Addr, SocketAddrV4};
use std::rc::Rc;

use crate::transfer::connection::{Connection, Transport};

#[derive(Debug)]
struct Pipe {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
    peer_open: bool,
    server_open: bool,
}

/// Server end of an in-memory pipe.
#[derive(Debug, Clone)]
pub struct MemoryConnection {
    pipe: Rc<RefCell<Pipe>>,
    local_ip: Ipv4Addr,
}

/// Client end of an in-memory pipe.
#[derive(Debug, Clone)]
pub struct MemoryPeer {
    pipe: Rc<RefCell<Pipe>>,
}

impl MemoryConnection {
    pub fn pair(local_ip: Ipv4Addr) -> (MemoryConnection, MemoryPeer) {
        let pipe = Rc::new(RefCell::new(Pipe {
            inbound: VecDeque::new(),
            outbound: Vec::new(),
            peer_open: true,
            server_open: true,
        }));
        (
            MemoryConnection {
                pipe: Rc::clone(&pipe),
                local_ip,
            },
            MemoryPeer { pipe },
        )
    }
}

impl MemoryPeer {
    pub fn send(&self, bytes: &[u8]) {
        self.pipe.borrow_mut().inbound.extend(bytes);
    }

    /// Sends `line` terminated by CRLF.
    pub fn send_line(&self, line: &str) {
        self.send(line.as_bytes());
        self.send(b"\r\n");
    }

    /// Drains everything the server has written so far.
    pub fn take_output(&self) -> Vec<u8> {
        std::mem::take(&mut self.pipe.borrow_mut().outbound)
    }

    pub fn take_text(&self) -> String {
        String::from_utf8_lossy(&self.take_output()).into_owned()
    }

    /// Closes the client side; unread bytes remain readable by the server.
    pub fn hang_up(&self) {
        self.pipe.borrow_mut().peer_open = false;
    }

    /// Returns whether the server still holds its end open.
    pub fn is_open(&self) -> bool {
        self.pipe.borrow().server_open
    }
}

impl Connection for MemoryConnection {
    fn available(&mut self) -> bool {
        let pipe = self.pipe.borrow();
        pipe.server_open && !pipe.inbound.is_empty()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut pipe = self.pipe.borrow_mut();
        if !pipe.server_open {
            return Ok(0);
        }
        let n = buf.len().min(pipe.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(pipe.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        let mut pipe = self.pipe.borrow_mut();
        if !pipe.server_open || !pipe.peer_open {
            return Err(io::Error::from(ErrorKind::BrokenPipe));
        }
        pipe.outbound.extend_from_slice(data);
        Ok(())
    }

    fn connected(&mut self) -> bool {
        let pipe = self.pipe.borrow();
        pipe.server_open && (pipe.peer_open || !pipe.inbound.is_empty())
    }

    fn close(&mut self) {
        self.pipe.borrow_mut().server_open = false;
    }

    fn local_ip(&self) -> Option<IpAddr> {
        Some(IpAddr::V4(self.local_ip))
    }
}

#[derive(Debug, Default)]
struct Queues {
    control: VecDeque<MemoryConnection>,
    passive: VecDeque<MemoryConnection>,
    active: VecDeque<MemoryConnection>,
    dialed: Vec<SocketAddrV4>,
}

/// Transport whose listeners are fed by the caller.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    queues: Rc<RefCell<Queues>>,
    local_ip: Ipv4Addr,
}

impl MemoryTransport {
    pub fn new(local_ip: Ipv4Addr) -> Self {
        Self {
            queues: Rc::new(RefCell::new(Queues::default())),
            local_ip,
        }
    }

    /// Queues a control connection and returns its client end.
    pub fn dial_control(&self) -> MemoryPeer {
        let (connection, peer) = MemoryConnection::pair(self.local_ip);
        self.queues.borrow_mut().control.push_back(connection);
        peer
    }

    /// Queues a connection on the passive data listener.
    pub fn dial_passive(&self) -> MemoryPeer {
        let (connection, peer) = MemoryConnection::pair(self.local_ip);
        self.queues.borrow_mut().passive.push_back(connection);
        peer
    }

    /// Prepares the client end that the next active-mode connect reaches.
    pub fn listen_active(&self) -> MemoryPeer {
        let (connection, peer) = MemoryConnection::pair(self.local_ip);
        self.queues.borrow_mut().active.push_back(connection);
        peer
    }

    /// Endpoints the server has connected to in active mode.
    pub fn dialed(&self) -> Vec<SocketAddrV4> {
        self.queues.borrow().dialed.clone()
    }
}

impl Transport for MemoryTransport {
    type Conn = MemoryConnection;

    fn accept_control(&mut self) -> Option<MemoryConnection> {
        self.queues.borrow_mut().control.pop_front()
    }

    fn accept_data(&mut self) -> Option<MemoryConnection> {
        self.queues.borrow_mut().passive.pop_front()
    }

    fn connect_data(&mut self, addr: SocketAddrV4) -> Option<MemoryConnection> {
        let mut queues = self.queues.borrow_mut();
        queues.dialed.push(addr);
        queues.active.pop_front()
    }
}
