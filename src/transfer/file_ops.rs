//! Module `file_ops`
//!
//! Transfer engine. A transfer owns the open file and the data connection
//! and moves at most one chunk per poll tick, so that the control channel
//! stays responsive while a large file is in flight.

use log::{info, warn};
use std::time::Instant;

use crate::protocol::responses::{
    TRANSFER_ABORTED, TRANSFER_COMPLETE, send_continuation, send_response,
};
use crate::storage::filesystem::FileHandle;
use crate::transfer::connection::Connection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    /// Server to client (RETR).
    Download,
    /// Client to server (STOR).
    Upload,
}

/// Outcome of one [`Transfer::advance`] step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferProgress {
    Pending,
    /// End of file reached or the data connection went away.
    Done,
    /// The file could not be read or written.
    Failed,
}

/// An in-progress file copy.
#[derive(Debug)]
pub struct Transfer<F, C> {
    direction: TransferDirection,
    path: String,
    file: F,
    connection: C,
    bytes_transferred: u64,
    started_at: Instant,
    buffer: Vec<u8>,
}

impl<F: FileHandle, C: Connection> Transfer<F, C> {
    pub fn download(path: String, file: F, connection: C, chunk_size: usize, now: Instant) -> Self {
        Self::new(TransferDirection::Download, path, file, connection, chunk_size, now)
    }

    pub fn upload(path: String, file: F, connection: C, chunk_size: usize, now: Instant) -> Self {
        Self::new(TransferDirection::Upload, path, file, connection, chunk_size, now)
    }

    fn new(
        direction: TransferDirection,
        path: String,
        file: F,
        connection: C,
        chunk_size: usize,
        now: Instant,
    ) -> Self {
        info!("Starting {direction:?} of {path}");
        Self {
            direction,
            path,
            file,
            connection,
            bytes_transferred: 0,
            started_at: now,
            buffer: vec![0; chunk_size.max(1)],
        }
    }

    pub fn direction(&self) -> TransferDirection {
        self.direction
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Moves one chunk in the transfer's direction.
    pub fn advance(&mut self) -> TransferProgress {
        match self.direction {
            TransferDirection::Download => self.advance_download(),
            TransferDirection::Upload => self.advance_upload(),
        }
    }

    fn advance_download(&mut self) -> TransferProgress {
        let n = match self.file.read(&mut self.buffer) {
            Ok(0) => return TransferProgress::Done,
            Ok(n) => n,
            Err(e) => {
                warn!("Failed to read {}: {e}", self.path);
                return TransferProgress::Failed;
            }
        };

        if let Err(e) = self.connection.write(&self.buffer[..n]) {
            warn!("Data connection lost while sending {}: {e}", self.path);
            return TransferProgress::Done;
        }

        self.bytes_transferred += n as u64;
        TransferProgress::Pending
    }

    fn advance_upload(&mut self) -> TransferProgress {
        if !self.connection.connected() {
            return TransferProgress::Done;
        }

        let n = match self.connection.read(&mut self.buffer) {
            Ok(n) => n,
            Err(e) => {
                warn!("Data connection lost while receiving {}: {e}", self.path);
                return TransferProgress::Done;
            }
        };

        if n > 0 {
            if let Err(e) = self.file.write_all(&self.buffer[..n]) {
                warn!("Failed to write {}: {e}", self.path);
                return TransferProgress::Failed;
            }
            self.bytes_transferred += n as u64;
        }

        TransferProgress::Pending
    }

    /// Closes the data connection and the file and reports the totals.
    pub fn finish(mut self, now: Instant) -> TransferSummary {
        self.connection.close();
        let elapsed_ms = now.saturating_duration_since(self.started_at).as_millis() as u64;

        info!(
            "Finished {:?} of {}: {} bytes in {} ms",
            self.direction, self.path, self.bytes_transferred, elapsed_ms
        );

        TransferSummary {
            bytes: self.bytes_transferred,
            elapsed_ms,
        }
    }

    /// Closes the data connection and the file without a summary.
    pub fn abort(mut self) {
        self.connection.close();
        info!(
            "Aborted {:?} of {} after {} bytes",
            self.direction, self.path, self.bytes_transferred
        );
    }
}

/// Totals of a completed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSummary {
    pub bytes: u64,
    pub elapsed_ms: u64,
}

impl TransferSummary {
    /// Throughput in kbytes/s, present only when time passed and bytes moved.
    pub fn throughput(&self) -> Option<u64> {
        (self.elapsed_ms > 0 && self.bytes > 0).then(|| self.bytes / self.elapsed_ms)
    }

    pub fn send<C: Connection + ?Sized>(&self, control: &mut C) {
        match self.throughput() {
            Some(rate) => {
                send_continuation(control, TRANSFER_COMPLETE, "File successfully transferred");
                send_response(
                    control,
                    TRANSFER_COMPLETE,
                    &format!("{} ms, {} kbytes/s", self.elapsed_ms, rate),
                );
            }
            None => send_response(control, TRANSFER_COMPLETE, "File successfully transferred"),
        }
    }
}

/// Aborts the open transfer, if any, and tells the client with a 426.
///
/// Returns whether a transfer was open.
pub fn abort_transfer<F, C>(transfer: &mut Option<Transfer<F, C>>, control: Option<&mut C>) -> bool
where
    F: FileHandle,
    C: Connection,
{
    let Some(open) = transfer.take() else {
        return false;
    };
    open.abort();
    if let Some(control) = control {
        send_response(control, TRANSFER_ABORTED, "Transfer aborted");
    }
    true
}
