//! Filesystem collaborator
//!
//! The protocol core reaches storage only through these traits. Paths are
//! always the absolute virtual paths produced by the path resolver.

use std::io;

use crate::error::StorageError;

/// How a file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    /// Create the file, truncating any previous content.
    Write,
}

/// One entry of a directory enumeration.
///
/// `modify_date` and `modify_time` are packed FAT fields, see
/// [`crate::storage::listing::fat_timestamp`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    pub modify_date: u16,
    pub modify_time: u16,
}

/// An open file, exclusively owned by whoever opened it.
pub trait FileHandle {
    /// Reads up to `buf.len()` bytes; `Ok(0)` means end of file.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    fn size(&self) -> io::Result<u64>;
}

/// Hierarchical storage used by the command dispatcher.
pub trait Filesystem {
    type File: FileHandle;

    /// Prepares the storage for use. Called once, after the first login.
    fn init(&mut self) -> Result<(), StorageError>;

    fn exists(&self, path: &str) -> bool;

    fn is_dir(&self, path: &str) -> bool;

    fn open(&mut self, path: &str, mode: OpenMode) -> Result<Self::File, StorageError>;

    fn remove(&mut self, path: &str) -> Result<(), StorageError>;

    fn rename(&mut self, from: &str, to: &str) -> Result<(), StorageError>;

    /// Creates `path`; with `recursive` missing parents are created too.
    fn mkdir(&mut self, path: &str, recursive: bool) -> Result<(), StorageError>;

    fn rmdir(&mut self, path: &str) -> Result<(), StorageError>;

    /// Lists the entries of a directory, without `.` and `..`.
    fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, StorageError>;
}
