//! File system storage management
//!
//! The storage collaborator, a host-directory implementation of it, and the
//! listing formats built from its directory entries.

pub mod filesystem;
pub mod listing;
pub mod local;

pub use filesystem::{DirEntry, FileHandle, Filesystem, OpenMode};
pub use listing::{fat_timestamp, mlsd_lines, nlst_lines};
pub use local::LocalFilesystem;
