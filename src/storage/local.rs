//! Local directory storage
//!
//! Maps the virtual tree onto a directory of the host filesystem.

use chrono::{DateTime, Utc};
use log::{debug, info};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

use crate::error::StorageError;
use crate::storage::filesystem::{DirEntry, FileHandle, Filesystem, OpenMode};
use crate::storage::listing::datetime_to_fat;

impl FileHandle for File {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(self, buf)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        Write::write_all(self, data)
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }
}

/// Filesystem rooted at a host directory.
#[derive(Debug, Clone)]
pub struct LocalFilesystem {
    root: PathBuf,
}

impl LocalFilesystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Converts a virtual path into a host path below the root.
    fn real_path(&self, virtual_path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(virtual_path.trim_start_matches('/'));
        let mut real = self.root.clone();

        for component in relative.components() {
            match component {
                Component::Normal(part) => real.push(part),
                Component::CurDir => {}
                _ => return Err(StorageError::PathTraversal(virtual_path.to_string())),
            }
        }

        Ok(real)
    }
}

impl Filesystem for LocalFilesystem {
    type File = File;

    fn init(&mut self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        info!("Storage ready at {}", self.root.display());
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.real_path(path).map(|p| p.exists()).unwrap_or(false)
    }

    fn is_dir(&self, path: &str) -> bool {
        self.real_path(path).map(|p| p.is_dir()).unwrap_or(false)
    }

    fn open(&mut self, path: &str, mode: OpenMode) -> Result<File, StorageError> {
        let real = self.real_path(path)?;
        match mode {
            OpenMode::Read => {
                if real.is_dir() {
                    return Err(StorageError::NotAFile(path.to_string()));
                }
                File::open(&real).map_err(|e| match e.kind() {
                    io::ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
                    _ => StorageError::Io(e),
                })
            }
            OpenMode::Write => Ok(File::create(&real)?),
        }
    }

    fn remove(&mut self, path: &str) -> Result<(), StorageError> {
        let real = self.real_path(path)?;
        if real.is_dir() {
            return Err(StorageError::NotAFile(path.to_string()));
        }
        fs::remove_file(&real)?;
        debug!("Removed {}", real.display());
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), StorageError> {
        let source = self.real_path(from)?;
        let target = self.real_path(to)?;
        if !source.exists() {
            return Err(StorageError::NotFound(from.to_string()));
        }
        if target.exists() {
            return Err(StorageError::AlreadyExists(to.to_string()));
        }
        fs::rename(&source, &target)?;
        Ok(())
    }

    fn mkdir(&mut self, path: &str, recursive: bool) -> Result<(), StorageError> {
        let real = self.real_path(path)?;
        if real.exists() {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }
        if recursive {
            fs::create_dir_all(&real)?;
        } else {
            fs::create_dir(&real)?;
        }
        Ok(())
    }

    fn rmdir(&mut self, path: &str) -> Result<(), StorageError> {
        let real = self.real_path(path)?;
        if !real.is_dir() {
            return Err(StorageError::NotADirectory(path.to_string()));
        }
        fs::remove_dir(&real)?;
        Ok(())
    }

    fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, StorageError> {
        let real = self.real_path(path)?;
        if !real.is_dir() {
            return Err(StorageError::NotADirectory(path.to_string()));
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&real)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            let modified: DateTime<Utc> = metadata.modified()?.into();
            let (modify_date, modify_time) = datetime_to_fat(modified.naive_utc());

            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: metadata.is_dir(),
                size: if metadata.is_dir() { 0 } else { metadata.len() },
                modify_date,
                modify_time,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
