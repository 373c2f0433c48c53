// src/fs/mod.rs

//! Filesystem abstraction.
//!
//! Every pipeline component talks to a [`FileSystem`] instead of `std::fs`
//! so tests can run against [`mock::MockFileSystem`] and inject failures.

use std::fmt::Debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::errors::{BuildError, Result};

pub mod mock;

/// The subset of file metadata the change tracker needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMeta {
    pub len: u64,
    pub modified: SystemTime,
}

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write `contents` to `path`, truncating any existing file and creating
    /// missing parent directories.
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;

    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;

    /// Whether `path` itself is a symbolic link.
    fn is_symlink(&self, _path: &Path) -> bool {
        false
    }

    /// Metadata for a file, or `None` if it does not exist.
    fn metadata(&self, path: &Path) -> Result<Option<FileMeta>>;

    /// Idempotent: succeeds if the directory already exists.
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Remove a directory tree. Succeeds if it does not exist.
    fn remove_dir_all(&self, path: &Path) -> Result<()>;

    /// Return the entries of a directory as full paths.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| BuildError::io(path, e))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
        fs::write(path, contents).map_err(|e| BuildError::io(path, e))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_symlink(&self, path: &Path) -> bool {
        path.is_symlink()
    }

    fn metadata(&self, path: &Path) -> Result<Option<FileMeta>> {
        match fs::metadata(path) {
            Ok(meta) => {
                let modified = meta.modified().map_err(|e| BuildError::io(path, e))?;
                Ok(Some(FileMeta {
                    len: meta.len(),
                    modified,
                }))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BuildError::io(path, e)),
        }
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).map_err(|e| BuildError::io(path, e))
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BuildError::io(path, e)),
        }
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).map_err(|e| BuildError::io(path, e))? {
            let entry = entry.map_err(|e| BuildError::io(path, e))?;
            entries.push(entry.path());
        }
        Ok(entries)
    }
}
