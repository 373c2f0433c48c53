// src/fs/mock.rs

use super::{FileMeta, FileSystem};
use crate::errors::{BuildError, Result};
use std::collections::BTreeMap;
use std::io::{Error as IoError, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { content: Vec<u8>, modified: u64 },
    Dir,
}

#[derive(Debug, Default)]
struct MockState {
    entries: BTreeMap<PathBuf, MockEntry>,
    /// Logical clock used as mtime; bumped on every write.
    clock: u64,
    /// Writes below any of these prefixes fail with `PermissionDenied`.
    failing: Vec<PathBuf>,
    writes: usize,
}

/// In-memory filesystem with a logical clock for mtimes and write-failure
/// injection.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut state = self.lock();
        insert_file(&mut state, path.as_ref(), content.into());
    }

    /// Bump the mtime of an existing file without changing its content.
    pub fn touch(&self, path: impl AsRef<Path>) {
        let mut state = self.lock();
        state.clock += 1;
        let now = state.clock;
        if let Some(MockEntry::File { modified, .. }) = state.entries.get_mut(path.as_ref()) {
            *modified = now;
        }
    }

    /// Make every subsequent write below `prefix` fail.
    pub fn fail_writes_under(&self, prefix: impl AsRef<Path>) {
        self.lock().failing.push(prefix.as_ref().to_path_buf());
    }

    /// Total number of successful `write` calls.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.lock().entries.retain(|p, _| !p.starts_with(path));
    }
}

fn insert_file(state: &mut MockState, path: &Path, content: Vec<u8>) {
    if let Some(parent) = path.parent() {
        insert_dirs(state, parent);
    }
    state.clock += 1;
    let modified = state.clock;
    state
        .entries
        .insert(path.to_path_buf(), MockEntry::File { content, modified });
}

fn insert_dirs(state: &mut MockState, path: &Path) {
    for ancestor in path.ancestors() {
        if ancestor.as_os_str().is_empty() {
            continue;
        }
        state
            .entries
            .entry(ancestor.to_path_buf())
            .or_insert(MockEntry::Dir);
    }
}

fn not_found(path: &Path) -> BuildError {
    BuildError::io(path, IoError::new(ErrorKind::NotFound, "not found"))
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        match self.lock().entries.get(path) {
            Some(MockEntry::File { content, .. }) => Ok(content.clone()),
            Some(MockEntry::Dir) => Err(BuildError::io(
                path,
                IoError::new(ErrorKind::Other, "is a directory"),
            )),
            None => Err(not_found(path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let mut state = self.lock();
        if state.failing.iter().any(|prefix| path.starts_with(prefix)) {
            return Err(BuildError::io(
                path,
                IoError::new(ErrorKind::PermissionDenied, "write rejected by mock"),
            ));
        }
        insert_file(&mut state, path, contents.to_vec());
        state.writes += 1;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().entries.contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().entries.get(path), Some(MockEntry::File { .. }))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().entries.get(path), Some(MockEntry::Dir))
    }

    fn metadata(&self, path: &Path) -> Result<Option<FileMeta>> {
        match self.lock().entries.get(path) {
            Some(MockEntry::File { content, modified }) => Ok(Some(FileMeta {
                len: content.len() as u64,
                modified: SystemTime::UNIX_EPOCH + Duration::from_secs(*modified),
            })),
            _ => Ok(None),
        }
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        insert_dirs(&mut self.lock(), path);
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        self.remove(path);
        Ok(())
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let state = self.lock();
        match state.entries.get(path) {
            Some(MockEntry::Dir) => Ok(state
                .entries
                .keys()
                .filter(|p| p.parent() == Some(path))
                .cloned()
                .collect()),
            _ => Err(not_found(path)),
        }
    }
}
