// src/track/mod.rs

//! Change detection for pipeline outputs.
//!
//! A [`ChangeTracker`] belongs to exactly one asset class. It decides whether
//! an output needs rewriting by looking at the *destination* trees, so an
//! output deleted behind our back is always rewritten even if its source is
//! untouched.

pub mod fingerprint;
pub mod store;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, trace};

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::types::{FingerprintMode, RecordStorageMode};

pub use fingerprint::{content_hash, fingerprint, Fingerprint};
pub use store::{
    ChangeRecord, FileRecordStore, MemoryRecordStore, RecordMap, RecordStore, RECORDS_DIR,
};

pub struct ChangeTracker {
    class: String,
    mode: FingerprintMode,
    roots: Vec<PathBuf>,
    fs: Arc<dyn FileSystem>,
    records: Mutex<RecordMap>,
    store: Box<dyn RecordStore>,
}

impl std::fmt::Debug for ChangeTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeTracker")
            .field("class", &self.class)
            .field("mode", &self.mode)
            .field("roots", &self.roots)
            .finish_non_exhaustive()
    }
}

impl ChangeTracker {
    /// Create a tracker for `class`, loading any previously stored records.
    pub fn new(
        class: impl Into<String>,
        mode: FingerprintMode,
        roots: Vec<PathBuf>,
        fs: Arc<dyn FileSystem>,
        store: Box<dyn RecordStore>,
    ) -> Result<Self> {
        let records = store.load()?;
        Ok(Self {
            class: class.into(),
            mode,
            roots,
            fs,
            records: Mutex::new(records),
            store,
        })
    }

    /// Tracker with the store selected by `storage`.
    pub fn with_storage(
        class: &str,
        mode: FingerprintMode,
        storage: RecordStorageMode,
        project_root: &Path,
        roots: Vec<PathBuf>,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self> {
        let store: Box<dyn RecordStore> = match storage {
            RecordStorageMode::File => {
                Box::new(FileRecordStore::new(project_root, class, Arc::clone(&fs)))
            }
            RecordStorageMode::Memory => Box::new(MemoryRecordStore::new()),
        };
        Self::new(class, mode, roots, fs, store)
    }

    fn records(&self) -> MutexGuard<'_, RecordMap> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether the output `dest_rel` derived one-to-one from `source` must be
    /// rebuilt.
    ///
    /// Stale when the output is missing from any root, when its source or
    /// destination fingerprint moved since the last recorded write, or (with
    /// no record yet) when any destination is older than the source.
    pub fn is_stale(&self, source: &Path, dest_rel: &str) -> Result<bool> {
        let Some(source_fp) = fingerprint(self.fs.as_ref(), source, self.mode)? else {
            return Ok(true);
        };

        let mut dest_fps = Vec::with_capacity(self.roots.len());
        for root in &self.roots {
            match fingerprint(self.fs.as_ref(), &root.join(dest_rel), self.mode)? {
                Some(fp) => dest_fps.push(fp),
                None => {
                    trace!(class = %self.class, path = dest_rel, ?root, "destination missing");
                    return Ok(true);
                }
            }
        }

        if let Some(record) = self.records().get(dest_rel) {
            return Ok(record.source != source_fp || record.dest != dest_fps);
        }

        self.any_destination_older(source, dest_rel)
    }

    fn any_destination_older(&self, source: &Path, dest_rel: &str) -> Result<bool> {
        let Some(source_meta) = self.fs.metadata(source)? else {
            return Ok(true);
        };
        for root in &self.roots {
            match self.fs.metadata(&root.join(dest_rel))? {
                Some(dest_meta) if dest_meta.modified >= source_meta.modified => {}
                _ => return Ok(true),
            }
        }
        Ok(false)
    }

    /// Whether a generated output must be rewritten: any root lacks the file
    /// or holds different bytes.
    pub fn is_content_stale(&self, content: &[u8], dest_rel: &str) -> Result<bool> {
        for root in &self.roots {
            let path = root.join(dest_rel);
            if !self.fs.is_file(&path) || self.fs.read(&path)? != content {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Remember the state of `source` and of every destination copy of
    /// `dest_rel`. Call only after a successful dual write.
    pub fn record(&self, source: &Path, dest_rel: &str) -> Result<()> {
        let Some(source_fp) = fingerprint(self.fs.as_ref(), source, self.mode)? else {
            return Ok(());
        };

        let mut dest = Vec::with_capacity(self.roots.len());
        for root in &self.roots {
            match fingerprint(self.fs.as_ref(), &root.join(dest_rel), self.mode)? {
                Some(fp) => dest.push(fp),
                None => return Ok(()),
            }
        }

        self.records().insert(
            dest_rel.to_string(),
            ChangeRecord {
                source: source_fp,
                dest,
            },
        );
        Ok(())
    }

    pub fn record_for(&self, dest_rel: &str) -> Option<ChangeRecord> {
        self.records().get(dest_rel).cloned()
    }

    /// Persist the current records.
    pub fn flush(&self) -> Result<()> {
        let records = self.records().clone();
        debug!(class = %self.class, records = records.len(), "flushing change records");
        self.store.save(&records)
    }
}
