// src/track/store.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::track::fingerprint::Fingerprint;

/// Directory (relative to the project root) holding persisted change records.
pub const RECORDS_DIR: &str = ".themeforge/records";

/// Fingerprints observed at the last successful dual write of one output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub source: Fingerprint,
    /// One fingerprint per destination root, in root order.
    pub dest: Vec<Fingerprint>,
}

/// Records keyed by destination-relative path.
pub type RecordMap = HashMap<String, ChangeRecord>;

/// Abstract storage for one asset class's change records.
pub trait RecordStore: Send + Sync {
    fn load(&self) -> Result<RecordMap>;
    fn save(&self, records: &RecordMap) -> Result<()>;
}

/// Keeps records for the lifetime of the process only.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    map: Mutex<RecordMap>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn load(&self) -> Result<RecordMap> {
        Ok(self.map.lock().map(|m| m.clone()).unwrap_or_default())
    }

    fn save(&self, records: &RecordMap) -> Result<()> {
        if let Ok(mut map) = self.map.lock() {
            *map = records.clone();
        }
        Ok(())
    }
}

/// Persists records to `<root>/.themeforge/records/<class>`, one line per
/// output: `<path>\t<source fingerprint>\t<dest fingerprints, comma separated>`.
#[derive(Debug)]
pub struct FileRecordStore {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FileRecordStore {
    pub fn new(root: &Path, class: &str, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            path: root.join(RECORDS_DIR).join(class),
            fs,
        }
    }
}

impl RecordStore for FileRecordStore {
    fn load(&self) -> Result<RecordMap> {
        if !self.fs.is_file(&self.path) {
            return Ok(RecordMap::new());
        }

        let content = self.fs.read(&self.path)?;
        let mut map = RecordMap::new();

        for line in String::from_utf8_lossy(&content).lines() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line) {
                Some((rel, record)) => {
                    map.insert(rel, record);
                }
                None => warn!(file = ?self.path, line, "skipping malformed change record"),
            }
        }

        debug!(file = ?self.path, records = map.len(), "loaded change records");
        Ok(map)
    }

    fn save(&self, records: &RecordMap) -> Result<()> {
        let mut keys: Vec<&String> = records.keys().collect();
        keys.sort();

        let mut out = String::new();
        for rel in keys {
            let record = &records[rel];
            let dest: Vec<String> = record.dest.iter().map(|f| f.to_string()).collect();
            out.push_str(&format!("{rel}\t{}\t{}\n", record.source, dest.join(",")));
        }

        self.fs.write(&self.path, out.as_bytes())
    }
}

fn parse_line(line: &str) -> Option<(String, ChangeRecord)> {
    let mut parts = line.splitn(3, '\t');
    let rel = parts.next()?;
    let source = parts.next()?.parse().ok()?;
    let dest = parts
        .next()?
        .split(',')
        .map(|f| f.parse().ok())
        .collect::<Option<Vec<Fingerprint>>>()?;
    Some((rel.to_string(), ChangeRecord { source, dest }))
}
