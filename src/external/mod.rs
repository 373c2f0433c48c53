// src/external/mod.rs

//! Externally owned JSON state (field-group definitions saved by the CMS).
//!
//! The CMS writes these files into the live theme. Before a build they are
//! pulled into a mirror inside the source tree, the destinations are wiped,
//! and the mirror is written back into both trees:
//!
//! ```text
//! Absent --pull--> Pulled --regenerate--> Regenerated
//!    ^                |                        |
//!    +-----clean------+-----------clean--------+
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::errors::{BuildError, Result};
use crate::fs::FileSystem;
use crate::reload::ReloadBus;
use crate::sink::DualSink;
use crate::types::AssetClassKind;

/// Directory name of the state, in the source tree and in both destinations.
pub const EXTERNAL_DIR: &str = "acf-json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalState {
    /// No mirror in the source tree.
    Absent,
    /// Mirror holds the latest live files.
    Pulled,
    /// Mirror has been written back into both destinations.
    Regenerated,
}

pub struct ExternalStateManager {
    mirror: PathBuf,
    live_dir: PathBuf,
    sink: DualSink,
    fs: Arc<dyn FileSystem>,
    bus: ReloadBus,
    state: Mutex<ExternalState>,
}

impl std::fmt::Debug for ExternalStateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalStateManager")
            .field("mirror", &self.mirror)
            .field("live_dir", &self.live_dir)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl ExternalStateManager {
    /// The initial state comes from disk: an existing mirror counts as
    /// pulled.
    pub fn new(settings: &Settings, fs: Arc<dyn FileSystem>, bus: ReloadBus) -> Self {
        let mirror = settings.src_root.join(EXTERNAL_DIR);
        let initial = if fs.is_dir(&mirror) {
            ExternalState::Pulled
        } else {
            ExternalState::Absent
        };
        debug!(?mirror, state = ?initial, "external state detected");

        Self {
            live_dir: settings.live_root.join(EXTERNAL_DIR),
            sink: DualSink::new(settings.destination_roots(), Arc::clone(&fs)),
            mirror,
            fs,
            bus,
            state: Mutex::new(initial),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ExternalState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> ExternalState {
        *self.lock()
    }

    pub fn mirror_dir(&self) -> &Path {
        &self.mirror
    }

    /// Delete the mirror. Allowed from every state.
    pub fn clean(&self) -> Result<()> {
        let mut state = self.lock();
        self.warn_on_divergence()?;
        self.fs.remove_dir_all(&self.mirror)?;
        debug!(from = ?*state, "external state cleaned");
        *state = ExternalState::Absent;
        Ok(())
    }

    /// Copy the live JSON files into the mirror. Only acts from `Absent`;
    /// otherwise the mirror is kept as is.
    pub fn pull(&self) -> Result<()> {
        let mut state = self.lock();
        if *state != ExternalState::Absent {
            info!(state = ?*state, "external state already pulled; skipping");
            return Ok(());
        }

        self.fs.create_dir_all(&self.mirror)?;
        let files = json_files(self.fs.as_ref(), &self.live_dir)?;
        for file in &files {
            if let Some(name) = file.file_name() {
                let contents = self.fs.read(file)?;
                self.fs.write(&self.mirror.join(name), &contents)?;
            }
        }

        info!(files = files.len(), "pulled external state");
        *state = ExternalState::Pulled;
        Ok(())
    }

    /// Write the mirror back into both destinations. The external directory
    /// is created in every root even when the mirror is empty, so the CMS
    /// can save into it.
    pub fn regenerate(&self) -> Result<()> {
        let mut state = self.lock();
        if *state == ExternalState::Absent {
            return Err(BuildError::ExternalState(
                "cannot regenerate external state before it has been pulled".to_string(),
            ));
        }

        self.sink.ensure_dir(EXTERNAL_DIR)?;

        let mut written = Vec::new();
        for file in json_files(self.fs.as_ref(), &self.mirror)? {
            let Some(name) = file.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            let rel = format!("{EXTERNAL_DIR}/{name}");
            self.sink.copy_from(&file, &rel)?;
            written.push(rel);
        }

        info!(files = written.len(), "regenerated external state");
        self.bus.publish(
            "external-state",
            AssetClassKind::ManifestData,
            &written,
            None,
        );
        *state = ExternalState::Regenerated;
        Ok(())
    }

    /// Mirror files that differ from their live counterpart are about to be
    /// lost; the live copy wins.
    fn warn_on_divergence(&self) -> Result<()> {
        for mirrored in json_files(self.fs.as_ref(), &self.mirror)? {
            let Some(name) = mirrored.file_name() else {
                continue;
            };
            let live = self.live_dir.join(name);
            if !self.fs.is_file(&live) {
                continue;
            }
            if self.fs.read(&mirrored)? != self.fs.read(&live)? {
                warn!(
                    file = %name.to_string_lossy(),
                    "mirrored external state differs from the live copy; the live copy wins"
                );
            }
        }
        Ok(())
    }
}

/// `*.json` files directly inside `dir`, sorted by name. Missing directory
/// means no files.
fn json_files(fs: &dyn FileSystem, dir: &Path) -> Result<Vec<PathBuf>> {
    if !fs.is_dir(dir) {
        return Ok(Vec::new());
    }
    let mut files: Vec<PathBuf> = fs
        .read_dir(dir)?
        .into_iter()
        .filter(|p| fs.is_file(p) && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}
