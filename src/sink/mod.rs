// src/sink/mod.rs

//! Writes every output to all destination roots.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::errors::{BuildError, Result};
use crate::fs::FileSystem;

/// Writer that mirrors every file into each destination root.
///
/// Roots are written independently: a failure in one root never prevents the
/// attempt on the others, but any failure is reported as
/// [`BuildError::PartialWrite`].
#[derive(Debug, Clone)]
pub struct DualSink {
    roots: Vec<PathBuf>,
    fs: Arc<dyn FileSystem>,
}

impl DualSink {
    pub fn new(roots: Vec<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self { roots, fs }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Write `content` to `<root>/<rel>` for every root.
    pub fn write(&self, rel: &str, content: &[u8]) -> Result<()> {
        self.for_each_root(rel, |path| self.fs.write(path, content))?;
        debug!(path = rel, bytes = content.len(), roots = self.roots.len(), "wrote output");
        Ok(())
    }

    /// Copy a source file to `<root>/<rel>` for every root.
    pub fn copy_from(&self, source: &Path, rel: &str) -> Result<()> {
        let content = self.fs.read(source)?;
        self.write(rel, &content)
    }

    /// Make sure `<root>/<rel>` exists as a directory in every root.
    /// Succeeds if it is already there.
    pub fn ensure_dir(&self, rel: &str) -> Result<()> {
        self.for_each_root(rel, |path| self.fs.create_dir_all(path))
    }

    /// Remove every destination root.
    pub fn clear(&self) -> Result<()> {
        self.for_each_root("", |path| self.fs.remove_dir_all(path))
    }

    fn for_each_root<F>(&self, rel: &str, op: F) -> Result<()>
    where
        F: Fn(&Path) -> Result<()>,
    {
        let mut failures = Vec::new();

        for root in &self.roots {
            let path = if rel.is_empty() {
                root.clone()
            } else {
                root.join(rel)
            };
            if let Err(err) = op(&path) {
                warn!(?root, path = rel, error = %err, "destination root rejected operation");
                failures.push(format!("{}: {err}", root.display()));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(BuildError::PartialWrite {
                path: rel.to_string(),
                failures,
            })
        }
    }
}
