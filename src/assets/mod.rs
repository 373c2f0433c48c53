// src/assets/mod.rs

//! Asset classes and their pipelines.
//!
//! An [`AssetClass`] says which source files belong together and what
//! happens to them; [`catalog`] defines the classes of a theme project,
//! [`discover`] finds their files and [`pipeline`] runs one class end to end.

pub mod catalog;
pub mod discover;
pub mod pipeline;

use std::fmt;
use std::path::PathBuf;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::errors::{BuildError, Result};
use crate::transform::Chain;
use crate::types::{AssetClassKind, ReloadMode};

pub use catalog::{default_classes, names};
pub use discover::discover;
pub use pipeline::{AssetPipeline, PipelineReport};

/// A discovered input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute (or source-root-joined) path on disk.
    pub path: PathBuf,
    /// Path relative to the class base directory, `/`-separated.
    pub rel: String,
    pub kind: AssetClassKind,
}

/// Immutable description of one category of sources.
#[derive(Clone)]
pub struct AssetClass {
    pub name: String,
    pub kind: AssetClassKind,
    /// Directory under the source root the globs are relative to.
    /// Output paths keep the part of the source path below it.
    pub base: String,
    pub globs: Vec<String>,
    pub excludes: Vec<String>,
    /// Subdirectory of each destination root; empty for the root itself.
    pub dest: String,
    pub chain: Chain,
    /// Only outputs matching this set are announced on the reload bus.
    pub reload_matcher: Option<GlobSet>,
    /// How browsers pick up this class's outputs; defaults from `kind`.
    pub reload_mode: ReloadMode,
    include_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetClass")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("base", &self.base)
            .field("globs", &self.globs)
            .field("excludes", &self.excludes)
            .field("dest", &self.dest)
            .field("chain", &self.chain)
            .field("reload_mode", &self.reload_mode)
            .finish_non_exhaustive()
    }
}

impl AssetClass {
    pub fn new(
        name: impl Into<String>,
        kind: AssetClassKind,
        base: impl Into<String>,
        globs: Vec<String>,
        dest: impl Into<String>,
        chain: Chain,
    ) -> Result<Self> {
        let name = name.into();
        let include_set = compile_globs(&name, &globs)?;
        Ok(Self {
            name,
            kind,
            base: base.into().trim_matches('/').to_string(),
            globs,
            excludes: Vec::new(),
            dest: dest.into().trim_matches('/').to_string(),
            chain,
            reload_matcher: None,
            reload_mode: kind.reload_mode(),
            include_set,
            exclude_set: None,
        })
    }

    pub fn with_excludes(mut self, excludes: Vec<String>) -> Result<Self> {
        self.exclude_set = if excludes.is_empty() {
            None
        } else {
            Some(compile_globs(&self.name, &excludes)?)
        };
        self.excludes = excludes;
        Ok(self)
    }

    pub fn with_reload_matcher(mut self, patterns: &[&str]) -> Result<Self> {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        self.reload_matcher = Some(compile_globs(&self.name, &patterns)?);
        Ok(self)
    }

    pub fn with_reload_mode(mut self, mode: ReloadMode) -> Self {
        self.reload_mode = mode;
        self
    }

    /// Whether a base-relative path belongs to this class.
    pub fn matches(&self, rel: &str) -> bool {
        self.include_set.is_match(rel)
            && !self.exclude_set.as_ref().is_some_and(|ex| ex.is_match(rel))
    }

    /// Index of the first glob matching `rel`; discovery orders by it.
    pub fn glob_rank(&self, rel: &str) -> Option<usize> {
        self.include_set.matches(rel).into_iter().min()
    }

    /// Globs relative to the source root rather than the class base.
    pub fn rooted_globs(&self) -> Vec<String> {
        self.globs.iter().map(|g| self.rooted(g)).collect()
    }

    pub fn rooted_excludes(&self) -> Vec<String> {
        self.excludes.iter().map(|g| self.rooted(g)).collect()
    }

    fn rooted(&self, glob: &str) -> String {
        if self.base.is_empty() {
            glob.to_string()
        } else {
            format!("{}/{}", self.base, glob)
        }
    }
}

/// Compile patterns so that `*` never crosses a `/`: `*.php` only matches
/// files directly in the base directory.
pub fn compile_globs(owner: &str, patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .map_err(|e| {
                BuildError::ConfigError(format!("invalid glob pattern '{pat}' for {owner}: {e}"))
            })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| BuildError::ConfigError(format!("building globset for {owner}: {e}")))
}
