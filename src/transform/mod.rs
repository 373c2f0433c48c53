// src/transform/mod.rs

//! Transform stage framework.
//!
//! An asset class declares a [`Chain`]: an ordered list of [`Stage`]s applied
//! to the discovered files, plus an optional [`MinifyStep`] that derives a
//! `.min` artifact from each finished output. The transforms themselves are
//! opaque ([`Transform`], [`Linter`]); [`builtin`] ships small default
//! implementations and [`external`] adapts any command-line tool.

pub mod builtin;
pub mod external;
pub mod sourcemap;

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use globset::GlobSet;
use tracing::{debug, warn};

use crate::errors::Result;

/// One file flowing through a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Output path relative to the class's destination subpath, `/`-separated.
    pub path: String,
    /// Source files this asset was built from, in order.
    pub sources: Vec<PathBuf>,
    pub contents: Vec<u8>,
}

impl Asset {
    pub fn new(path: impl Into<String>, source: PathBuf, contents: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            sources: vec![source],
            contents,
        }
    }
}

/// Opaque content transform: bytes in, bytes out.
pub trait Transform: Send + Sync {
    fn name(&self) -> &str;
    fn apply(&self, path: &str, input: &[u8]) -> Result<Vec<u8>>;
}

/// Reporting-only stage. Findings never fail a build.
pub trait Linter: Send + Sync {
    fn name(&self) -> &str;
    fn lint(&self, path: &str, input: &[u8]) -> Result<Vec<LintFinding>>;
}

/// Non-fatal diagnostic produced by a [`Linter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintFinding {
    pub linter: String,
    pub path: String,
    pub line: Option<usize>,
    pub message: String,
}

impl fmt::Display for LintFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "[{}] {}:{}: {}", self.linter, self.path, line, self.message),
            None => write!(f, "[{}] {}: {}", self.linter, self.path, self.message),
        }
    }
}

/// Shared sink collecting lint findings across all pipelines of a run.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    findings: Arc<Mutex<Vec<LintFinding>>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, finding: LintFinding) {
        warn!("{finding}");
        if let Ok(mut findings) = self.findings.lock() {
            findings.push(finding);
        }
    }

    pub fn findings(&self) -> Vec<LintFinding> {
        self.findings.lock().map(|f| f.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.findings.lock().map(|f| f.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single step of a chain.
#[derive(Clone)]
pub enum Stage {
    /// Lint every asset not matched by `skip`; assets pass through unchanged.
    Lint {
        linter: Arc<dyn Linter>,
        skip: Option<GlobSet>,
    },
    /// Replace each asset's contents.
    Transform(Arc<dyn Transform>),
    /// Drop directories from output paths.
    Flatten,
    /// Join every asset, in order, into one output with the given name.
    Concat(String),
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Lint { linter, .. } => write!(f, "Lint({})", linter.name()),
            Stage::Transform(t) => write!(f, "Transform({})", t.name()),
            Stage::Flatten => f.write_str("Flatten"),
            Stage::Concat(target) => write!(f, "Concat({target})"),
        }
    }
}

/// Derives `<name>.min.<ext>` from a finished output.
#[derive(Clone)]
pub struct MinifyStep {
    pub minifier: Arc<dyn Transform>,
    /// Also emit `<min>.map` and reference it from the minified output.
    pub sourcemap: bool,
}

impl fmt::Debug for MinifyStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MinifyStep")
            .field("minifier", &self.minifier.name())
            .field("sourcemap", &self.sourcemap)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Chain {
    pub stages: Vec<Stage>,
    pub minify: Option<MinifyStep>,
}

impl Chain {
    /// Whether the chain merges its inputs into a single output.
    pub fn concat_target(&self) -> Option<&str> {
        self.stages.iter().find_map(|s| match s {
            Stage::Concat(target) => Some(target.as_str()),
            _ => None,
        })
    }

    /// Where a source at `rel` ends up once the path-rewriting stages ran.
    pub fn output_path(&self, rel: &str) -> String {
        let mut path = rel.to_string();
        for stage in &self.stages {
            match stage {
                Stage::Flatten => path = file_name(&path).to_string(),
                Stage::Concat(target) => path = target.clone(),
                Stage::Lint { .. } | Stage::Transform(_) => {}
            }
        }
        path
    }

    /// Run every stage over `assets`, in declaration order.
    pub fn apply(&self, mut assets: Vec<Asset>, diagnostics: &Diagnostics) -> Result<Vec<Asset>> {
        for stage in &self.stages {
            debug!(?stage, assets = assets.len(), "applying stage");
            assets = apply_stage(stage, assets, diagnostics)?;
        }
        Ok(assets)
    }

    /// Produce the minified artifact (and optional source map) for a
    /// finished output. Returns an empty list without a minify step.
    pub fn minify(&self, full: &Asset, source_names: &[String]) -> Result<Vec<Asset>> {
        let Some(step) = &self.minify else {
            return Ok(Vec::new());
        };

        let min_path = min_path(&full.path);
        let mut contents = step.minifier.apply(&full.path, &full.contents)?;
        let mut out = Vec::with_capacity(2);

        if step.sourcemap {
            let map_path = format!("{min_path}.map");
            let map = sourcemap::source_map(file_name(&min_path), source_names);
            contents.extend_from_slice(sourcemap::url_comment(&min_path, file_name(&map_path)).as_bytes());
            out.push(Asset {
                path: map_path,
                sources: full.sources.clone(),
                contents: map.into_bytes(),
            });
        }

        out.insert(
            0,
            Asset {
                path: min_path,
                sources: full.sources.clone(),
                contents,
            },
        );
        Ok(out)
    }
}

fn apply_stage(stage: &Stage, assets: Vec<Asset>, diagnostics: &Diagnostics) -> Result<Vec<Asset>> {
    match stage {
        Stage::Lint { linter, skip } => {
            for asset in &assets {
                if skip.as_ref().is_some_and(|s| s.is_match(&asset.path)) {
                    continue;
                }
                match linter.lint(&asset.path, &asset.contents) {
                    Ok(findings) => findings.into_iter().for_each(|f| diagnostics.report(f)),
                    Err(err) => warn!(linter = linter.name(), path = %asset.path, error = %err, "linter failed to run"),
                }
            }
            Ok(assets)
        }
        Stage::Transform(transform) => assets
            .into_iter()
            .map(|mut asset| {
                asset.contents = transform.apply(&asset.path, &asset.contents)?;
                Ok(asset)
            })
            .collect(),
        Stage::Flatten => Ok(assets
            .into_iter()
            .map(|mut asset| {
                asset.path = file_name(&asset.path).to_string();
                asset
            })
            .collect()),
        Stage::Concat(target) => {
            if assets.is_empty() {
                return Ok(assets);
            }
            let mut contents = Vec::new();
            let mut sources = Vec::new();
            for (i, asset) in assets.into_iter().enumerate() {
                if i > 0 {
                    contents.push(b'\n');
                }
                contents.extend_from_slice(&asset.contents);
                sources.extend(asset.sources);
            }
            Ok(vec![Asset {
                path: target.clone(),
                sources,
                contents,
            }])
        }
    }
}

/// `css/main.css` -> `css/main.min.css`; `lib` -> `lib.min`.
pub fn min_path(path: &str) -> String {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[name_start..].rfind('.') {
        Some(dot) if dot > 0 => {
            let dot = name_start + dot;
            format!("{}.min{}", &path[..dot], &path[dot..])
        }
        _ => format!("{path}.min"),
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
