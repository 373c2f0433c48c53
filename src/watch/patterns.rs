// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use globset::GlobSet;

use crate::assets::compile_globs;
use crate::dag::TaskName;
use crate::errors::Result;

/// Uncompiled watch rule: which task a set of globs (relative to `base`)
/// re-runs.
#[derive(Debug, Clone)]
pub struct WatchSpec {
    pub task: TaskName,
    pub base: PathBuf,
    pub watch: Vec<String>,
    pub exclude: Vec<String>,
}

impl WatchSpec {
    pub fn new(task: impl Into<TaskName>, base: impl Into<PathBuf>, watch: Vec<String>) -> Self {
        Self {
            task: task.into(),
            base: base.into(),
            watch,
            exclude: Vec::new(),
        }
    }

    pub fn with_excludes(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }
}

/// Compiled watch rule for one task.
#[derive(Clone)]
pub struct WatchProfile {
    task: TaskName,
    base: PathBuf,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for WatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchProfile")
            .field("task", &self.task)
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl WatchProfile {
    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Whether a change at `path` (absolute) concerns this profile's task.
    pub fn matches(&self, path: &Path) -> bool {
        let Some(rel) = relative_to(&self.base, path) else {
            return false;
        };
        self.watch_set.is_match(&rel)
            && !self.exclude_set.as_ref().is_some_and(|ex| ex.is_match(&rel))
    }
}

/// Compile every watch rule. Bases are canonicalized when they exist so event
/// paths reported by the OS compare equal.
pub fn build_watch_profiles(specs: &[WatchSpec]) -> Result<Vec<WatchProfile>> {
    specs
        .iter()
        .map(|spec| {
            let exclude_set = if spec.exclude.is_empty() {
                None
            } else {
                Some(compile_globs(&spec.task, &spec.exclude)?)
            };
            Ok(WatchProfile {
                task: spec.task.clone(),
                base: spec.base.canonicalize().unwrap_or_else(|_| spec.base.clone()),
                watch_set: compile_globs(&spec.task, &spec.watch)?,
                exclude_set,
            })
        })
        .collect()
}

/// The tasks to re-run for a change at `path`, in profile order, without
/// duplicates. Empty when the path is outside every glob.
pub fn tasks_for_path<'a>(profiles: &'a [WatchProfile], path: &Path) -> Vec<&'a str> {
    let mut tasks: Vec<&str> = Vec::new();
    for profile in profiles.iter().filter(|p| p.matches(path)) {
        if !tasks.contains(&profile.task()) {
            tasks.push(profile.task());
        }
    }
    tasks
}

/// `path` relative to `base` with forward slashes.
///
/// Falls back to comparing canonical paths, since the OS may report events
/// through a different prefix (symlinks, `/private/var` on macOS). A removed
/// file cannot be canonicalized, so its parent is tried instead.
fn relative_to(base: &Path, path: &Path) -> Option<String> {
    let slash = |rel: &Path| rel.to_string_lossy().replace('\\', "/");

    if let Ok(rel) = path.strip_prefix(base) {
        return Some(slash(rel));
    }

    let base = base.canonicalize().ok()?;
    if let Ok(canon) = path.canonicalize() {
        return canon.strip_prefix(&base).ok().map(slash);
    }

    let parent = path.parent()?.canonicalize().ok()?;
    let name = path.file_name()?;
    parent.join(name).strip_prefix(&base).ok().map(slash)
}
