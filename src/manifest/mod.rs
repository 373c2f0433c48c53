// src/manifest/mod.rs

//! Generated theme files: the include aggregator (`functions.php`) and the
//! theme header stylesheet (`style.css`).

use std::path::PathBuf;
use std::sync::Arc;

use globset::GlobSet;
use tracing::{debug, info};

use crate::assets::{compile_globs, SourceFile};
use crate::config::{ProjectInfo, Settings};
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::reload::ReloadBus;
use crate::sink::DualSink;
use crate::track::{ChangeTracker, MemoryRecordStore};
use crate::types::AssetClassKind;

pub const AGGREGATOR_FILE: &str = "functions.php";
pub const THEME_HEADER_FILE: &str = "style.css";
/// Destination subdirectory include files are copied to.
pub const INCLUDE_DIR: &str = "inc";

const LINE_END: &str = "\r\n";

/// Aggregator body listing every top-level `*.php` include, in the order
/// given. Nested files (e.g. `vendor/b.php`) are copied but never required
/// directly.
pub fn aggregator(includes: &[SourceFile]) -> Result<String> {
    let top_level = top_level_php()?;

    let mut out = format!("<?php{LINE_END}");
    for file in includes.iter().filter(|f| top_level.is_match(&f.rel)) {
        out.push_str(&format!(
            "require_once(get_stylesheet_directory() . '/{INCLUDE_DIR}/{}');{LINE_END}",
            file.rel
        ));
    }
    Ok(out)
}

fn top_level_php() -> Result<GlobSet> {
    compile_globs("aggregator", &["*.php".to_string()])
}

/// Theme header comment read by the CMS to identify the theme.
pub fn theme_header(project: &ProjectInfo) -> String {
    format!(
        "/*{LINE_END}Theme Name: {}{LINE_END}Theme URI: http://{}{LINE_END}Author: {}{LINE_END}*/",
        project.title, project.hostname, project.author
    )
}

/// Writes generated files at the root of both destination trees.
pub struct ManifestGenerator {
    project: ProjectInfo,
    sink: DualSink,
    tracker: ChangeTracker,
    bus: ReloadBus,
}

impl std::fmt::Debug for ManifestGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestGenerator")
            .field("project", &self.project)
            .field("roots", &self.sink.roots())
            .finish_non_exhaustive()
    }
}

impl ManifestGenerator {
    pub fn new(settings: &Settings, fs: Arc<dyn FileSystem>, bus: ReloadBus) -> Result<Self> {
        let roots: Vec<PathBuf> = settings.destination_roots();
        let tracker = ChangeTracker::new(
            "manifest",
            settings.fingerprint,
            roots.clone(),
            Arc::clone(&fs),
            Box::new(MemoryRecordStore::new()),
        )?;

        Ok(Self {
            project: settings.project.clone(),
            sink: DualSink::new(roots, fs),
            tracker,
            bus,
        })
    }

    /// Regenerate the aggregator from `includes` and write it with a single
    /// truncating write per root. Returns whether anything was written.
    pub fn write_aggregator(&self, includes: &[SourceFile]) -> Result<bool> {
        let contents = aggregator(includes)?;

        if !self.tracker.is_content_stale(contents.as_bytes(), AGGREGATOR_FILE)? {
            debug!(file = AGGREGATOR_FILE, "aggregator unchanged");
            return Ok(false);
        }

        self.sink.write(AGGREGATOR_FILE, contents.as_bytes())?;
        info!(file = AGGREGATOR_FILE, "generated include aggregator");
        self.bus.publish(
            "includes",
            AssetClassKind::Include,
            &[AGGREGATOR_FILE.to_string()],
            None,
        );
        Ok(true)
    }

    /// Always writes the header; it is cheap and identifies the theme.
    pub fn write_theme_header(&self) -> Result<()> {
        self.sink.write(THEME_HEADER_FILE, theme_header(&self.project).as_bytes())?;
        debug!(file = THEME_HEADER_FILE, "wrote theme header");
        self.bus.publish(
            "theme-header",
            AssetClassKind::ManifestData,
            &[THEME_HEADER_FILE.to_string()],
            None,
        );
        Ok(())
    }
}
