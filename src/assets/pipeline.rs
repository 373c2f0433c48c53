// src/assets/pipeline.rs

//! One asset class, end to end:
//! discover → gate → transform chain → dual write → reload → minify → write.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::assets::{discover, AssetClass, SourceFile};
use crate::config::Settings;
use crate::errors::{BuildError, Result};
use crate::fs::FileSystem;
use crate::reload::ReloadBus;
use crate::sink::DualSink;
use crate::track::ChangeTracker;
use crate::transform::{Asset, Diagnostics};

/// What a single pipeline run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Class-relative paths written to every destination root.
    pub written: Vec<String>,
    /// Up-to-date outputs left alone.
    pub skipped: usize,
}

impl PipelineReport {
    fn merge(&mut self, other: PipelineReport) {
        self.written.extend(other.written);
        self.skipped += other.skipped;
    }
}

pub struct AssetPipeline {
    class: AssetClass,
    src_root: PathBuf,
    fs: Arc<dyn FileSystem>,
    sink: DualSink,
    tracker: ChangeTracker,
    bus: ReloadBus,
    diagnostics: Diagnostics,
}

impl std::fmt::Debug for AssetPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetPipeline")
            .field("class", &self.class.name)
            .field("roots", &self.sink.roots())
            .finish_non_exhaustive()
    }
}

impl AssetPipeline {
    pub fn new(
        class: AssetClass,
        settings: &Settings,
        fs: Arc<dyn FileSystem>,
        bus: ReloadBus,
        diagnostics: Diagnostics,
    ) -> Result<Self> {
        let roots: Vec<PathBuf> = settings
            .destination_roots()
            .into_iter()
            .map(|root| {
                if class.dest.is_empty() {
                    root
                } else {
                    root.join(&class.dest)
                }
            })
            .collect();

        let tracker = ChangeTracker::with_storage(
            &class.name,
            settings.fingerprint,
            settings.record_storage,
            &settings.root,
            roots.clone(),
            Arc::clone(&fs),
        )?;

        Ok(Self {
            sink: DualSink::new(roots, Arc::clone(&fs)),
            src_root: settings.src_root.clone(),
            class,
            fs,
            tracker,
            bus,
            diagnostics,
        })
    }

    pub fn class(&self) -> &AssetClass {
        &self.class
    }

    pub fn discover(&self) -> Result<Vec<SourceFile>> {
        discover(self.fs.as_ref(), &self.src_root, &self.class)
    }

    /// Run the class once. Change records are persisted even when the run
    /// fails part-way, so outputs written before the failure are not redone.
    pub fn run(&self) -> Result<PipelineReport> {
        let started = Instant::now();
        let sources = self.discover()?;
        debug!(class = %self.class.name, sources = sources.len(), "discovered sources");

        let result = if self.class.chain.concat_target().is_some() {
            self.run_merged(&sources)
        } else {
            self.run_each(&sources)
        };
        let flushed = self.tracker.flush();

        let report = result?;
        flushed?;

        info!(
            class = %self.class.name,
            written = report.written.len(),
            skipped = report.skipped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline finished"
        );
        Ok(report)
    }

    /// Many sources, one output: the output is rebuilt in memory and written
    /// only if its bytes differ from what the destinations hold.
    fn run_merged(&self, sources: &[SourceFile]) -> Result<PipelineReport> {
        if sources.is_empty() {
            debug!(class = %self.class.name, "no sources; nothing to merge");
            return Ok(PipelineReport::default());
        }

        let outputs = self.class.chain.apply(self.load(sources)?, &self.diagnostics)?;
        let names: Vec<String> = sources.iter().map(|s| self.source_name(s)).collect();

        let mut report = PipelineReport::default();
        for full in &outputs {
            self.write_if_changed(full, &mut report)?;
        }
        self.announce(&report.written);

        let mut minified = PipelineReport::default();
        for full in &outputs {
            for artifact in self.class.chain.minify(full, &names)? {
                self.write_if_changed(&artifact, &mut minified)?;
            }
        }
        self.announce(&minified.written);

        report.merge(minified);
        Ok(report)
    }

    /// One output per source: sources whose outputs are current never enter
    /// the chain.
    fn run_each(&self, sources: &[SourceFile]) -> Result<PipelineReport> {
        let mut report = PipelineReport::default();
        let mut stale = Vec::new();

        for source in sources {
            let out = self.class.chain.output_path(&source.rel);
            if self.tracker.is_stale(&source.path, &out)? {
                stale.push(source.clone());
            } else {
                report.skipped += 1;
            }
        }

        if stale.is_empty() {
            debug!(class = %self.class.name, skipped = report.skipped, "all outputs current");
            return Ok(report);
        }

        let outputs = self.class.chain.apply(self.load(&stale)?, &self.diagnostics)?;

        let mut first_error: Option<BuildError> = None;
        for asset in &outputs {
            match self.sink.write(&asset.path, &asset.contents) {
                Ok(()) => {
                    if let Some(source) = asset.sources.first() {
                        self.tracker.record(source, &asset.path)?;
                    }
                    report.written.push(asset.path.clone());
                }
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        self.announce(&report.written);

        if let Some(err) = first_error {
            return Err(err);
        }

        let mut minified = PipelineReport::default();
        for (full, source) in outputs.iter().zip(&stale) {
            for artifact in self.class.chain.minify(full, &[self.source_name(source)])? {
                self.write_if_changed(&artifact, &mut minified)?;
            }
        }
        self.announce(&minified.written);

        report.merge(minified);
        Ok(report)
    }

    fn load(&self, sources: &[SourceFile]) -> Result<Vec<Asset>> {
        sources
            .iter()
            .map(|s| Ok(Asset::new(s.rel.clone(), s.path.clone(), self.fs.read(&s.path)?)))
            .collect()
    }

    fn write_if_changed(&self, asset: &Asset, report: &mut PipelineReport) -> Result<()> {
        if self.tracker.is_content_stale(&asset.contents, &asset.path)? {
            self.sink.write(&asset.path, &asset.contents)?;
            report.written.push(asset.path.clone());
        } else {
            report.skipped += 1;
        }
        Ok(())
    }

    fn announce(&self, written: &[String]) {
        if written.is_empty() {
            return;
        }
        let paths: Vec<String> = written.iter().map(|p| self.dest_path(p)).collect();
        self.bus.publish_as(
            &self.class.name,
            self.class.kind,
            self.class.reload_mode,
            &paths,
            self.class.reload_matcher.as_ref(),
        );
    }

    /// Class-relative output path as seen from a destination root.
    fn dest_path(&self, rel: &str) -> String {
        if self.class.dest.is_empty() {
            rel.to_string()
        } else {
            format!("{}/{}", self.class.dest, rel)
        }
    }

    /// Source-root-relative name used in source maps.
    fn source_name(&self, source: &SourceFile) -> String {
        if self.class.base.is_empty() {
            source.rel.clone()
        } else {
            format!("{}/{}", self.class.base, source.rel)
        }
    }
}
