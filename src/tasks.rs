// src/tasks.rs

//! Wiring: every component of a build, and the task graph over them.
//!
//! ```text
//! build   = clean-external-state > pull-external-state > clean-outputs > assets
//! assets  = vendor > theme
//! vendor  = vendor-scripts | vendor-styles
//! theme   = theme-header | external-state | includes | controllers | views
//!         | styles | scripts | images | fonts
//! watch   = build > start-watcher
//! install = build > activate
//! refresh-external-state = clean-external-state > pull-external-state
//! ```
//!
//! `>` is a sequence, `|` a parallel group.

use std::process::Stdio;
use std::sync::{Arc, OnceLock, Weak};

use anyhow::anyhow;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::assets::{default_classes, names as class, AssetPipeline};
use crate::config::Settings;
use crate::dag::{TaskGraph, TaskGraphBuilder};
use crate::errors::{BuildError, Result};
use crate::external::{ExternalStateManager, EXTERNAL_DIR};
use crate::fs::FileSystem;
use crate::manifest::ManifestGenerator;
use crate::reload::ReloadBus;
use crate::sink::DualSink;
use crate::transform::Diagnostics;
use crate::watch::{build_watch_profiles, spawn_watcher, WatchSpec};

pub mod names {
    pub const BUILD: &str = "build";
    pub const WATCH: &str = "watch";
    pub const INSTALL: &str = "install";
    pub const CLEAN_EXTERNAL_STATE: &str = "clean-external-state";
    pub const PULL_EXTERNAL_STATE: &str = "pull-external-state";
    pub const REFRESH_EXTERNAL_STATE: &str = "refresh-external-state";
    pub const CLEAN_OUTPUTS: &str = "clean-outputs";
    pub const ASSETS: &str = "assets";
    pub const VENDOR: &str = "vendor";
    pub const THEME: &str = "theme";
    pub const THEME_HEADER: &str = "theme-header";
    pub const EXTERNAL_STATE: &str = "external-state";
    pub const START_WATCHER: &str = "start-watcher";
    pub const ACTIVATE: &str = "activate";
}

use names::*;

/// Everything a build touches, created once and shared by all runs of the
/// task graph (so change records survive between watch-triggered runs).
pub struct BuildContext {
    pub settings: Arc<Settings>,
    pub fs: Arc<dyn FileSystem>,
    pub bus: ReloadBus,
    pub diagnostics: Diagnostics,
    pub pipelines: Vec<Arc<AssetPipeline>>,
    pub external: Arc<ExternalStateManager>,
    pub manifest: Arc<ManifestGenerator>,
    /// Both destination roots, for wiping them.
    pub outputs: DualSink,
}

impl std::fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildContext")
            .field("project", &self.settings.project.slug)
            .field("pipelines", &self.pipelines.len())
            .finish_non_exhaustive()
    }
}

impl BuildContext {
    pub fn new(settings: Arc<Settings>, fs: Arc<dyn FileSystem>, bus: ReloadBus) -> Result<Self> {
        let diagnostics = Diagnostics::new();

        let pipelines = default_classes(&settings)?
            .into_iter()
            .map(|c| {
                AssetPipeline::new(c, &settings, Arc::clone(&fs), bus.clone(), diagnostics.clone())
                    .map(Arc::new)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            external: Arc::new(ExternalStateManager::new(&settings, Arc::clone(&fs), bus.clone())),
            manifest: Arc::new(ManifestGenerator::new(&settings, Arc::clone(&fs), bus.clone())?),
            outputs: DualSink::new(settings.destination_roots(), Arc::clone(&fs)),
            pipelines,
            diagnostics,
            settings,
            fs,
            bus,
        })
    }

    pub fn pipeline(&self, name: &str) -> Option<&Arc<AssetPipeline>> {
        self.pipelines.iter().find(|p| p.class().name == name)
    }

    /// Glob-to-task rules for the watcher: each asset class re-runs its own
    /// task; the live external state re-pulls the mirror.
    pub fn watch_specs(&self) -> Vec<WatchSpec> {
        let mut specs: Vec<WatchSpec> = self
            .pipelines
            .iter()
            .map(|p| {
                let class = p.class();
                WatchSpec::new(&class.name, &self.settings.src_root, class.rooted_globs())
                    .with_excludes(class.rooted_excludes())
            })
            .collect();

        specs.push(WatchSpec::new(
            REFRESH_EXTERNAL_STATE,
            &self.settings.live_root,
            vec![format!("{EXTERNAL_DIR}/*.json")],
        ));
        specs
    }

    /// Build the task graph. `start-watcher` returns once `shutdown` turns
    /// true (or its sender is dropped).
    pub fn task_graph(&self, shutdown: watch::Receiver<bool>) -> Result<Arc<TaskGraph>> {
        let mut builder = TaskGraph::builder();

        for pipeline in &self.pipelines {
            let name = pipeline.class().name.clone();
            if name == class::INCLUDES {
                continue;
            }
            let pipeline = Arc::clone(pipeline);
            builder = builder.blocking(name, move || pipeline.run().map(|_| ()));
        }

        let includes = Arc::clone(self.pipeline(class::INCLUDES).ok_or_else(|| {
            BuildError::ConfigError(format!("asset class '{}' is missing", class::INCLUDES))
        })?);
        let manifest = Arc::clone(&self.manifest);
        builder = builder.blocking(class::INCLUDES, move || {
            includes.run()?;
            manifest.write_aggregator(&includes.discover()?)?;
            Ok(())
        });

        let manifest = Arc::clone(&self.manifest);
        builder = builder.blocking(THEME_HEADER, move || manifest.write_theme_header());

        let external = Arc::clone(&self.external);
        builder = builder.blocking(CLEAN_EXTERNAL_STATE, move || external.clean());
        let external = Arc::clone(&self.external);
        builder = builder.blocking(PULL_EXTERNAL_STATE, move || external.pull());
        let external = Arc::clone(&self.external);
        builder = builder.blocking(EXTERNAL_STATE, move || external.regenerate());

        let outputs = self.outputs.clone();
        builder = builder.blocking(CLEAN_OUTPUTS, move || outputs.clear());

        let activate = self.settings.activate_command();
        builder = builder.task(ACTIVATE, move || run_hook(activate.clone()));

        let graph_slot: Arc<OnceLock<Weak<TaskGraph>>> = Arc::new(OnceLock::new());
        builder = self.start_watcher(builder, Arc::clone(&graph_slot), shutdown);

        let graph = builder
            .parallel(VENDOR, [class::VENDOR_SCRIPTS, class::VENDOR_STYLES])
            .parallel(
                THEME,
                [
                    THEME_HEADER,
                    EXTERNAL_STATE,
                    class::INCLUDES,
                    class::CONTROLLERS,
                    class::VIEWS,
                    class::STYLES,
                    class::SCRIPTS,
                    class::IMAGES,
                    class::FONTS,
                ],
            )
            .sequence(ASSETS, [VENDOR, THEME])
            .sequence(
                BUILD,
                [CLEAN_EXTERNAL_STATE, PULL_EXTERNAL_STATE, CLEAN_OUTPUTS, ASSETS],
            )
            .sequence(REFRESH_EXTERNAL_STATE, [CLEAN_EXTERNAL_STATE, PULL_EXTERNAL_STATE])
            .sequence(WATCH, [BUILD, START_WATCHER])
            .sequence(INSTALL, [BUILD, ACTIVATE])
            .build()?;

        let _ = graph_slot.set(Arc::downgrade(&graph));
        Ok(graph)
    }

    fn start_watcher(
        &self,
        builder: TaskGraphBuilder,
        graph_slot: Arc<OnceLock<Weak<TaskGraph>>>,
        shutdown: watch::Receiver<bool>,
    ) -> TaskGraphBuilder {
        let specs = self.watch_specs();
        let debounce = self.settings.debounce;

        builder.task(START_WATCHER, move || {
            let graph_slot = Arc::clone(&graph_slot);
            let specs = specs.clone();
            let mut shutdown = shutdown.clone();
            async move {
                let graph = graph_slot.get().and_then(Weak::upgrade).ok_or_else(|| {
                    BuildError::Other(anyhow!("task graph dropped before the watcher started"))
                })?;

                let profiles = build_watch_profiles(&specs)?;
                let _watcher = spawn_watcher(profiles, graph, debounce)?;
                info!("watching for changes; press Ctrl-C to stop");

                // Err means the sender is gone, which also ends the watch.
                let _ = shutdown.wait_for(|stop| *stop).await;
                info!("watcher stopped");
                Ok(())
            }
        })
    }
}

/// Run the activation hook through the platform shell.
async fn run_hook(cmd: Option<String>) -> Result<()> {
    let Some(cmd) = cmd else {
        return Err(BuildError::ConfigError(
            "no activation command configured; set [hooks].activate".to_string(),
        ));
    };

    info!(cmd = %cmd, "running activation hook");

    let mut command = if cfg!(windows) {
        let mut c = tokio::process::Command::new("cmd");
        c.arg("/C").arg(&cmd);
        c
    } else {
        let mut c = tokio::process::Command::new("sh");
        c.arg("-c").arg(&cmd);
        c
    };

    let output = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| BuildError::ExternalProcess {
            cmd: cmd.clone(),
            code: None,
            stderr: format!("failed to spawn: {e}"),
        })?;

    for line in String::from_utf8_lossy(&output.stdout).lines() {
        info!(hook = "activate", "{line}");
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        warn!(code = ?output.status.code(), "activation hook failed");
        return Err(BuildError::ExternalProcess {
            cmd,
            code: output.status.code(),
            stderr,
        });
    }
    Ok(())
}
