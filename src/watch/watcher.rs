// src/watch/watcher.rs

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::dag::TaskGraph;
use crate::errors::{BuildError, Result};
use crate::watch::debounce::Debouncer;
use crate::watch::patterns::{tasks_for_path, WatchProfile};

/// Keeps the OS watcher and the event loop alive. Dropping it stops
/// watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    event_loop: JoinHandle<()>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.event_loop.abort();
    }
}

/// Watch the base directory of every profile and run the matching task of
/// `graph` for each relevant change.
///
/// Every trigger is an independent run: in-flight runs are never cancelled.
/// Repeated triggers of one task within `debounce` collapse into one run.
pub fn spawn_watcher(
    profiles: Vec<WatchProfile>,
    graph: Arc<TaskGraph>,
    debounce: Duration,
) -> Result<WatcherHandle> {
    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if event_tx.send(event).is_err() {
                    trace!("watch event loop gone; dropping event");
                }
            }
            Err(err) => warn!(error = %err, "file watch error"),
        },
        Config::default(),
    )
    .map_err(watch_error)?;

    let bases: BTreeSet<PathBuf> = profiles.iter().map(|p| p.base().to_path_buf()).collect();
    for base in &bases {
        if !base.is_dir() {
            warn!(?base, "not watching missing directory");
            continue;
        }
        watcher.watch(base, RecursiveMode::Recursive).map_err(watch_error)?;
        info!("file watcher started on {:?}", base);
    }

    let profiles = Arc::new(profiles);
    let debouncer = Debouncer::new();

    let event_loop = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if matches!(event.kind, EventKind::Access(_)) {
                continue;
            }
            trace!(?event, "received notify event");

            for path in &event.paths {
                for task in tasks_for_path(&profiles, path) {
                    debug!(?path, task, "change matched");
                    trigger(&graph, &debouncer, task, debounce);
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        _inner: watcher,
        event_loop,
    })
}

fn trigger(graph: &Arc<TaskGraph>, debouncer: &Debouncer, task: &str, window: Duration) {
    let ticket = debouncer.schedule(task);
    let graph = Arc::clone(graph);
    let debouncer = debouncer.clone();
    let task = task.to_string();

    tokio::spawn(async move {
        if !window.is_zero() {
            tokio::time::sleep(window).await;
        }
        if !debouncer.is_latest(&task, ticket) {
            trace!(task = %task, ticket, "superseded by a newer change");
            return;
        }

        info!(task = %task, "change detected; re-running");
        if let Err(failures) = graph.run(&task).await {
            error!(task = %task, "{failures}");
        }
    });
}

fn watch_error(err: notify::Error) -> BuildError {
    BuildError::Other(anyhow::anyhow!("file watcher: {err}"))
}
