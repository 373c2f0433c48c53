// src/reload/mod.rs

//! Live-reload notifications.
//!
//! Pipelines publish a [`ReloadEvent`] after every successful write. Any
//! number of observers (the TCP notifier in [`server`], the log observer,
//! tests) can subscribe. Publishing never blocks and never fails: if nobody
//! listens the event is dropped.

pub mod server;

use globset::GlobSet;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, trace};

use crate::types::{AssetClassKind, ReloadMode};

pub use server::spawn_reload_server;

/// Capacity of the broadcast channel; slow observers skip older events.
const BUS_CAPACITY: usize = 256;

/// One batch of changed outputs for an asset class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReloadEvent {
    /// Asset class name, e.g. `"styles"`.
    pub class: String,
    pub kind: AssetClassKind,
    /// `inject` for stylesheet-only changes, `full` for everything else.
    pub mode: ReloadMode,
    /// Destination-relative paths that changed.
    pub paths: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ReloadBus {
    tx: broadcast::Sender<ReloadEvent>,
    enabled: bool,
}

impl Default for ReloadBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(BUS_CAPACITY);
        Self { tx, enabled: true }
    }

    /// A bus that drops every event.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.tx.subscribe()
    }

    /// Notify observers that `paths` of `class` changed, using the default
    /// reload mode of `kind`.
    ///
    /// When `matcher` is given, only matching paths are announced and nothing
    /// is sent if none match.
    pub fn publish(
        &self,
        class: &str,
        kind: AssetClassKind,
        paths: &[String],
        matcher: Option<&GlobSet>,
    ) {
        self.publish_as(class, kind, kind.reload_mode(), paths, matcher);
    }

    /// Like [`publish`](Self::publish) with an explicit reload mode.
    pub fn publish_as(
        &self,
        class: &str,
        kind: AssetClassKind,
        mode: ReloadMode,
        paths: &[String],
        matcher: Option<&GlobSet>,
    ) {
        if !self.enabled {
            return;
        }

        let paths: Vec<String> = paths
            .iter()
            .filter(|p| matcher.is_none_or(|m| m.is_match(p.as_str())))
            .cloned()
            .collect();
        if paths.is_empty() {
            return;
        }

        let event = ReloadEvent {
            class: class.to_string(),
            kind,
            mode,
            paths,
        };

        match self.tx.send(event) {
            Ok(receivers) => trace!(class, receivers, "published reload event"),
            Err(_) => trace!(class, "no reload observers; event dropped"),
        }
    }
}

/// Log every reload event at `info`. Runs until the bus is dropped.
pub fn spawn_log_observer(bus: &ReloadBus) -> tokio::task::JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => info!(
                    class = %event.class,
                    mode = ?event.mode,
                    paths = ?event.paths,
                    "reload"
                ),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    trace!(skipped, "reload log observer lagged")
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
