// src/lib.rs

pub mod assets;
pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod external;
pub mod fs;
pub mod logging;
pub mod manifest;
pub mod reload;
pub mod sink;
pub mod tasks;
pub mod track;
pub mod transform;
pub mod types;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch::{self as shutdown, Receiver};
use tracing::{info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::{load_and_validate, Settings};
use crate::dag::{FailureList, TaskResult};
use crate::fs::RealFileSystem;
use crate::reload::{spawn_log_observer, spawn_reload_server, ReloadBus};
use crate::tasks::{names, BuildContext};

/// High-level entry point used by `main.rs`: load settings and run the
/// requested command.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let settings = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&settings)?;
        return Ok(());
    }

    let outcome = match args.command() {
        Command::Build => run_build(&settings).await,
        Command::Watch => run_watch(&settings).await,
        Command::Install => run_install(&settings).await,
    };

    outcome.map_err(anyhow::Error::new)
}

/// Clean and rebuild both output trees once.
pub async fn run_build(settings: &Settings) -> TaskResult {
    let (_stop_tx, stop_rx) = shutdown::channel(false);
    run_task(settings, names::BUILD, stop_rx, ReloadBus::disabled()).await
}

/// Build, then run the activation hook.
pub async fn run_install(settings: &Settings) -> TaskResult {
    let (_stop_tx, stop_rx) = shutdown::channel(false);
    run_task(settings, names::INSTALL, stop_rx, ReloadBus::disabled()).await
}

/// Build, then watch until Ctrl-C.
pub async fn run_watch(settings: &Settings) -> TaskResult {
    let (stop_tx, stop_rx) = shutdown::channel(false);

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {e}");
            return;
        }
        info!("Ctrl+C received; shutting down");
        let _ = stop_tx.send(true);
    });

    run_watch_until(settings, stop_rx).await
}

/// Build, then watch until `shutdown` turns true.
pub async fn run_watch_until(settings: &Settings, shutdown: Receiver<bool>) -> TaskResult {
    let bus = if settings.reload.enabled {
        ReloadBus::new()
    } else {
        ReloadBus::disabled()
    };

    if settings.reload.enabled {
        spawn_log_observer(&bus);
        if let Some(addr) = settings.reload.listen {
            spawn_reload_server(addr, bus.clone())
                .await
                .map_err(|e| FailureList::single("reload-server", e))?;
        }
    }

    run_task(settings, names::WATCH, shutdown, bus).await
}

async fn run_task(
    settings: &Settings,
    task: &str,
    shutdown: Receiver<bool>,
    bus: ReloadBus,
) -> TaskResult {
    let settings = Arc::new(settings.clone());
    let ctx = BuildContext::new(settings, Arc::new(RealFileSystem), bus)
        .map_err(|e| FailureList::single("startup", e))?;
    let graph = ctx
        .task_graph(shutdown)
        .map_err(|e| FailureList::single("startup", e))?;

    let result = graph.run(task).await;

    if !ctx.diagnostics.is_empty() {
        warn!(findings = ctx.diagnostics.len(), "lint findings reported");
    }
    match &result {
        Ok(()) => info!(task, "done"),
        Err(failures) => warn!(task, failed = failures.len(), "finished with failures"),
    }
    result
}

/// Print the resolved settings and asset classes without touching any file.
fn print_dry_run(settings: &Settings) -> Result<()> {
    println!("themeforge dry-run");
    println!("  project   = {} ({})", settings.project.title, settings.project.slug);
    println!("  src       = {}", settings.src_root.display());
    println!("  build     = {}", settings.build_root.display());
    println!("  live      = {}", settings.live_root.display());
    println!("  fingerprint = {:?}", settings.fingerprint);
    println!();

    let classes = assets::default_classes(settings)?;
    println!("asset classes ({}):", classes.len());
    for class in &classes {
        println!("  - {} [{}]", class.name, class.kind);
        println!("      globs: {:?}", class.rooted_globs());
        let dest = if class.dest.is_empty() { "." } else { class.dest.as_str() };
        println!("      dest: {dest}");
        if let Some(target) = class.chain.concat_target() {
            println!("      concat: {target}");
        }
    }

    if let Some(cmd) = settings.activate_command() {
        println!();
        println!("activate: {cmd}");
    }
    Ok(())
}
