// src/logging.rs

//! `tracing` subscriber setup.
//!
//! The level applies to this crate's own events; dependencies (the file
//! watcher backend in particular) only get through at `warn`. It is taken
//! from `--log-level`, then `THEMEFORGE_LOG`, then defaults to `info`.
//! Output goes to stderr.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "THEMEFORGE_LOG";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let level = resolve_level(cli_level, std::env::var(LOG_ENV).ok().as_deref());
    let filter = EnvFilter::new(format!(
        "warn,{}={}",
        env!("CARGO_CRATE_NAME"),
        level.as_str().to_ascii_lowercase()
    ));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("initialising logging: {e}"))
}

/// The flag wins over the environment value; an unknown value means `info`.
pub fn resolve_level(cli_level: Option<LogLevel>, env_value: Option<&str>) -> Level {
    cli_level
        .map(Level::from)
        .or_else(|| env_value.and_then(level_named))
        .unwrap_or(Level::INFO)
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

fn level_named(name: &str) -> Option<Level> {
    let name = name.trim().to_ascii_lowercase();
    if name == "warning" {
        return Some(Level::WARN);
    }
    name.parse().ok()
}
