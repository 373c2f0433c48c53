// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::DEFAULT_SETTINGS_FILE;

/// Command-line arguments for `themeforge`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "themeforge",
    version,
    about = "Build theme assets into the staging and live trees, and rebuild on change.",
    long_about = None
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to the settings file (TOML).
    ///
    /// Relative paths inside it resolve against its directory.
    #[arg(long, global = true, value_name = "PATH", default_value = DEFAULT_SETTINGS_FILE)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `THEMEFORGE_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate settings and print the asset classes, but don't build.
    #[arg(long, global = true)]
    pub dry_run: bool,
}

impl CliArgs {
    /// `watch` when no subcommand is given.
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Watch)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Clean and rebuild both output trees once.
    Build,
    /// Build, then rebuild affected classes whenever sources change.
    Watch,
    /// Build, then run the `[hooks].activate` command.
    Install,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
