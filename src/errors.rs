// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cycle detected in task graph: {0}")]
    GraphCycle(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// At least one destination root rejected a write. The other roots were
    /// still attempted.
    #[error("write of {path} failed for {} destination root(s): {}", failures.len(), failures.join("; "))]
    PartialWrite { path: String, failures: Vec<String> },

    #[error("Transform '{stage}' failed on {path}: {message}")]
    Transform {
        stage: String,
        path: String,
        message: String,
    },

    #[error("External process `{cmd}` exited with code {code:?}: {stderr}")]
    ExternalProcess {
        cmd: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("External state error: {0}")]
    ExternalState(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BuildError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BuildError>;
