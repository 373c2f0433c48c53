// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{RawSettings, Settings};
use crate::errors::{BuildError, Result};

/// Load a settings file and return the raw document.
///
/// This only performs TOML deserialization. Use [`load_and_validate`] to get
/// a usable [`Settings`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawSettings> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        BuildError::ConfigError(format!("cannot read settings file {:?}: {e}", path))
    })?;

    let raw: RawSettings = toml::from_str(&contents)?;

    Ok(raw)
}

/// Load a settings file, apply defaults and validate.
///
/// Relative paths inside the file resolve against the file's directory.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Settings> {
    let path = path.as_ref();
    let raw = load_from_path(path)?;
    Settings::resolve(raw, settings_root_dir(path))
}

/// Directory containing the settings file, or the current working directory
/// for a bare file name.
pub fn settings_root_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Settings file looked up when `--config` is not given.
pub const DEFAULT_SETTINGS_FILE: &str = "Themeforge.toml";
