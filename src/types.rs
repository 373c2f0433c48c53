// src/types.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// How the change tracker fingerprints files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintMode {
    /// File size plus modification time. Cheap; the default.
    Mtime,
    /// blake3 hash of the file contents, for filesystems with unreliable mtimes.
    Hash,
}

impl Default for FingerprintMode {
    fn default() -> Self {
        FingerprintMode::Mtime
    }
}

/// Where change records are kept between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStorageMode {
    /// One file per asset class under `.themeforge/records/`.
    File,
    /// In memory only (lost on restart).
    Memory,
}

impl Default for RecordStorageMode {
    fn default() -> Self {
        RecordStorageMode::Memory
    }
}

/// Category of source files handled by one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetClassKind {
    Vendor,
    Style,
    Script,
    Image,
    Font,
    Include,
    Controller,
    View,
    ManifestData,
}

impl AssetClassKind {
    /// Style changes can be injected into a running page; everything else
    /// needs a full reload.
    pub fn reload_mode(self) -> ReloadMode {
        match self {
            AssetClassKind::Style => ReloadMode::Inject,
            _ => ReloadMode::Full,
        }
    }
}

impl fmt::Display for AssetClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssetClassKind::Vendor => "vendor",
            AssetClassKind::Style => "style",
            AssetClassKind::Script => "script",
            AssetClassKind::Image => "image",
            AssetClassKind::Font => "font",
            AssetClassKind::Include => "include",
            AssetClassKind::Controller => "controller",
            AssetClassKind::View => "view",
            AssetClassKind::ManifestData => "manifest-data",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadMode {
    Inject,
    Full,
}
