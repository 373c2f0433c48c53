// src/track/fingerprint.rs

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::UNIX_EPOCH;

use blake3::Hasher;

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::types::FingerprintMode;

/// Cheap proxy for file content used to detect staleness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fingerprint {
    /// Size plus modification time in nanoseconds since the epoch.
    Meta { len: u64, mtime_ns: u128 },
    /// blake3 hex digest of the content.
    Hash(String),
}

/// Fingerprint `path`, or `None` if it does not exist.
pub fn fingerprint(
    fs: &dyn FileSystem,
    path: &Path,
    mode: FingerprintMode,
) -> Result<Option<Fingerprint>> {
    match mode {
        FingerprintMode::Mtime => Ok(fs.metadata(path)?.map(|meta| Fingerprint::Meta {
            len: meta.len,
            mtime_ns: meta
                .modified
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos(),
        })),
        FingerprintMode::Hash => {
            if !fs.is_file(path) {
                return Ok(None);
            }
            let content = fs.read(path)?;
            Ok(Some(Fingerprint::Hash(content_hash(&content))))
        }
    }
}

/// blake3 hex digest of `content`.
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(content);
    hasher.finalize().to_hex().to_string()
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fingerprint::Meta { len, mtime_ns } => write!(f, "m:{len}:{mtime_ns}"),
            Fingerprint::Hash(hash) => write!(f, "h:{hash}"),
        }
    }
}

impl FromStr for Fingerprint {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if let Some(hash) = s.strip_prefix("h:") {
            return Ok(Fingerprint::Hash(hash.to_string()));
        }
        if let Some(rest) = s.strip_prefix("m:") {
            if let Some((len, mtime)) = rest.split_once(':') {
                let len = len.parse().map_err(|e| format!("bad length in {s:?}: {e}"))?;
                let mtime_ns = mtime.parse().map_err(|e| format!("bad mtime in {s:?}: {e}"))?;
                return Ok(Fingerprint::Meta { len, mtime_ns });
            }
        }
        Err(format!("unrecognised fingerprint {s:?}"))
    }
}
