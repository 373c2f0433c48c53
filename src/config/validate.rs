// src/config/validate.rs

use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};

use crate::config::model::{
    ProjectInfo, RawSettings, Settings, DEFAULT_AUTHOR, DEFAULT_HOSTNAME, DEFAULT_SLUG,
    DEFAULT_TITLE,
};
use crate::errors::{BuildError, Result};

impl Settings {
    /// Apply defaults to `raw`, resolve relative paths against `root` and
    /// validate the result.
    pub fn resolve(raw: RawSettings, root: impl Into<PathBuf>) -> Result<Settings> {
        let project = ProjectInfo {
            slug: non_empty_or(&raw.slug, DEFAULT_SLUG),
            hostname: non_empty_or(&raw.hostname, DEFAULT_HOSTNAME),
            title: non_empty_or(&raw.title, DEFAULT_TITLE),
            author: non_empty_or(&raw.author, DEFAULT_AUTHOR),
        };

        validate_slug(&project.slug)?;
        validate_vendor_files(&raw.vendor.files)?;
        let listen = parse_listen(raw.reload.listen.as_deref())?;

        let mut settings = Settings::new_unchecked(project, root.into(), raw);
        settings.reload.listen = listen;

        validate_roots(&settings)?;
        Ok(settings)
    }
}

fn non_empty_or(value: &Option<String>, default: &str) -> String {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

fn validate_slug(slug: &str) -> Result<()> {
    if slug.contains(['/', '\\']) || slug == "." || slug == ".." {
        return Err(BuildError::ConfigError(format!(
            "slug '{slug}' must be a single path segment"
        )));
    }
    Ok(())
}

fn validate_vendor_files(files: &[String]) -> Result<()> {
    for file in files {
        let path = Path::new(file);
        let escapes = path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
        if file.trim().is_empty() || escapes {
            return Err(BuildError::ConfigError(format!(
                "[vendor].files entry '{file}' must be a path inside the source root"
            )));
        }
    }
    Ok(())
}

fn parse_listen(listen: Option<&str>) -> Result<Option<SocketAddr>> {
    match listen {
        None => Ok(None),
        Some(addr) => addr.parse().map(Some).map_err(|e| {
            BuildError::ConfigError(format!("[reload].listen '{addr}' is not a socket address: {e}"))
        }),
    }
}

/// Cleaning wipes both destination roots, so they must be distinct and must
/// not contain the source tree.
fn validate_roots(settings: &Settings) -> Result<()> {
    let build = &settings.build_root;
    let live = &settings.live_root;
    let src = &settings.src_root;

    if build == live {
        return Err(BuildError::ConfigError(format!(
            "build root and live root must differ (both are {:?})",
            build
        )));
    }

    for (name, dest) in [("build", build), ("live", live)] {
        if src.starts_with(dest) {
            return Err(BuildError::ConfigError(format!(
                "source root {:?} lies inside the {name} root {:?}, which is erased on every build",
                src, dest
            )));
        }
    }

    Ok(())
}
