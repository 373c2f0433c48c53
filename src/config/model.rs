// src/config/model.rs

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{FingerprintMode, RecordStorageMode};

pub const DEFAULT_SLUG: &str = "theme-project";
pub const DEFAULT_HOSTNAME: &str = "theme-project.test";
pub const DEFAULT_TITLE: &str = "Theme Project";
pub const DEFAULT_AUTHOR: &str = "Theme Project Authors";

/// Settings document as read from a TOML file.
///
/// ```toml
/// slug = "acme"
/// hostname = "acme.test"
/// title = "Acme"
/// author = "Acme Studio - https://acme.example/"
///
/// [paths]
/// src = "dev/src"
/// build = "dev/build"
/// themes = "www/wordpress/wp-content/themes"
///
/// [build]
/// fingerprint = "mtime"
/// record_storage = "memory"
/// debounce_ms = 200
///
/// [vendor]
/// files = ["vendor/jquery/dist/jquery.js"]
///
/// [reload]
/// listen = "127.0.0.1:35729"
///
/// [hooks]
/// activate = "vagrant ssh -c \"wp theme activate {slug}\""
/// ```
///
/// Every key is optional. Unknown keys are ignored, and empty strings for the
/// project keys count as unset.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawSettings {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub build: BuildSection,

    #[serde(default)]
    pub vendor: VendorSection,

    #[serde(default)]
    pub tools: ToolsSection,

    #[serde(default)]
    pub reload: ReloadSection,

    #[serde(default)]
    pub hooks: HooksSection,
}

/// `[paths]` section. Relative paths resolve against the directory holding
/// the settings file.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_src")]
    pub src: PathBuf,

    /// Staging output root.
    #[serde(default = "default_build")]
    pub build: PathBuf,

    /// Directory holding installed themes; the live root is `<themes>/<slug>`.
    #[serde(default = "default_themes")]
    pub themes: PathBuf,
}

fn default_src() -> PathBuf {
    PathBuf::from("dev/src")
}

fn default_build() -> PathBuf {
    PathBuf::from("dev/build")
}

fn default_themes() -> PathBuf {
    PathBuf::from("www/wordpress/wp-content/themes")
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            src: default_src(),
            build: default_build(),
            themes: default_themes(),
        }
    }
}

/// `[build]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSection {
    #[serde(default)]
    pub fingerprint: FingerprintMode,

    #[serde(default)]
    pub record_storage: RecordStorageMode,

    /// Repeated watch events for the same task inside this window collapse
    /// into one run.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    200
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            fingerprint: FingerprintMode::default(),
            record_storage: RecordStorageMode::default(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// `[vendor]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct VendorSection {
    /// Ordered list of vendor library files, relative to the source root.
    ///
    /// If empty, every `.js`/`.css` file under `vendor/` is used in
    /// discovery order.
    #[serde(default)]
    pub files: Vec<String>,
}

/// `[tools]` section: optional external commands replacing the built-in
/// transforms. Content is piped through stdin/stdout of `sh -c <cmd>`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ToolsSection {
    #[serde(default)]
    pub style_lint: Option<String>,
    #[serde(default)]
    pub script_lint: Option<String>,
    #[serde(default)]
    pub style_transform: Option<String>,
    #[serde(default)]
    pub style_minify: Option<String>,
    #[serde(default)]
    pub script_minify: Option<String>,
    #[serde(default)]
    pub image_optimize: Option<String>,
}

/// `[reload]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ReloadSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Address for the TCP reload notifier; no listener when unset.
    #[serde(default)]
    pub listen: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for ReloadSection {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: None,
        }
    }
}

/// `[hooks]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct HooksSection {
    /// Command run by `install` after a successful build. `{slug}` is
    /// replaced with the project slug.
    #[serde(default)]
    pub activate: Option<String>,
}

/// Project identity used by the theme header and the activation hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    pub slug: String,
    pub hostname: String,
    pub title: String,
    pub author: String,
}

#[derive(Debug, Clone)]
pub struct ReloadSettings {
    pub enabled: bool,
    pub listen: Option<SocketAddr>,
}

/// Validated, immutable settings. Built once at startup and shared by
/// reference (usually behind an `Arc`) with every component.
#[derive(Debug, Clone)]
pub struct Settings {
    pub project: ProjectInfo,
    /// Directory the settings file lives in.
    pub root: PathBuf,
    pub src_root: PathBuf,
    pub build_root: PathBuf,
    /// `<themes>/<slug>`: the tree the running site reads from.
    pub live_root: PathBuf,
    pub fingerprint: FingerprintMode,
    pub record_storage: RecordStorageMode,
    pub debounce: Duration,
    pub vendor_files: Vec<String>,
    pub tools: ToolsSection,
    pub reload: ReloadSettings,
    pub activate_hook: Option<String>,
}

impl Settings {
    /// Both destination roots, staging first.
    pub fn destination_roots(&self) -> Vec<PathBuf> {
        vec![self.build_root.clone(), self.live_root.clone()]
    }

    /// Activation hook with `{slug}` substituted.
    pub fn activate_command(&self) -> Option<String> {
        self.activate_hook
            .as_ref()
            .map(|cmd| cmd.replace("{slug}", &self.project.slug))
    }

    pub(crate) fn new_unchecked(
        project: ProjectInfo,
        root: PathBuf,
        raw: RawSettings,
    ) -> Self {
        let resolve = |p: &PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                root.join(p)
            }
        };
        let live_root = resolve(&raw.paths.themes).join(&project.slug);

        Self {
            src_root: resolve(&raw.paths.src),
            build_root: resolve(&raw.paths.build),
            live_root,
            fingerprint: raw.build.fingerprint,
            record_storage: raw.build.record_storage,
            debounce: Duration::from_millis(raw.build.debounce_ms),
            vendor_files: raw.vendor.files,
            tools: raw.tools,
            reload: ReloadSettings {
                enabled: raw.reload.enabled,
                listen: None,
            },
            activate_hook: raw.hooks.activate,
            project,
            root,
        }
    }
}
