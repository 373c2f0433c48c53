#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use themeforge::config::{RawSettings, Settings};
use themeforge::types::{FingerprintMode, RecordStorageMode};

pub const FIXTURE_SLUG: &str = "fixture-theme";

/// Builder for `Settings` to simplify test setup.
pub struct SettingsBuilder {
    raw: RawSettings,
    root: PathBuf,
}

impl SettingsBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let mut raw = RawSettings::default();
        raw.slug = Some(FIXTURE_SLUG.to_string());
        raw.build.debounce_ms = 50;
        Self {
            raw,
            root: root.into(),
        }
    }

    pub fn slug(mut self, slug: &str) -> Self {
        self.raw.slug = Some(slug.to_string());
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.raw.title = Some(title.to_string());
        self
    }

    pub fn hostname(mut self, hostname: &str) -> Self {
        self.raw.hostname = Some(hostname.to_string());
        self
    }

    pub fn author(mut self, author: &str) -> Self {
        self.raw.author = Some(author.to_string());
        self
    }

    pub fn fingerprint(mut self, mode: FingerprintMode) -> Self {
        self.raw.build.fingerprint = mode;
        self
    }

    pub fn record_storage(mut self, mode: RecordStorageMode) -> Self {
        self.raw.build.record_storage = mode;
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.raw.build.debounce_ms = ms;
        self
    }

    pub fn vendor_file(mut self, rel: &str) -> Self {
        self.raw.vendor.files.push(rel.to_string());
        self
    }

    pub fn style_transform(mut self, cmd: &str) -> Self {
        self.raw.tools.style_transform = Some(cmd.to_string());
        self
    }

    pub fn style_minify(mut self, cmd: &str) -> Self {
        self.raw.tools.style_minify = Some(cmd.to_string());
        self
    }

    pub fn activate(mut self, cmd: &str) -> Self {
        self.raw.hooks.activate = Some(cmd.to_string());
        self
    }

    pub fn reload_enabled(mut self, enabled: bool) -> Self {
        self.raw.reload.enabled = enabled;
        self
    }

    pub fn build(self) -> Settings {
        Settings::resolve(self.raw, self.root).expect("Failed to build valid settings from builder")
    }
}

/// A throwaway project directory laid out with the default paths.
pub struct ProjectFixture {
    dir: TempDir,
}

impl ProjectFixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp project dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn settings_builder(&self) -> SettingsBuilder {
        SettingsBuilder::new(self.root())
    }

    pub fn settings(&self) -> Settings {
        self.settings_builder().build()
    }

    pub fn src(&self, rel: &str) -> PathBuf {
        self.root().join("dev/src").join(rel)
    }

    pub fn build(&self, rel: &str) -> PathBuf {
        self.root().join("dev/build").join(rel)
    }

    pub fn live(&self, rel: &str) -> PathBuf {
        self.root()
            .join("www/wordpress/wp-content/themes")
            .join(FIXTURE_SLUG)
            .join(rel)
    }

    pub fn write_src(&self, rel: &str, content: impl AsRef<[u8]>) -> PathBuf {
        write(self.src(rel), content)
    }

    pub fn write_live(&self, rel: &str, content: impl AsRef<[u8]>) -> PathBuf {
        write(self.live(rel), content)
    }

    /// Contents of `rel` in the build tree, asserting the live tree holds
    /// the same bytes.
    pub fn read_output(&self, rel: &str) -> Vec<u8> {
        let build = fs::read(self.build(rel))
            .unwrap_or_else(|e| panic!("reading build/{rel}: {e}"));
        let live = fs::read(self.live(rel)).unwrap_or_else(|e| panic!("reading live/{rel}: {e}"));
        assert_eq!(build, live, "build and live copies of {rel} differ");
        build
    }

    pub fn read_output_string(&self, rel: &str) -> String {
        String::from_utf8(self.read_output(rel)).expect("output is UTF-8")
    }

    pub fn output_exists(&self, rel: &str) -> bool {
        self.build(rel).exists() && self.live(rel).exists()
    }

    /// A small but complete theme source tree.
    pub fn with_sample_sources(self) -> Self {
        self.write_src("assets/css/base.css", "$brand: #336699;\nbody {\n  color: $brand;\n}\n");
        self.write_src("assets/css/defaults.css", "html { margin: 0 !important; }\n");
        self.write_src("assets/js/app.js", "// app\nfunction boot() {\n  return 1;\n}\n");
        self.write_src("assets/js/widgets/menu.js", "var open = false;\n");
        self.write_src("assets/img/logo.svg", "<svg></svg>");
        self.write_src("assets/fonts/sans.woff", [0u8, 1, 2, 3]);
        self.write_src("includes/a.php", "<?php // a\n");
        self.write_src("includes/c.php", "<?php // c\n");
        self.write_src("includes/vendor/b.php", "<?php // b\n");
        self.write_src("includes/.env", "KEY=value\n");
        self.write_src("templates/controllers/pages/page.php", "<?php // page\n");
        self.write_src("templates/layouts/base.twig", "<html>{% block body %}{% endblock %}</html>");
        self.write_src("vendor/lib/dep.js", "window.dep = true;\n");
        self.write_src("vendor/lib/dep.css", ".dep { display: none; }\n");
        self
    }
}

impl Default for ProjectFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn write(path: PathBuf, content: impl AsRef<[u8]>) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(&path, content).expect("write fixture file");
    path
}
