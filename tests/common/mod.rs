#![allow(dead_code)]

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use themeforge::config::{RawSettings, Settings};
use themeforge::fs::mock::MockFileSystem;
use themeforge::fs::FileSystem;

pub use themeforge_test_utils::{init_tracing, with_timeout};

pub type TestResult = Result<(), Box<dyn Error>>;

pub const MOCK_ROOT: &str = "/project";

/// Settings for a project rooted at `/project`, for use with the mock
/// filesystem.
pub fn mock_settings() -> Settings {
    let mut raw = RawSettings::default();
    raw.slug = Some("mock".to_string());
    Settings::resolve(raw, MOCK_ROOT).expect("mock settings are valid")
}

pub fn mock_fs() -> (MockFileSystem, Arc<dyn FileSystem>) {
    let mock = MockFileSystem::new();
    let fs: Arc<dyn FileSystem> = Arc::new(mock.clone());
    (mock, fs)
}

pub fn p(path: &str) -> PathBuf {
    Path::new(path).to_path_buf()
}
