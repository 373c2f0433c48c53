// src/config/mod.rs

//! Settings loading and validation.
//!
//! - [`model`] defines the TOML-backed document and the resolved [`Settings`].
//! - [`loader`] reads a settings file from disk.
//! - [`validate`] applies defaults and checks invariants.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, DEFAULT_SETTINGS_FILE};
pub use model::{ProjectInfo, RawSettings, Settings, ToolsSection};
