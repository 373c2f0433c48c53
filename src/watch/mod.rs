// src/watch/mod.rs

//! File watching.
//!
//! Turns filesystem changes into runs of the narrowest task that rebuilds
//! the affected outputs. It knows nothing about what the tasks do; the
//! mapping from globs to task names comes in as [`WatchSpec`]s.

pub mod debounce;
pub mod patterns;
pub mod watcher;

pub use debounce::Debouncer;
pub use patterns::{build_watch_profiles, tasks_for_path, WatchProfile, WatchSpec};
pub use watcher::{spawn_watcher, WatcherHandle};
