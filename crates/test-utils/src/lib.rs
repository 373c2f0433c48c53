//! Shared fixtures for the themeforge integration tests: settings builders,
//! on-disk sample projects and recording task actions.

pub mod actions;
pub mod builders;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

pub use actions::Recorder;
pub use builders::{ProjectFixture, SettingsBuilder};

/// Upper bound for any single awaited step in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

static INIT: Once = Once::new();

/// Route `tracing` output through the test harness, so it only shows up for
/// failing tests (or with `--nocapture`).
///
/// The filter comes from `THEMEFORGE_LOG` (any `EnvFilter` directive, e.g.
/// `themeforge=debug`) and defaults to `info`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(themeforge::logging::LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Await `f`, failing the test if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("step did not finish within {TEST_TIMEOUT:?}"),
    }
}
