// src/watch/debounce.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Trailing-edge debounce per task.
///
/// Every change schedules a ticket; once the window elapsed, a run goes
/// ahead only if its ticket is still the newest for that task. A burst of
/// saves therefore yields one run, started after the burst.
#[derive(Debug, Clone, Default)]
pub struct Debouncer {
    latest: Arc<Mutex<HashMap<String, u64>>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        self.latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn schedule(&self, task: &str) -> u64 {
        let mut latest = self.lock();
        let ticket = latest.get(task).map_or(1, |t| t + 1);
        latest.insert(task.to_string(), ticket);
        ticket
    }

    pub fn is_latest(&self, task: &str, ticket: u64) -> bool {
        self.lock().get(task) == Some(&ticket)
    }
}
