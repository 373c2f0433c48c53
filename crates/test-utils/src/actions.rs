use std::sync::{Arc, Mutex};
use std::time::Duration;

use themeforge::dag::TaskGraphBuilder;
use themeforge::errors::BuildError;

/// Shared log of task events, for asserting execution order.
///
/// Actions registered through a recorder push `"<name>:start"` and
/// `"<name>:end"` (or just `"<name>"` for instant actions).
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Position of `event` in the log.
    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    pub fn contains(&self, event: &str) -> bool {
        self.position(event).is_some()
    }

    /// Instant action that records its name and succeeds.
    pub fn ok(&self, builder: TaskGraphBuilder, name: &str) -> TaskGraphBuilder {
        let rec = self.clone();
        let label = name.to_string();
        builder.task(name, move || {
            let rec = rec.clone();
            let label = label.clone();
            async move {
                rec.push(label);
                Ok(())
            }
        })
    }

    /// Action that records start/end around a sleep of `ms` milliseconds.
    pub fn slow(&self, builder: TaskGraphBuilder, name: &str, ms: u64) -> TaskGraphBuilder {
        let rec = self.clone();
        let label = name.to_string();
        builder.task(name, move || {
            let rec = rec.clone();
            let label = label.clone();
            async move {
                rec.push(format!("{label}:start"));
                tokio::time::sleep(Duration::from_millis(ms)).await;
                rec.push(format!("{label}:end"));
                Ok(())
            }
        })
    }

    /// Action that records its name and fails with a transform error.
    pub fn failing(&self, builder: TaskGraphBuilder, name: &str) -> TaskGraphBuilder {
        let rec = self.clone();
        let label = name.to_string();
        builder.task(name, move || {
            let rec = rec.clone();
            let label = label.clone();
            async move {
                rec.push(label.clone());
                Err::<(), _>(failure(&label))
            }
        })
    }
}

pub fn failure(task: &str) -> BuildError {
    BuildError::Transform {
        stage: "test".to_string(),
        path: task.to_string(),
        message: "forced failure".to_string(),
    }
}
