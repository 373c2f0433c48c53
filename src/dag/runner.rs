// src/dag/runner.rs

//! Interpreter for [`TaskGraph`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::dag::graph::{TaskDef, TaskGraph, TaskName};
use crate::errors::BuildError;

/// One failed leaf task and the error it reported.
#[derive(Debug, Error)]
#[error("{task}: {error}")]
pub struct TaskFailure {
    pub task: TaskName,
    pub error: BuildError,
}

/// Every failure collected while running a task.
#[derive(Debug, Default)]
pub struct FailureList(Vec<TaskFailure>);

impl FailureList {
    pub fn single(task: impl Into<TaskName>, error: BuildError) -> Self {
        Self(vec![TaskFailure {
            task: task.into(),
            error,
        }])
    }

    pub fn push(&mut self, failure: TaskFailure) {
        self.0.push(failure);
    }

    pub fn extend(&mut self, other: FailureList) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskFailure> {
        self.0.iter()
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.0.iter().map(|f| f.task.as_str()).collect()
    }
}

impl fmt::Display for FailureList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} task(s) failed", self.0.len())?;
        for failure in &self.0 {
            write!(f, "\n  - {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for FailureList {}

pub type TaskResult = Result<(), FailureList>;

type TaskFuture = Pin<Box<dyn Future<Output = TaskResult> + Send + 'static>>;

impl TaskGraph {
    /// Run the named task and everything it is composed of.
    ///
    /// - Actions report their own error.
    /// - Sequences stop at the first failing child and return its failures.
    /// - Parallel groups await every child (siblings are never cancelled)
    ///   and return the union of their failures.
    ///
    /// The returned future owns a handle to the graph, so it can be spawned.
    pub fn run(self: &Arc<Self>, name: &str) -> TaskFuture {
        let graph = Arc::clone(self);
        let name = name.to_string();
        Box::pin(async move { graph.run_inner(name).await })
    }

    async fn run_inner(self: Arc<Self>, name: TaskName) -> TaskResult {
        let Some(def) = self.tasks.get(&name) else {
            return Err(FailureList::single(
                name.clone(),
                BuildError::TaskNotFound(name),
            ));
        };

        let started = Instant::now();
        debug!(task = %name, kind = ?def, "starting task");

        let result = match def {
            TaskDef::Action(action) => action
                .run()
                .await
                .map_err(|e| FailureList::single(name.clone(), e)),
            TaskDef::Sequence(children) => self.run_sequence(children).await,
            TaskDef::Parallel(children) => self.run_parallel(&name, children).await,
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => info!(task = %name, elapsed_ms, "finished task"),
            Err(failures) if matches!(def, TaskDef::Action(_)) => {
                error!(task = %name, elapsed_ms, "{failures}")
            }
            Err(failures) => {
                debug!(task = %name, elapsed_ms, failed = failures.len(), "task group failed")
            }
        }

        result
    }

    async fn run_sequence(self: &Arc<Self>, children: &[TaskName]) -> TaskResult {
        for child in children {
            self.run(child).await?;
        }
        Ok(())
    }

    async fn run_parallel(self: &Arc<Self>, name: &str, children: &[TaskName]) -> TaskResult {
        let mut set = JoinSet::new();
        for child in children {
            set.spawn(self.run(child));
        }

        let mut failures = FailureList::default();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(list)) => failures.extend(list),
                Err(join_err) => failures.push(TaskFailure {
                    task: name.to_string(),
                    error: BuildError::Other(anyhow!("child task panicked: {join_err}")),
                }),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }
}
