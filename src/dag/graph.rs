// src/dag/graph.rs

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::action::{AsyncAction, BlockingAction, TaskAction};
use crate::errors::{BuildError, Result};

/// Canonical task name type.
pub type TaskName = String;

/// Definition of one named task.
#[derive(Clone)]
pub enum TaskDef {
    /// Leaf work.
    Action(Arc<dyn TaskAction>),
    /// Children run in order; the first failure stops the sequence.
    Sequence(Vec<TaskName>),
    /// Children run concurrently; every child is awaited and all failures
    /// are reported together.
    Parallel(Vec<TaskName>),
}

impl TaskDef {
    /// Names this definition refers to.
    pub fn children(&self) -> &[TaskName] {
        match self {
            TaskDef::Action(_) => &[],
            TaskDef::Sequence(children) | TaskDef::Parallel(children) => children,
        }
    }
}

impl fmt::Debug for TaskDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskDef::Action(_) => f.write_str("Action"),
            TaskDef::Sequence(children) => f.debug_tuple("Sequence").field(children).finish(),
            TaskDef::Parallel(children) => f.debug_tuple("Parallel").field(children).finish(),
        }
    }
}

/// Static, validated task graph. Evaluate it with [`TaskGraph::run`].
#[derive(Debug)]
pub struct TaskGraph {
    pub(crate) tasks: HashMap<TaskName, TaskDef>,
}

impl TaskGraph {
    pub fn builder() -> TaskGraphBuilder {
        TaskGraphBuilder::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&TaskDef> {
        self.tasks.get(name)
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(|s| s.as_str())
    }
}

/// Collects task definitions and checks them in [`TaskGraphBuilder::build`].
#[derive(Debug, Default)]
pub struct TaskGraphBuilder {
    tasks: BTreeMap<TaskName, TaskDef>,
    duplicates: Vec<TaskName>,
}

impl TaskGraphBuilder {
    pub fn define(mut self, name: impl Into<TaskName>, def: TaskDef) -> Self {
        let name = name.into();
        if self.tasks.insert(name.clone(), def).is_some() {
            self.duplicates.push(name);
        }
        self
    }

    pub fn action(self, name: impl Into<TaskName>, action: Arc<dyn TaskAction>) -> Self {
        self.define(name, TaskDef::Action(action))
    }

    /// Leaf running a synchronous closure on the blocking pool.
    pub fn blocking<F>(self, name: impl Into<TaskName>, f: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.action(name, Arc::new(BlockingAction::new(f)))
    }

    /// Leaf running an async closure.
    pub fn task<F, Fut>(self, name: impl Into<TaskName>, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        self.action(name, Arc::new(AsyncAction::new(f)))
    }

    pub fn sequence<I, S>(self, name: impl Into<TaskName>, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        let children = children.into_iter().map(Into::into).collect();
        self.define(name, TaskDef::Sequence(children))
    }

    pub fn parallel<I, S>(self, name: impl Into<TaskName>, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        let children = children.into_iter().map(Into::into).collect();
        self.define(name, TaskDef::Parallel(children))
    }

    /// Validate and freeze the graph.
    ///
    /// Fails on duplicate names, references to unknown tasks and cycles.
    pub fn build(self) -> Result<Arc<TaskGraph>> {
        if let Some(name) = self.duplicates.first() {
            return Err(BuildError::ConfigError(format!(
                "task '{name}' is defined more than once"
            )));
        }

        for (name, def) in self.tasks.iter() {
            for child in def.children() {
                if !self.tasks.contains_key(child) {
                    return Err(BuildError::ConfigError(format!(
                        "task '{name}' refers to unknown task '{child}'"
                    )));
                }
            }
        }

        validate_acyclic(&self.tasks)?;

        Ok(Arc::new(TaskGraph {
            tasks: self.tasks.into_iter().collect(),
        }))
    }
}

fn validate_acyclic(tasks: &BTreeMap<TaskName, TaskDef>) -> Result<()> {
    // Edge direction: composite -> child.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in tasks.keys() {
        graph.add_node(name.as_str());
    }

    for (name, def) in tasks.iter() {
        for child in def.children() {
            graph.add_edge(name.as_str(), child.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(BuildError::GraphCycle(format!(
            "cycle detected in task graph involving task '{}'",
            cycle.node_id()
        ))),
    }
}
