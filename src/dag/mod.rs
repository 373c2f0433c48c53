// src/dag/mod.rs

//! Task graph: named tasks composed into sequences and parallel groups.
//!
//! - [`graph`] holds the static, validated graph and its builder.
//! - [`action`] defines the leaf work items.
//! - [`runner`] evaluates a task and aggregates failures.

pub mod action;
pub mod graph;
pub mod runner;

pub use action::{ActionFuture, AsyncAction, BlockingAction, TaskAction};
pub use graph::{TaskDef, TaskGraph, TaskGraphBuilder, TaskName};
pub use runner::{FailureList, TaskFailure, TaskResult};
