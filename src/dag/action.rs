// src/dag/action.rs

//! Leaf actions of the task graph.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::anyhow;

use crate::errors::{BuildError, Result};

/// Boxed future returned by [`TaskAction::run`].
pub type ActionFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// A unit of work at the leaves of the task graph.
///
/// Production actions are asset pipelines and cross-cutting steps (clean,
/// pull external state, ...); tests plug in recording or failing actions.
pub trait TaskAction: Send + Sync {
    fn run(&self) -> ActionFuture<'_>;
}

/// Runs a synchronous closure on Tokio's blocking pool.
///
/// Pipelines do plain blocking file I/O; running them here keeps the
/// runtime's worker threads free while parallel groups fan out.
pub struct BlockingAction<F> {
    f: Arc<F>,
}

impl<F> BlockingAction<F>
where
    F: Fn() -> Result<()> + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

impl<F> TaskAction for BlockingAction<F>
where
    F: Fn() -> Result<()> + Send + Sync + 'static,
{
    fn run(&self) -> ActionFuture<'_> {
        let f = Arc::clone(&self.f);
        Box::pin(async move {
            tokio::task::spawn_blocking(move || f())
                .await
                .map_err(|e| BuildError::Other(anyhow!("blocking action did not complete: {e}")))?
        })
    }
}

/// Runs an async closure in place.
pub struct AsyncAction<F> {
    f: F,
}

impl<F, Fut> AsyncAction<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut> TaskAction for AsyncAction<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn run(&self) -> ActionFuture<'_> {
        Box::pin((self.f)())
    }
}
