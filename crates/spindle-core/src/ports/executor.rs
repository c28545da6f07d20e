//! Executor port - a bounded worker pool.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use thiserror::Error;

/// A unit of work handed to the pool.
pub type BoxTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExecutorError {
    /// Every worker is busy. The caller still owns the work it tried to submit.
    #[error("worker pool is at capacity")]
    Rejected,

    #[error("worker pool is shut down")]
    Closed,
}

/// A worker pool with a fixed number of slots.
///
/// `has_capacity` and `submit` are not atomic with respect to each other:
/// a submit right after a positive capacity check may still be rejected, and
/// callers must handle [`ExecutorError::Rejected`] as a normal outcome.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Best-effort, point-in-time capacity estimate.
    fn has_capacity(&self) -> bool;

    /// Start `task` asynchronously, or reject it without running it.
    fn submit(&self, task: BoxTask) -> Result<(), ExecutorError>;

    /// Stop accepting work and wait for in-flight tasks to finish.
    async fn drain(&self) {}
}
