//! Task domain model and the handler seam

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::TaskFailure;

/// Unique identifier for a task (newtype pattern for type safety)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub u64);

impl TaskId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TaskId {
    fn from(id: u64) -> Self {
        TaskId(id)
    }
}

impl From<TaskId> for u64 {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

/// Work executed by pool workers
///
/// Handlers run outside every internal lock of the engine. A handler may block
/// or panic; the pool converts a panic into [`TaskFailure::ExecutionPanic`].
///
/// Any `Fn(P) -> impl Future<Output = Result<O, TaskFailure>>` closure is a
/// handler:
///
/// ```ignore
/// let double = |n: u64| async move { Ok::<_, TaskFailure>(n * 2) };
/// supervisor.start(double)?;
/// ```
#[async_trait]
pub trait TaskHandler<P, O>: Send + Sync {
    /// Execute the task payload
    async fn handle(&self, payload: P) -> Result<O, TaskFailure>;
}

#[async_trait]
impl<P, O, F, Fut> TaskHandler<P, O> for F
where
    P: Send + 'static,
    O: Send + 'static,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, TaskFailure>> + Send + 'static,
{
    async fn handle(&self, payload: P) -> Result<O, TaskFailure> {
        (self)(payload).await
    }
}

/// Shared, type-erased handler
pub type SharedHandler<P, O> = Arc<dyn TaskHandler<P, O>>;

/// A unit of work: payload plus the handler that executes it
///
/// Immutable once constructed. Ownership moves from the submitter to the
/// queue and then to exactly one worker.
pub struct Task<P, O> {
    id: TaskId,
    payload: P,
    handler: SharedHandler<P, O>,
    created_at: Instant,
}

impl<P, O> Task<P, O> {
    pub fn new(id: TaskId, payload: P, handler: SharedHandler<P, O>) -> Self {
        Self {
            id,
            payload,
            handler,
            created_at: Instant::now(),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Time elapsed since the task was created
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Split the task for execution
    pub fn into_parts(self) -> (TaskId, P, SharedHandler<P, O>) {
        (self.id, self.payload, self.handler)
    }
}

impl<P: fmt::Debug, O> fmt::Debug for Task<P, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("payload", &self.payload)
            .finish_non_exhaustive()
    }
}
