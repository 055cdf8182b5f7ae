//! Pool worker implementation
//!
//! A worker repeatedly pulls a task from the shared queue, runs its handler
//! under a panic guard and publishes exactly one result per task. It leaves
//! the loop when the queue is closed and drained, or when an urgent shutdown
//! is observed between tasks.

use futures::FutureExt;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use spindle_core::{Task, TaskFailure, TaskResult, WorkerState};
use spindle_resilience::ShutdownListener;

use crate::counters::EngineCounters;
use crate::queue::TaskQueue;
use crate::sink::ResultProducer;

/// Identifier of a worker within its pool
pub type WorkerId = usize;

/// Live workers and what each is doing
///
/// A worker is listed from spawn until it exits.
#[derive(Debug, Default)]
pub struct WorkerTable {
    workers: RwLock<BTreeMap<WorkerId, WorkerState>>,
}

impl WorkerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(&self, id: WorkerId, state: WorkerState) {
        self.workers.write().insert(id, state);
    }

    pub(crate) fn remove(&self, id: WorkerId) {
        self.workers.write().remove(&id);
    }

    /// Snapshot of every live worker's state, ordered by worker id
    pub fn snapshot(&self) -> Vec<(WorkerId, WorkerState)> {
        self.workers
            .read()
            .iter()
            .map(|(id, state)| (*id, *state))
            .collect()
    }

    pub fn live(&self) -> usize {
        self.workers.read().len()
    }

    /// Workers currently processing a task
    pub fn busy(&self) -> usize {
        self.workers
            .read()
            .values()
            .filter(|state| state.is_busy())
            .count()
    }
}

/// Run `future`, converting a panic into [`TaskFailure::ExecutionPanic`]
pub async fn run_guarded<O, F>(future: F) -> Result<O, TaskFailure>
where
    F: Future<Output = Result<O, TaskFailure>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => Err(TaskFailure::ExecutionPanic(panic_message(panic.as_ref()))),
    }
}

/// Best-effort text of a panic payload
pub fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Execute one task to a result; never panics
pub async fn execute_task<P, O>(task: Task<P, O>) -> TaskResult<O> {
    let (task_id, payload, handler) = task.into_parts();
    let outcome = run_guarded(handler.handle(payload)).await;
    TaskResult {
        task_id,
        outcome,
    }
}

/// A single pool worker
pub(crate) struct Worker<P, O> {
    id: WorkerId,
    queue: Arc<TaskQueue<Task<P, O>>>,
    results: ResultProducer<TaskResult<O>>,
    shutdown: ShutdownListener,
    table: Arc<WorkerTable>,
    counters: Arc<EngineCounters>,
}

impl<P, O> Worker<P, O>
where
    P: Send + 'static,
    O: Send + 'static,
{
    pub(crate) fn new(
        id: WorkerId,
        queue: Arc<TaskQueue<Task<P, O>>>,
        results: ResultProducer<TaskResult<O>>,
        shutdown: ShutdownListener,
        table: Arc<WorkerTable>,
        counters: Arc<EngineCounters>,
    ) -> Self {
        table.set(id, WorkerState::Idle);
        Self {
            id,
            queue,
            results,
            shutdown,
            table,
            counters,
        }
    }

    /// Worker loop; returns once the worker has left the pool
    pub(crate) async fn run(mut self) {
        debug!(worker_id = self.id, "Worker started");

        loop {
            if self.shutdown.is_urgent() {
                break;
            }

            let next = tokio::select! {
                biased;
                _ = self.shutdown.urgent() => None,
                task = self.queue.pop() => task,
            };

            let Some(task) = next else {
                break;
            };

            self.process(task).await;
        }

        self.table.set(self.id, WorkerState::Stopping);
        if self.shutdown.is_urgent() {
            debug!(worker_id = self.id, "Worker stopping on urgent shutdown");
        } else if self.shutdown.is_shutting_down() {
            debug!(worker_id = self.id, "Worker stopping; queue drained");
        } else {
            debug!(worker_id = self.id, "Worker stopping; queue closed without shutdown signal");
        }

        self.table.remove(self.id);
        // Dropping `self` completes this worker's result producer
    }

    async fn process(&mut self, task: Task<P, O>) {
        let task_id = task.id();
        trace!(worker_id = self.id, %task_id, queued_for = ?task.age(), "Task picked up");

        self.table.set(self.id, WorkerState::Processing(task_id));

        let result = execute_task(task).await;

        match &result.outcome {
            Ok(_) => {
                self.counters.task_succeeded();
                debug!(worker_id = self.id, %task_id, "Task completed");
            }
            Err(failure) => {
                self.counters.task_failed();
                if failure.is_panic() {
                    warn!(worker_id = self.id, %task_id, error = %failure, "Task panicked");
                } else {
                    debug!(worker_id = self.id, %task_id, error = %failure, "Task failed");
                }
            }
        }

        if self.results.send(result).is_err() {
            trace!(worker_id = self.id, %task_id, "Result dropped; stream receiver is gone");
        }

        self.table.set(self.id, WorkerState::Idle);
    }
}
