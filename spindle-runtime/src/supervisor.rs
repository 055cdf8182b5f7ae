//! Worker pool lifecycle management
//!
//! The [`Supervisor`] owns the task queue, the workers and the result stream.
//! Submission passes through the rate gate and the queue's push policy;
//! shutdown is cooperative and comes in two strengths:
//!
//! - [`Supervisor::shutdown`] closes the queue and lets every accepted task run.
//! - [`Supervisor::shutdown_now`] additionally resolves every task still queued
//!   as [`TaskFailure::Cancelled`] without running it.
//!
//! In both cases each accepted task yields exactly one [`TaskResult`].

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use spindle_caching::SharedStore;
use spindle_config::EngineConfig;
use spindle_core::{
    EngineError, EngineStats, PoolState, Result, SharedHandler, Task, TaskFailure, TaskHandler,
    TaskId, TaskResult, WorkerState,
};
use spindle_resilience::{RateGate, ShutdownCoordinator, ShutdownSignal};

use crate::counters::EngineCounters;
use crate::error::{PushError, SinkError};
use crate::queue::TaskQueue;
use crate::sink::{ResultProducer, ResultSink, ResultStream};
use crate::worker::{Worker, WorkerId, WorkerTable};

/// Store shared between the supervisor and any handler that captures it
pub type EngineStore = SharedStore<String, Value>;

/// State shared with workers and the reaper task
struct Shared<P, O> {
    queue: Arc<TaskQueue<Task<P, O>>>,
    state: watch::Sender<PoolState>,
    shutdown: ShutdownCoordinator,
    workers: Arc<WorkerTable>,
    counters: Arc<EngineCounters>,
    /// Producer for results the supervisor publishes itself; taken once the
    /// pool has stopped
    own_results: Mutex<Option<ResultProducer<TaskResult<O>>>>,
}

impl<P, O> Shared<P, O> {
    fn state(&self) -> PoolState {
        *self.state.borrow()
    }

    /// Resolve every queued task as cancelled
    ///
    /// Must be called with `own_results` locked so no result can be published
    /// after the producer completes.
    fn cancel_queued(&self, producer: Option<&ResultProducer<TaskResult<O>>>) -> usize {
        let drained = self.queue.drain();
        let count = drained.len();

        for task in drained {
            let result = TaskResult::failure(task.id(), TaskFailure::Cancelled);
            if let Some(producer) = producer {
                let _ = producer.send(result);
            }
        }

        if count > 0 {
            self.counters.tasks_cancelled(count);
            info!(count, "Cancelled queued tasks");
        }
        count
    }

    /// Complete the supervisor's producer and mark the pool stopped
    fn finish(&self) {
        let mut own_results = self.own_results.lock();
        self.cancel_queued(own_results.as_ref());
        if let Some(producer) = own_results.take() {
            producer.complete();
        }
        drop(own_results);

        self.state.send_replace(PoolState::Stopped);
        info!("Worker pool stopped");
    }
}

/// Bounded, cancellable worker pool
///
/// `P` is the task payload type and `O` the handler output type. All methods
/// take `&self`, so a supervisor can be shared behind an `Arc` between
/// submitters. Dropping a supervisor closes its queue; detached workers then
/// drain what is left and exit.
pub struct Supervisor<P, O> {
    config: EngineConfig,
    shared: Arc<Shared<P, O>>,
    gate: RateGate,
    store: Arc<EngineStore>,
    sink: ResultSink<TaskResult<O>>,
    results: Mutex<Option<ResultStream<TaskResult<O>>>>,
    handler: Mutex<Option<SharedHandler<P, O>>>,
    next_id: AtomicU64,
}

impl<P, O> Supervisor<P, O>
where
    P: Send + 'static,
    O: Send + 'static,
{
    /// Build a pool from validated configuration; no workers run yet
    pub fn new(config: EngineConfig) -> Result<Self> {
        config
            .validate_all()
            .map_err(|e| EngineError::Configuration(e.to_string()))?;

        let (sink, stream) = ResultSink::new();
        let own_results = sink
            .register()
            .map_err(|e| EngineError::Configuration(e.to_string()))?;

        let (state, _) = watch::channel(PoolState::NotStarted);
        let shared = Arc::new(Shared {
            queue: Arc::new(TaskQueue::from_config(&config.queue)),
            state,
            shutdown: ShutdownCoordinator::new(),
            workers: Arc::new(WorkerTable::new()),
            counters: Arc::new(EngineCounters::new()),
            own_results: Mutex::new(Some(own_results)),
        });

        let store = Arc::new(SharedStore::with_capacity(
            config.store.default_ttl,
            config.store.capacity_hint,
        ));

        debug!(
            workers = config.pool.worker_count,
            queue_capacity = config.queue.capacity,
            push_policy = %config.queue.push_policy,
            rate_limited = config.rate_gate.enabled,
            "Supervisor created"
        );

        Ok(Self {
            gate: RateGate::from_config(&config.rate_gate),
            config,
            shared,
            store,
            sink,
            results: Mutex::new(Some(stream)),
            handler: Mutex::new(None),
            next_id: AtomicU64::new(1),
        })
    }

    /// Spawn the workers with `handler` as the default task handler
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<H>(&self, handler: H) -> Result<()>
    where
        H: TaskHandler<P, O> + 'static,
    {
        {
            // Submitters read the handler under this lock, so none can see
            // `Running` without a handler installed
            let mut installed = self.handler.lock();
            let started = self.shared.state.send_if_modified(|state| {
                if *state == PoolState::NotStarted {
                    *state = PoolState::Running;
                    true
                } else {
                    false
                }
            });
            if !started {
                return Err(EngineError::AlreadyStarted);
            }
            *installed = Some(Arc::new(handler));
        }

        if let Some(interval) = self.config.store.sweep_interval {
            let _ = self.store.clone().spawn_sweeper(interval);
        }

        let worker_count = self.config.pool.worker_count;
        let mut handles = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            match self.spawn_worker(id) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    error!(worker_id = id, error = %e, "Failed to register worker");
                    break;
                }
            }
        }
        self.sink.seal();

        let shared = self.shared.clone();
        tokio::spawn(async move {
            for handle in handles {
                if let Err(e) = handle.await {
                    error!(error = %e, "Worker task ended abnormally");
                }
            }
            shared.finish();
        });

        info!(workers = worker_count, "Worker pool started");
        Ok(())
    }

    fn spawn_worker(&self, id: WorkerId) -> std::result::Result<JoinHandle<()>, SinkError> {
        let worker = Worker::new(
            id,
            self.shared.queue.clone(),
            self.sink.register()?,
            self.shared.shutdown.subscribe(),
            self.shared.workers.clone(),
            self.shared.counters.clone(),
        );
        Ok(tokio::spawn(worker.run()))
    }

    /// Submit a payload for the default handler
    pub async fn submit(&self, payload: P) -> Result<TaskId> {
        let handler = {
            let installed = self.handler.lock();
            match installed.as_ref() {
                Some(handler) => handler.clone(),
                // Only a pool that never started lacks a handler
                None => {
                    let state = self.state();
                    drop(installed);
                    self.shared.counters.task_rejected();
                    return Err(EngineError::PoolNotRunning(state));
                }
            }
        };
        self.enqueue(payload, handler).await
    }

    /// Submit a payload with its own handler
    pub async fn submit_with<H>(&self, payload: P, handler: H) -> Result<TaskId>
    where
        H: TaskHandler<P, O> + 'static,
    {
        self.enqueue(payload, Arc::new(handler)).await
    }

    async fn enqueue(&self, payload: P, handler: SharedHandler<P, O>) -> Result<TaskId> {
        let state = self.state();
        if !state.accepts_work() {
            self.shared.counters.task_rejected();
            return Err(EngineError::PoolNotRunning(state));
        }

        if !self.gate.admit() {
            self.shared.counters.task_rejected();
            let retry_after = self.gate.time_until_reset();
            debug!(?retry_after, "Submission rate limited");
            return Err(EngineError::RateLimited { retry_after });
        }

        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        match self.shared.queue.push(Task::new(id, payload, handler)).await {
            Ok(()) => {
                self.shared.counters.task_submitted();
                debug!(task_id = %id, "Task submitted");
                Ok(id)
            }
            Err(PushError::Full(_)) => {
                self.shared.counters.task_rejected();
                Err(EngineError::QueueFull {
                    capacity: self.shared.queue.capacity(),
                })
            }
            Err(PushError::Closed(_)) => {
                self.shared.counters.task_rejected();
                Err(EngineError::QueueClosed)
            }
        }
    }

    /// Take the merged result stream; handed out once
    pub fn results(&self) -> Option<ResultStream<TaskResult<O>>> {
        self.results.lock().take()
    }

    /// Graceful shutdown: run every accepted task, then stop
    ///
    /// Idempotent. Returns [`EngineError::ShutdownTimeout`] if the pool has not
    /// stopped within `timeout`; workers keep draining in the background.
    pub async fn shutdown(&self, timeout: Duration) -> Result<()> {
        if self.stop_unstarted() {
            return Ok(());
        }

        let draining = self.shared.state.send_if_modified(|state| {
            if *state == PoolState::Running {
                *state = PoolState::Draining;
                true
            } else {
                false
            }
        });

        if draining {
            info!("Graceful shutdown requested; draining queue");
            self.shared.shutdown.signal(ShutdownSignal::Graceful);
            self.shared.queue.close();
        }

        self.wait_stopped(timeout).await
    }

    /// Urgent shutdown: cancel every queued task, let running ones finish
    ///
    /// Escalates a graceful shutdown that is already draining.
    pub async fn shutdown_now(&self, timeout: Duration) -> Result<()> {
        if self.stop_unstarted() {
            return Ok(());
        }

        {
            // Held across signal, close and drain so the reaper cannot complete
            // the producer in between
            let own_results = self.shared.own_results.lock();

            self.shared.state.send_if_modified(|state| {
                if *state == PoolState::Running {
                    *state = PoolState::Draining;
                    true
                } else {
                    false
                }
            });

            if self.shared.shutdown.signal(ShutdownSignal::Urgent) {
                warn!("Urgent shutdown requested; cancelling queued tasks");
            }
            self.shared.queue.close();
            self.shared.cancel_queued(own_results.as_ref());
        }

        self.wait_stopped(timeout).await
    }

    /// Stop a pool that never started; returns whether it did
    fn stop_unstarted(&self) -> bool {
        let stopped = self.shared.state.send_if_modified(|state| {
            if *state == PoolState::NotStarted {
                *state = PoolState::Stopped;
                true
            } else {
                false
            }
        });

        if stopped {
            self.shared.queue.close();
            self.sink.seal();
            if let Some(producer) = self.shared.own_results.lock().take() {
                producer.complete();
            }
            info!("Worker pool stopped before start");
        }
        stopped
    }

    async fn wait_stopped(&self, timeout: Duration) -> Result<()> {
        let mut state = self.shared.state.subscribe();
        let waited = tokio::time::timeout(timeout, state.wait_for(|s| *s == PoolState::Stopped))
            .await
            .map(|_| ());

        match waited {
            Ok(()) => Ok(()),
            Err(_) => {
                warn!(?timeout, "Shutdown did not complete in time");
                Err(EngineError::ShutdownTimeout(timeout))
            }
        }
    }

    /// Best-effort statistics snapshot
    pub fn stats(&self) -> EngineStats {
        let counters = &self.shared.counters;
        EngineStats {
            queued: self.shared.queue.len(),
            active: self.shared.workers.busy(),
            completed: counters.completed(),
            failed: counters.failed(),
            cancelled: counters.cancelled(),
            rejected: counters.rejected(),
            submitted: counters.submitted(),
            live_workers: self.shared.workers.live(),
            state: self.state(),
            captured_at: chrono::Utc::now(),
        }
    }

    pub fn state(&self) -> PoolState {
        self.shared.state()
    }

    /// Watch lifecycle transitions
    pub fn subscribe_state(&self) -> watch::Receiver<PoolState> {
        self.shared.state.subscribe()
    }

    /// State of every live worker, ordered by worker id
    pub fn worker_states(&self) -> Vec<(WorkerId, WorkerState)> {
        self.shared.workers.snapshot()
    }

    /// Workers that have not exited yet
    pub fn live_workers(&self) -> usize {
        self.shared.workers.live()
    }

    /// The key/value store shared with handlers
    pub fn store(&self) -> Arc<EngineStore> {
        self.store.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl<P, O> Drop for Supervisor<P, O> {
    fn drop(&mut self) {
        if !self.shared.shutdown.is_shutting_down() && self.shared.state() == PoolState::Running {
            debug!("Supervisor dropped without shutdown; workers drain the closed queue");
        }
        self.shared.queue.close();
    }
}
