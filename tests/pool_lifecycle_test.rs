//! End-to-end worker pool lifecycle tests

use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};

use spindle_config::{EngineConfig, PoolConfig, PushPolicy, QueueConfig};
use spindle_core::{EngineError, PoolState, TaskFailure, TaskHandler, WorkerState};
use spindle_runtime::Supervisor;

const TIMEOUT: Duration = Duration::from_secs(10);

fn engine_config(workers: usize, capacity: usize) -> EngineConfig {
    EngineConfig {
        pool: PoolConfig::with_workers(workers),
        queue: QueueConfig {
            capacity,
            push_policy: PushPolicy::Reject,
        },
        ..Default::default()
    }
}

/// Handler that reports each payload on `started`, then waits for one permit
fn gated(gate: Arc<Semaphore>, started: mpsc::UnboundedSender<u64>) -> impl TaskHandler<u64, u64> {
    move |n: u64| {
        let gate = gate.clone();
        let started = started.clone();
        async move {
            let _ = started.send(n);
            match gate.acquire().await {
                Ok(permit) => permit.forget(),
                Err(_) => return Err(TaskFailure::handler("gate closed")),
            }
            Ok(n)
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_submitted_task_yields_one_result() -> Result<()> {
    spindle_logging::init_simple_tracing("warn")?;

    for workers in [1, 2, 8] {
        let supervisor = Supervisor::<u64, u64>::new(engine_config(workers, 256))?;
        let results = supervisor.results().expect("results stream");
        supervisor.start(|n: u64| async move {
            tokio::task::yield_now().await;
            Ok::<_, TaskFailure>(n + 1)
        })?;

        let mut submitted = HashSet::new();
        for n in 0..200 {
            submitted.insert(supervisor.submit(n).await?);
        }
        supervisor.shutdown(TIMEOUT).await?;

        let results = results.collect_all().await;
        assert_eq!(results.len(), 200, "workers = {}", workers);

        let seen: HashSet<_> = results.iter().map(|r| r.task_id).collect();
        assert_eq!(seen, submitted);
        assert!(results.iter().all(|r| r.is_success()));

        let stats = supervisor.stats();
        assert_eq!(stats.completed, 200);
        assert_eq!(stats.finished(), 200);
        assert_eq!(stats.queued, 0);
        assert_eq!(stats.active, 0);
    }

    Ok(())
}

#[tokio::test]
async fn test_panicking_handler_does_not_kill_worker() -> Result<()> {
    let supervisor = Supervisor::<u64, u64>::new(engine_config(1, 8))?;
    let mut results = supervisor.results().expect("results stream");
    supervisor.start(|n: u64| async move {
        if n == 1 {
            panic!("payload {} is cursed", n);
        }
        Ok::<_, TaskFailure>(n)
    })?;

    let cursed = supervisor.submit(1).await?;
    let fine = supervisor.submit(2).await?;

    let first = results.recv().await.expect("first result");
    assert_eq!(first.task_id, cursed);
    assert_eq!(
        first.error(),
        Some(&TaskFailure::ExecutionPanic("payload 1 is cursed".to_string()))
    );

    let second = results.recv().await.expect("second result");
    assert_eq!(second.task_id, fine);
    assert_eq!(second.output(), Some(&2));

    assert_eq!(supervisor.live_workers(), 1);
    assert_eq!(supervisor.stats().failed, 1);

    supervisor.shutdown(TIMEOUT).await?;
    Ok(())
}

#[tokio::test]
async fn test_handler_errors_are_reported_as_results() -> Result<()> {
    let supervisor = Supervisor::<i64, i64>::new(engine_config(2, 8))?;
    let results = supervisor.results().expect("results stream");
    supervisor.start(|n: i64| async move {
        if n < 0 {
            Err(TaskFailure::handler(format!("negative input: {}", n)))
        } else {
            Ok(n)
        }
    })?;

    supervisor.submit(-3).await?;
    supervisor.submit(3).await?;
    supervisor.shutdown(TIMEOUT).await?;

    let results = results.collect_all().await;
    let failures: Vec<_> = results.iter().filter_map(|r| r.error()).collect();
    assert_eq!(failures, vec![&TaskFailure::Handler("negative input: -3".to_string())]);

    let stats = supervisor.stats();
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 1);
    assert!((stats.failure_rate() - 0.5).abs() < f64::EPSILON);
    Ok(())
}

#[tokio::test]
async fn test_shutdown_is_idempotent() -> Result<()> {
    let supervisor = Supervisor::<u64, u64>::new(engine_config(2, 8))?;
    supervisor.start(|n: u64| async move { Ok::<_, TaskFailure>(n) })?;
    assert_eq!(supervisor.live_workers(), 2);

    supervisor.shutdown(TIMEOUT).await?;
    supervisor.shutdown(TIMEOUT).await?;
    supervisor.shutdown_now(TIMEOUT).await?;

    assert_eq!(supervisor.state(), PoolState::Stopped);
    assert_eq!(supervisor.live_workers(), 0);
    assert!(supervisor.worker_states().is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_graceful_shutdown_drains_queue() -> Result<()> {
    let gate = Arc::new(Semaphore::new(0));
    let (started_tx, mut started) = mpsc::unbounded_channel();

    let supervisor = Arc::new(Supervisor::<u64, u64>::new(engine_config(1, 8))?);
    let results = supervisor.results().expect("results stream");
    supervisor.start(gated(gate.clone(), started_tx))?;

    for n in 0..4 {
        supervisor.submit(n).await?;
    }
    assert_eq!(started.recv().await, Some(0));
    assert_eq!(supervisor.worker_states()[0].1, WorkerState::Processing(spindle_core::TaskId(1)));

    let shutdown = {
        let supervisor = supervisor.clone();
        tokio::spawn(async move { supervisor.shutdown(TIMEOUT).await })
    };

    let mut state = supervisor.subscribe_state();
    state.wait_for(|s| *s == PoolState::Draining).await?;
    assert_eq!(
        supervisor.submit(99).await,
        Err(EngineError::PoolNotRunning(PoolState::Draining))
    );

    gate.add_permits(4);
    shutdown.await??;

    let results = results.collect_all().await;
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| r.is_success()));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_urgent_stop_cancels_queued_tasks() -> Result<()> {
    let gate = Arc::new(Semaphore::new(0));
    let (started_tx, mut started) = mpsc::unbounded_channel();

    let supervisor = Supervisor::<u64, u64>::new(engine_config(1, 8))?;
    let results = supervisor.results().expect("results stream");
    supervisor.start(gated(gate.clone(), started_tx))?;

    for n in 0..5 {
        supervisor.submit(n).await?;
    }
    assert_eq!(started.recv().await, Some(0));

    // The running task holds the pool open past the deadline
    let err = supervisor
        .shutdown_now(Duration::from_millis(50))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ShutdownTimeout(Duration::from_millis(50)));
    assert_eq!(supervisor.stats().queued, 0);

    gate.add_permits(1);
    supervisor.shutdown(TIMEOUT).await?;

    let results = results.collect_all().await;
    assert_eq!(results.len(), 5);

    let cancelled = results
        .iter()
        .filter(|r| r.error() == Some(&TaskFailure::Cancelled))
        .count();
    assert_eq!(cancelled, 4);
    assert_eq!(results.iter().filter(|r| r.is_success()).count(), 1);

    let stats = supervisor.stats();
    assert_eq!(stats.cancelled, 4);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.state, PoolState::Stopped);
    Ok(())
}

#[tokio::test]
async fn test_dropping_supervisor_lets_workers_finish() -> Result<()> {
    let supervisor = Supervisor::<u64, u64>::new(engine_config(2, 8))?;
    let results = supervisor.results().expect("results stream");
    supervisor.start(|n: u64| async move { Ok::<_, TaskFailure>(n * 10) })?;

    for n in 0..3 {
        supervisor.submit(n).await?;
    }
    drop(supervisor);

    let mut outputs: Vec<u64> = results
        .collect_all()
        .await
        .into_iter()
        .filter_map(|r| r.into_output())
        .collect();
    outputs.sort_unstable();
    assert_eq!(outputs, vec![0, 10, 20]);
    Ok(())
}
