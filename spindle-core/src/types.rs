//! Lifecycle state types for the pool and its workers

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::task::TaskId;

/// Pool-level lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PoolState {
    /// Constructed, no workers spawned yet
    #[default]
    NotStarted,
    /// Workers spawned, submissions accepted
    Running,
    /// Shutdown initiated, queued and in-flight work is draining
    Draining,
    /// Every worker has exited
    Stopped,
}

impl PoolState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolState::NotStarted => "not_started",
            PoolState::Running => "running",
            PoolState::Draining => "draining",
            PoolState::Stopped => "stopped",
        }
    }

    /// Whether submissions are accepted in this state
    pub fn accepts_work(&self) -> bool {
        matches!(self, PoolState::Running)
    }
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-worker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Waiting on the queue
    Idle,
    /// Running the handler for the given task
    Processing(TaskId),
    /// Shutdown observed, about to leave the pool
    Stopping,
}

impl WorkerState {
    pub fn is_busy(&self) -> bool {
        matches!(self, WorkerState::Processing(_))
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Idle => write!(f, "idle"),
            WorkerState::Processing(id) => write!(f, "processing({})", id),
            WorkerState::Stopping => write!(f, "stopping"),
        }
    }
}
