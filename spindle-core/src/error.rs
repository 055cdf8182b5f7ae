//! Core error types for Spindle

use std::time::Duration;
use thiserror::Error;

use crate::types::PoolState;

/// Admission and lifecycle errors returned directly to callers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Submission raced with shutdown and the queue no longer accepts work
    #[error("Task queue is closed")]
    QueueClosed,

    /// Bounded queue is full under the reject policy
    #[error("Task queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    /// Rate gate denied admission for the current window
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// Operation requires a running pool
    #[error("Worker pool is not running (state: {0})")]
    PoolNotRunning(PoolState),

    /// `start` was called on a pool that already left `NotStarted`
    #[error("Worker pool has already been started")]
    AlreadyStarted,

    /// Drain did not finish within the caller's timeout
    #[error("Shutdown did not complete within {0:?}")]
    ShutdownTimeout(Duration),

    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl EngineError {
    /// Whether the caller may retry the same submission later
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::QueueFull { .. } | EngineError::RateLimited { .. })
    }
}

/// Result type alias for Spindle
pub type Result<T> = std::result::Result<T, EngineError>;

/// Execution-time failure carried inside a task result
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskFailure {
    /// The handler returned an application error
    #[error("Handler error: {0}")]
    Handler(String),

    /// The handler panicked; the worker survived
    #[error("Handler panicked: {0}")]
    ExecutionPanic(String),

    /// The task was resolved without running because of an urgent stop
    #[error("Task cancelled before execution")]
    Cancelled,
}

impl TaskFailure {
    /// Build a handler failure from any displayable error
    pub fn handler(err: impl std::fmt::Display) -> Self {
        TaskFailure::Handler(err.to_string())
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, TaskFailure::ExecutionPanic(_))
    }
}
