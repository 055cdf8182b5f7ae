//! Runtime error types

use thiserror::Error;

/// Rejected queue push; the task is handed back to the caller
#[derive(Error, Debug)]
pub enum PushError<T> {
    #[error("Task queue is full")]
    Full(T),

    #[error("Task queue is closed")]
    Closed(T),
}

impl<T> PushError<T> {
    /// Recover the task that was not enqueued
    pub fn into_inner(self) -> T {
        match self {
            PushError::Full(item) | PushError::Closed(item) => item,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, PushError::Full(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, PushError::Closed(_))
    }
}

/// Result sink errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkError {
    /// The sink stopped accepting producers
    #[error("Result sink is closed")]
    Closed,

    /// The result stream was dropped
    #[error("Result stream receiver has been dropped")]
    Disconnected,
}
