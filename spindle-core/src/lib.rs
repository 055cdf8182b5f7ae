//! Core domain models and types for Spindle
//!
//! This crate contains the task, result, error and lifecycle types shared by
//! the queue, the worker pool and the supervisor. It has minimal dependencies
//! and defines the domain language of the engine.

pub mod error;
pub mod execution;
pub mod stats;
pub mod task;
pub mod types;

// Re-export commonly used types at the crate root
pub use error::{EngineError, Result, TaskFailure};
pub use execution::TaskResult;
pub use stats::EngineStats;
pub use task::{SharedHandler, Task, TaskHandler, TaskId};
pub use types::{PoolState, WorkerState};
