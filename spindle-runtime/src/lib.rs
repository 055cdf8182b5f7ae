//! Runtime components for Spindle
//!
//! This crate provides the bounded task queue, the worker pool and its
//! supervisor, the fan-in result sink and the fan-out pipeline helper.

pub mod counters;
pub mod error;
pub mod pipeline;
pub mod queue;
pub mod sink;
pub mod supervisor;
pub mod worker;

// Re-export commonly used types
pub use error::{PushError, SinkError};
pub use pipeline::fan_out;
pub use queue::TaskQueue;
pub use sink::{ResultProducer, ResultSink, ResultStream};
pub use supervisor::{EngineStore, Supervisor};
pub use worker::{execute_task, panic_message, run_guarded, WorkerId, WorkerTable};
