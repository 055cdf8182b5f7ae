//! Logging setup for Spindle
//!
//! Library crates emit through `tracing` or the `log` facade; binaries and
//! tests call [`init_logging`] once to install a formatted console subscriber
//! filtered by the engine's [`LoggingConfig`](spindle_config::LoggingConfig).

pub mod init;

pub use init::{build_filter, init_logging, init_simple_tracing};
