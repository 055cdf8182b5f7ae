//! Admission control and shutdown signalling for Spindle
//!
//! This crate provides the fixed-window [`RateGate`] used to throttle task
//! submission and the [`ShutdownCoordinator`] workers observe to stop.

pub mod rate_gate;
pub mod shutdown;

// Re-export commonly used types
pub use rate_gate::{RateGate, RateGateSnapshot};
pub use shutdown::{ShutdownCoordinator, ShutdownListener, ShutdownSignal};
