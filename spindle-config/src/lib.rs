//! Domain-driven configuration management for Spindle
//!
//! Configuration is split by engine component (pool, queue, rate gate,
//! shared store, shutdown, logging), each domain carrying its own defaults
//! and validation, with environment variable overrides on top.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    logging::{LogFormat, LogLevel, LoggingConfig},
    pool::PoolConfig,
    queue::{PushPolicy, QueueConfig},
    rate_gate::RateGateConfig,
    shutdown::ShutdownConfig,
    store::StoreConfig,
    EngineConfig,
};
