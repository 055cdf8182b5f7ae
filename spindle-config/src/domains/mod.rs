//! Domain-specific configuration modules

pub mod logging;
pub mod pool;
pub mod queue;
pub mod rate_gate;
pub mod shutdown;
pub mod store;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main engine configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker pool configuration
    #[serde(default)]
    pub pool: pool::PoolConfig,

    /// Task queue configuration
    #[serde(default)]
    pub queue: queue::QueueConfig,

    /// Admission rate limiting
    #[serde(default)]
    pub rate_gate: rate_gate::RateGateConfig,

    /// Shared store configuration
    #[serde(default)]
    pub store: store::StoreConfig,

    /// Shutdown configuration
    #[serde(default)]
    pub shutdown: shutdown::ShutdownConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,
}

impl EngineConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.pool.validate()?;
        self.queue.validate()?;
        self.rate_gate.validate()?;
        self.store.validate()?;
        self.shutdown.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = EngineConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
