//! Shutdown configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigResult;
use crate::validation::Validatable;

/// Graceful shutdown configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Default time a graceful shutdown waits for the drain
    #[serde(with = "humantime_serde", default = "default_graceful_timeout")]
    pub graceful_timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            graceful_timeout: default_graceful_timeout(),
        }
    }
}

impl Validatable for ShutdownConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.graceful_timeout.is_zero() {
            return Err(self.validation_error("graceful_timeout must be greater than 0"));
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "shutdown"
    }
}

fn default_graceful_timeout() -> Duration {
    Duration::from_secs(30)
}
