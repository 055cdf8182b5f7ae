//! Admission rate limiting configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};

/// Fixed-window rate gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateGateConfig {
    /// Whether submissions pass through the gate at all
    pub enabled: bool,

    /// Tokens available per window
    #[serde(default = "default_capacity")]
    pub capacity: u32,

    /// Window length
    #[serde(with = "humantime_serde", default = "default_window")]
    pub window: Duration,
}

impl Default for RateGateConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            capacity: default_capacity(),
            window: default_window(),
        }
    }
}

impl RateGateConfig {
    /// An enabled gate with the given budget
    pub fn limited(capacity: u32, window: Duration) -> Self {
        Self {
            enabled: true,
            capacity,
            window,
        }
    }
}

impl Validatable for RateGateConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !self.enabled {
            return Ok(());
        }

        validate_positive(self.capacity, "capacity", self.domain_name())?;

        if self.window.is_zero() {
            return Err(self.validation_error("window must be greater than 0"));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "rate_gate"
    }
}

fn default_capacity() -> u32 {
    100
}

fn default_window() -> Duration {
    Duration::from_secs(1)
}
