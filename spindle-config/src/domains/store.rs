//! Shared store configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigResult;
use crate::validation::Validatable;

/// Shared store configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// TTL applied by `insert`; `None` keeps entries until overwritten
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub default_ttl: Option<Duration>,

    /// Interval of the background expiry sweep; `None` relies on lazy eviction
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub sweep_interval: Option<Duration>,

    /// Initial capacity hint for the backing map
    #[serde(default)]
    pub capacity_hint: usize,
}

impl Validatable for StoreConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.default_ttl.is_some_and(|ttl| ttl.is_zero()) {
            return Err(self.validation_error("default_ttl must be greater than 0"));
        }
        if self.sweep_interval.is_some_and(|interval| interval.is_zero()) {
            return Err(self.validation_error("sweep_interval must be greater than 0"));
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "store"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_have_no_expiry() {
        let config = StoreConfig::default();
        assert!(config.default_ttl.is_none());
        assert!(config.sweep_interval.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_sweep_interval_rejected() {
        let config = StoreConfig {
            sweep_interval: Some(Duration::ZERO),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
