//! Configuration loading and environment variable handling

use log::debug;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::domains::EngineConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::validation::validate_enum_choice;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "SPINDLE".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<EngineConfig> {
        let path = path.as_ref();
        debug!("Loading engine configuration from {}", path.display());

        let content = std::fs::read_to_string(path)?;
        let mut config: EngineConfig = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<EngineConfig> {
        let mut config = EngineConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<EngineConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut EngineConfig) -> ConfigResult<()> {
        self.apply_pool_overrides(&mut config.pool)?;
        self.apply_queue_overrides(&mut config.queue)?;
        self.apply_rate_gate_overrides(&mut config.rate_gate)?;
        self.apply_store_overrides(&mut config.store)?;
        self.apply_shutdown_overrides(&mut config.shutdown)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    fn apply_pool_overrides(&self, config: &mut crate::domains::pool::PoolConfig) -> ConfigResult<()> {
        if let Some(count) = self.parse_env_var("WORKER_COUNT")? {
            config.worker_count = count;
        }
        Ok(())
    }

    fn apply_queue_overrides(&self, config: &mut crate::domains::queue::QueueConfig) -> ConfigResult<()> {
        if let Some(capacity) = self.parse_env_var("QUEUE_CAPACITY")? {
            config.capacity = capacity;
        }

        if let Ok(policy) = self.get_env_var("QUEUE_POLICY") {
            use crate::domains::queue::PushPolicy;
            validate_enum_choice(&policy, &PushPolicy::CHOICES, "QUEUE_POLICY", "queue")?;
            config.push_policy = PushPolicy::from_str(&policy).map_err(ConfigError::EnvError)?;
        }

        Ok(())
    }

    fn apply_rate_gate_overrides(
        &self,
        config: &mut crate::domains::rate_gate::RateGateConfig,
    ) -> ConfigResult<()> {
        if let Some(enabled) = self.parse_env_var("RATE_LIMIT_ENABLED")? {
            config.enabled = enabled;
        }

        if let Some(capacity) = self.parse_env_var("RATE_LIMIT_CAPACITY")? {
            config.capacity = capacity;
        }

        if let Some(window_ms) = self.parse_env_var::<u64>("RATE_LIMIT_WINDOW_MS")? {
            config.window = Duration::from_millis(window_ms);
        }

        Ok(())
    }

    fn apply_store_overrides(&self, config: &mut crate::domains::store::StoreConfig) -> ConfigResult<()> {
        if let Some(ttl_ms) = self.parse_env_var::<u64>("STORE_DEFAULT_TTL_MS")? {
            config.default_ttl = Some(Duration::from_millis(ttl_ms));
        }
        Ok(())
    }

    fn apply_shutdown_overrides(
        &self,
        config: &mut crate::domains::shutdown::ShutdownConfig,
    ) -> ConfigResult<()> {
        if let Some(timeout_ms) = self.parse_env_var::<u64>("SHUTDOWN_TIMEOUT_MS")? {
            config.graceful_timeout = Duration::from_millis(timeout_ms);
        }
        Ok(())
    }

    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    /// Parse a prefixed environment variable if it is set
    fn parse_env_var<T>(&self, name: &str) -> ConfigResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_env_var(name) {
            Ok(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|e| ConfigError::EnvError(format!("Invalid {}: {}", name, e))),
            Err(_) => Ok(None),
        }
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
