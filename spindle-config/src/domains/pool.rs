//! Worker pool configuration

use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;
use crate::validation::{validate_at_most, validate_positive, Validatable};

/// Upper bound on workers in a single pool
pub const MAX_WORKERS: usize = 1024;

/// Worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of concurrently executing workers
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
        }
    }
}

impl PoolConfig {
    pub fn with_workers(worker_count: usize) -> Self {
        Self { worker_count }
    }
}

impl Validatable for PoolConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.worker_count, "worker_count", self.domain_name())?;
        validate_at_most(self.worker_count, MAX_WORKERS, "worker_count", self.domain_name())?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "pool"
    }
}

fn default_worker_count() -> usize {
    num_cpus::get()
}
