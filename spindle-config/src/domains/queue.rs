//! Task queue configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};

/// What a push does when the queue is at capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PushPolicy {
    /// Refuse the task immediately
    #[default]
    Reject,
    /// Suspend the caller until space frees up or the queue closes
    Block,
}

impl PushPolicy {
    pub const CHOICES: [&'static str; 2] = ["reject", "block"];

    pub fn as_str(&self) -> &'static str {
        match self {
            PushPolicy::Reject => "reject",
            PushPolicy::Block => "block",
        }
    }
}

impl fmt::Display for PushPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PushPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(PushPolicy::Reject),
            "block" => Ok(PushPolicy::Block),
            _ => Err(format!("Invalid push policy: {}", s)),
        }
    }
}

/// Task queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of pending tasks
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Behaviour of a push against a full queue
    #[serde(default)]
    pub push_policy: PushPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            push_policy: PushPolicy::default(),
        }
    }
}

impl Validatable for QueueConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.capacity, "capacity", self.domain_name())
    }

    fn domain_name(&self) -> &'static str {
        "queue"
    }
}

fn default_capacity() -> usize {
    64
}
