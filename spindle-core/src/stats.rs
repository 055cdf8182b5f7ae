//! Engine statistics snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::PoolState;

/// Point-in-time view of the engine
///
/// Fields are read independently; no consistency is guaranteed across them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Tasks waiting in the queue
    pub queued: usize,

    /// Tasks currently inside a handler
    pub active: usize,

    /// Successful results produced
    pub completed: u64,

    /// Failed results produced (handler error or panic)
    pub failed: u64,

    /// Queued tasks resolved as cancelled by an urgent stop
    pub cancelled: u64,

    /// Submissions refused at admission time
    pub rejected: u64,

    /// Submissions accepted into the queue
    pub submitted: u64,

    /// Workers that have not exited
    pub live_workers: usize,

    /// Pool lifecycle state
    pub state: PoolState,

    /// When the snapshot was taken
    pub captured_at: DateTime<Utc>,
}

impl EngineStats {
    /// Results produced so far, of any kind
    pub fn finished(&self) -> u64 {
        self.completed + self.failed + self.cancelled
    }

    /// Fraction of finished tasks that failed (0.0 to 1.0)
    pub fn failure_rate(&self) -> f64 {
        let finished = self.completed + self.failed;
        if finished > 0 {
            self.failed as f64 / finished as f64
        } else {
            0.0
        }
    }
}
