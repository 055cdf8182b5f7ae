//! Fixed-window admission control

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use spindle_config::RateGateConfig;
use std::time::Duration;
use tokio::time::Instant;

/// Point-in-time view of a rate gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateGateSnapshot {
    pub enabled: bool,
    pub capacity: u32,
    pub remaining: u32,
    #[serde(with = "humantime_serde")]
    pub window: Duration,
}

/// Token budget that refills to `capacity` once per window
///
/// The first window opens on the first call to [`admit`](Self::admit). Resets
/// are lazy: the window is only rolled forward when the gate is consulted, so
/// an idle gate costs nothing. Up to `capacity` admissions may land right
/// before a reset and another `capacity` right after it.
pub struct RateGate {
    enabled: bool,
    capacity: u32,
    window: Duration,
    state: Mutex<GateState>,
}

struct GateState {
    tokens: u32,
    window_start: Option<Instant>,
}

impl GateState {
    /// Roll the window forward if it has elapsed
    fn refresh(&mut self, now: Instant, capacity: u32, window: Duration) {
        let expired = match self.window_start {
            Some(start) => now.duration_since(start) >= window,
            None => true,
        };

        if expired {
            self.tokens = capacity;
            self.window_start = Some(now);
        }
    }
}

impl RateGate {
    /// Create an enabled gate admitting `capacity` calls per `window`
    pub fn new(capacity: u32, window: Duration) -> Self {
        Self {
            enabled: true,
            capacity,
            window,
            state: Mutex::new(GateState {
                tokens: capacity,
                window_start: None,
            }),
        }
    }

    /// Create a gate that admits everything
    pub fn unlimited() -> Self {
        let mut gate = Self::new(u32::MAX, Duration::MAX);
        gate.enabled = false;
        gate
    }

    pub fn from_config(config: &RateGateConfig) -> Self {
        if config.enabled {
            Self::new(config.capacity, config.window)
        } else {
            Self::unlimited()
        }
    }

    /// Try to take one token; never blocks
    pub fn admit(&self) -> bool {
        if !self.enabled {
            return true;
        }

        let mut state = self.state.lock();
        state.refresh(Instant::now(), self.capacity, self.window);

        if state.tokens > 0 {
            state.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Tokens left in the current window
    pub fn remaining(&self) -> u32 {
        if !self.enabled {
            return self.capacity;
        }

        let state = self.state.lock();
        match state.window_start {
            Some(start) if Instant::now().duration_since(start) < self.window => state.tokens,
            _ => self.capacity,
        }
    }

    /// Time until the current window resets
    ///
    /// Zero when no window is open or the open one has already elapsed.
    pub fn time_until_reset(&self) -> Duration {
        if !self.enabled {
            return Duration::ZERO;
        }

        let state = self.state.lock();
        match state.window_start {
            Some(start) => self
                .window
                .saturating_sub(Instant::now().duration_since(start)),
            None => Duration::ZERO,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn snapshot(&self) -> RateGateSnapshot {
        RateGateSnapshot {
            enabled: self.enabled,
            capacity: self.capacity,
            remaining: self.remaining(),
            window: self.window,
        }
    }
}

impl std::fmt::Debug for RateGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateGate")
            .field("enabled", &self.enabled)
            .field("capacity", &self.capacity)
            .field("window", &self.window)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_window_refills_after_elapsing() {
        let gate = RateGate::new(3, Duration::from_secs(1));

        assert!(gate.admit());
        assert!(gate.admit());
        assert!(gate.admit());
        assert!(!gate.admit());
        assert_eq!(gate.remaining(), 0);

        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(gate.remaining(), 3);
        assert!(gate.admit());
        assert!(gate.admit());
        assert!(gate.admit());
        assert!(!gate.admit());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_window_starts_at_first_admit() {
        let gate = RateGate::new(1, Duration::from_secs(10));
        assert_eq!(gate.time_until_reset(), Duration::ZERO);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(gate.admit());
        assert_eq!(gate.time_until_reset(), Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(!gate.admit());
        assert_eq!(gate.time_until_reset(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_across_window_boundary() {
        let gate = RateGate::new(2, Duration::from_millis(100));
        assert!(gate.admit());

        tokio::time::sleep(Duration::from_millis(99)).await;
        assert!(gate.admit());
        assert!(!gate.admit());

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(gate.admit());
        assert!(gate.admit());
    }

    #[test]
    fn test_disabled_gate_admits_everything() {
        let gate = RateGate::from_config(&RateGateConfig::default());
        assert!(!gate.is_enabled());
        for _ in 0..10_000 {
            assert!(gate.admit());
        }
        assert_eq!(gate.time_until_reset(), Duration::ZERO);
    }

    #[test]
    fn test_from_enabled_config() {
        let gate = RateGate::from_config(&RateGateConfig::limited(5, Duration::from_secs(2)));
        assert!(gate.is_enabled());
        assert_eq!(gate.capacity(), 5);
        assert_eq!(gate.window(), Duration::from_secs(2));
        assert_eq!(gate.snapshot().remaining, 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_admits_never_exceed_capacity() {
        let gate = Arc::new(RateGate::new(50, Duration::from_secs(3600)));
        let admitted = Arc::new(AtomicU32::new(0));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let gate = gate.clone();
                let admitted = admitted.clone();
                tokio::spawn(async move {
                    for _ in 0..20 {
                        if gate.admit() {
                            admitted.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(admitted.load(Ordering::Relaxed), 50);
    }
}
