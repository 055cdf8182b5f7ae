//! Store entry with expiry metadata

use std::time::Duration;
use tokio::time::Instant;

/// Stored value with metadata
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,

    /// When the entry was written
    pub created_at: Instant,

    /// When the entry expires (if applicable)
    pub expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    /// Create an entry that never expires
    pub fn new(value: V) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            expires_at: None,
        }
    }

    /// Create an entry expiring `ttl` from now
    ///
    /// A TTL too large to represent as an instant never expires.
    pub fn with_ttl(value: V, ttl: Duration) -> Self {
        let mut entry = Self::new(value);
        entry.expires_at = entry.created_at.checked_add(ttl);
        entry
    }

    /// Create an entry with an optional TTL
    pub fn with_optional_ttl(value: V, ttl: Option<Duration>) -> Self {
        match ttl {
            Some(ttl) => Self::with_ttl(value, ttl),
            None => Self::new(value),
        }
    }

    /// Check if the entry is expired at `now`
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }

    /// Check if the entry is expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Get age of the entry
    pub fn age(&self) -> Duration {
        Instant::now() - self.created_at
    }
}
