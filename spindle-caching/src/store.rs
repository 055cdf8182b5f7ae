//! Shared key/value store with optional per-entry expiry

use log::{debug, trace};
use parking_lot::RwLock;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::ops::Add;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::Instant;

use crate::entry::CacheEntry;
use crate::stats::{StatsCollector, StoreStats};

/// Concurrent key/value store with TTL semantics
///
/// Reads share a read lock; `set`, `delete` and eviction take the write lock.
/// Every critical section is a constant number of map operations and never
/// calls back into caller code.
///
/// Expired entries are treated as absent. They are evicted lazily when their
/// key is next read, or eagerly by [`purge_expired`](Self::purge_expired).
pub struct SharedStore<K, V> {
    /// TTL applied by `insert`
    default_ttl: Option<Duration>,

    /// Store with entries
    entries: RwLock<HashMap<K, CacheEntry<V>>>,

    /// Statistics collector
    stats: StatsCollector,
}

impl<K, V> SharedStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a store whose entries never expire unless given a TTL
    pub fn new() -> Self {
        Self::with_default_ttl(None)
    }

    /// Create a store applying `default_ttl` to `insert`
    pub fn with_default_ttl(default_ttl: Option<Duration>) -> Self {
        Self::with_capacity(default_ttl, 0)
    }

    /// Create with capacity hint
    pub fn with_capacity(default_ttl: Option<Duration>, capacity: usize) -> Self {
        Self {
            default_ttl,
            entries: RwLock::new(HashMap::with_capacity(capacity)),
            stats: StatsCollector::new(),
        }
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    /// Write `value` under `key`, replacing any existing entry
    pub fn set(&self, key: K, value: V, ttl: Option<Duration>) {
        let entry = CacheEntry::with_optional_ttl(value, ttl);
        self.entries.write().insert(key, entry);
        self.stats.record_set();
    }

    /// Write `value` under `key` with the store's default TTL
    pub fn insert(&self, key: K, value: V) {
        self.set(key, value, self.default_ttl);
    }

    /// Read the live value under `key`
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if !entry.is_expired() => {
                    self.stats.record_hit();
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => {
                    self.stats.record_miss();
                    return None;
                }
            }
        }

        // Expired on the read path; a writer may have replaced it since.
        let mut entries = self.entries.write();
        let live = entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone());

        match live {
            Some(value) => {
                self.stats.record_hit();
                Some(value)
            }
            None => {
                if entries.remove(key).is_some() {
                    self.stats.record_evictions(1);
                    trace!("Evicted expired entry on access");
                }
                self.stats.record_miss();
                None
            }
        }
    }

    /// Whether a live entry exists under `key`
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries
            .read()
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    /// Remove `key`, returning its value if it was live
    pub fn delete<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let removed = self.entries.write().remove(key)?;
        if removed.is_expired() {
            self.stats.record_evictions(1);
            None
        } else {
            Some(removed.value)
        }
    }

    /// Number of live entries
    pub fn size(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .values()
            .filter(|entry| !entry.is_expired_at(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Atomically add `delta` to the value under `key`
    ///
    /// An absent or expired entry counts as `V::default()` and is rewritten
    /// with the default TTL. Returns the updated value.
    pub fn fetch_add(&self, key: K, delta: V) -> V
    where
        V: Add<Output = V> + Default,
    {
        let now = Instant::now();
        let mut entries = self.entries.write();

        let entry = entries
            .entry(key)
            .or_insert_with(|| CacheEntry::with_optional_ttl(V::default(), self.default_ttl));
        if entry.is_expired_at(now) {
            *entry = CacheEntry::with_optional_ttl(V::default(), self.default_ttl);
            self.stats.record_evictions(1);
        }

        entry.value = entry.value.clone() + delta;
        let updated = entry.value.clone();
        drop(entries);

        self.stats.record_set();
        updated
    }

    /// Remove all expired entries, returning how many were evicted
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();

        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        let evicted = before - entries.len();
        drop(entries);

        if evicted > 0 {
            self.stats.record_evictions(evicted);
            debug!("Purged {} expired store entries", evicted);
        }

        evicted
    }

    /// Get store statistics
    pub fn stats(&self) -> StoreStats {
        self.stats.snapshot(self.size())
    }
}

impl<K, V> SharedStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Start a background task purging expired entries every `interval`
    ///
    /// The task holds a weak reference and ends once the store is dropped.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(&self);
        drop(self);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                match store.upgrade() {
                    Some(store) => {
                        store.purge_expired();
                    }
                    None => break,
                }
            }

            debug!("Store sweeper stopped");
        })
    }
}

impl<K, V> Default for SharedStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
