//! Shared state for Spindle workers
//!
//! This crate provides [`SharedStore`], a concurrent key/value store with
//! optional per-entry expiry. Reads run in parallel, writes are exclusive,
//! and expired entries are evicted lazily on access.

pub mod entry;
pub mod stats;
pub mod store;

// Re-export main types
pub use entry::CacheEntry;
pub use stats::{StatsCollector, StoreStats};
pub use store::SharedStore;
