//! Cache Module
//!
//! Provides a sharded in-memory cache with LRU eviction and sliding TTL expiration.

mod entry;
mod iter;
mod lru;
mod router;
mod shard;
mod spin;
mod stats;
mod store;


// Re-export public types
pub use entry::Entry;
pub use iter::Iter;
pub use lru::{NodeId, RecencyList};
pub use router::Router;
pub use spin::{SpinGuard, SpinLock};
pub use stats::{CacheStats, StatsSnapshot};
pub use store::{CacheStore, CacheStoreBuilder, RemovalHook};

// == Public Constants ==
/// Shard count used by [`CacheStore::new`] for large capacities
pub const DEFAULT_SHARD_COUNT: usize = 64;

/// Capacities below this always get a single shard
pub const SINGLE_SHARD_THRESHOLD: usize = 128;

/// TTL sentinel meaning "never expires"
pub const NO_EXPIRATION: Option<std::time::Duration> = None;
