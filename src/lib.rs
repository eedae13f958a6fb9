//! shardlru - An embeddable, sharded LRU cache
//!
//! Provides a thread-safe key/value cache with per-shard LRU eviction,
//! optional sliding TTL expiration and stream-based persistence.
//!
//! ```
//! use shardlru::CacheStore;
//!
//! let cache = CacheStore::new(100);
//! cache.set("hits", 1u64);
//! cache.set_or_update("hits", 1, |n| *n += 1);
//! assert_eq!(cache.get("hits"), Some(2));
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod persist;

pub use cache::{CacheStore, CacheStoreBuilder, Entry, StatsSnapshot, NO_EXPIRATION};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use persist::{BincodeCodec, JsonLinesCodec, RecordCodec};
