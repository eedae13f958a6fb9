//! Router Module
//!
//! Deterministic key-to-shard mapping.

use xxhash_rust::xxh32::xxh32;

/// Maps keys onto `[0, shards)` with a 32-bit hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Router {
    shards: usize,
}

impl Router {
    /// Creates a router over `shards` shards (at least one).
    pub fn new(shards: usize) -> Self {
        Self {
            shards: shards.max(1),
        }
    }

    /// Returns the shard index for `key`.
    #[inline]
    pub fn shard_for(&self, key: &str) -> usize {
        xxh32(key.as_bytes(), 0) as usize % self.shards
    }

    #[allow(dead_code)]
    pub(crate) fn shards(&self) -> usize {
        self.shards
    }
}
