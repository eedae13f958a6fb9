//! Cache Store Module
//!
//! Main cache engine: routes each key to a shard, then applies the LRU and
//! sliding-TTL policy inside that shard's critical section.
//!
//! Removal hooks always run after the shard lock has been released, whatever
//! the reason for removal (explicit remove, eviction, expiration or flush).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::cache::entry::deadline_after;
use crate::cache::lru::NodeId;
use crate::cache::shard::{Shard, Slot};
use crate::cache::spin::SpinLock;
use crate::cache::{
    CacheStats, Entry, Iter, Router, StatsSnapshot, DEFAULT_SHARD_COUNT, SINGLE_SHARD_THRESHOLD,
};
use crate::config::CacheConfig;

/// Callback invoked with every entry that leaves the cache.
pub type RemovalHook<V> = Arc<dyn Fn(&Entry<V>) + Send + Sync>;

// == Cache Store ==
/// Thread-safe, sharded LRU cache with optional sliding TTL.
///
/// Closures passed to [`CacheStore::update`], [`CacheStore::set_or_update`]
/// and the removal hook must not call back into the cache: shard locks are
/// not reentrant and the update closures run while the lock is held.
pub struct CacheStore<V> {
    /// Independently locked partitions
    shards: Box<[SpinLock<Shard<V>>]>,
    /// Key to shard mapping
    router: Router,
    /// Default TTL, None = no expiration
    ttl: Option<Duration>,
    /// Maximum entries per shard before eviction kicks in
    capacity_per_shard: usize,
    /// Fixed at construction time
    on_remove: Option<RemovalHook<V>>,
    /// Performance statistics
    stats: CacheStats,
}

impl<V> CacheStore<V> {
    // == Constructors ==
    /// Creates a cache holding roughly `capacity` entries without expiration.
    ///
    /// Capacities below 128 use a single shard, larger ones use
    /// [`DEFAULT_SHARD_COUNT`] shards.
    pub fn new(capacity: usize) -> Self {
        Self::builder().capacity(capacity).build()
    }

    /// Creates a cache with explicit shard count and default TTL.
    ///
    /// The per-shard bound is `ceil(capacity / shards)`, so the effective total
    /// capacity can slightly exceed `capacity`.
    pub fn with_params(capacity: usize, shard_count: usize, ttl: Option<Duration>) -> Self {
        Self::builder()
            .capacity(capacity)
            .shards(shard_count)
            .ttl(ttl)
            .build()
    }

    /// Creates a cache from a [`CacheConfig`].
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::with_params(config.capacity, config.shard_count, config.ttl)
    }

    pub fn builder() -> CacheStoreBuilder<V> {
        CacheStoreBuilder::default()
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn capacity_per_shard(&self) -> usize {
        self.capacity_per_shard
    }

    /// Default TTL applied by [`CacheStore::set`].
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    // == Set ==
    /// Stores a value under the default TTL.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.ttl);
    }

    /// Stores a value with its own TTL (`None` = never expires).
    ///
    /// A live key is overwritten in place, re-armed with `ttl` and promoted.
    /// A missing or expired key is inserted; if the shard then exceeds its
    /// bound, the least recently used entries are evicted.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let key = key.into();
        let now = Utc::now();
        let mut detached = Vec::new();
        {
            let mut shard = self.shard_for(&key).lock();
            match self.live_node(&mut shard, &key, now, &mut detached) {
                Some(id) => {
                    if let Some(slot) = shard.slot_mut(id) {
                        slot.entry.value = value;
                        slot.ttl = ttl;
                    }
                    refresh(&mut shard, id, now);
                }
                None => self.insert(&mut shard, key, value, ttl, now, &mut detached),
            }
        }
        self.notify(&detached);
    }

    // == Update ==
    /// Applies `f` to the value of a live key while its shard is locked.
    ///
    /// The lookup slides the deadline and promotes the entry like a read.
    /// Returns the updated entry, or None if the key is absent or expired.
    pub fn update<F>(&self, key: &str, f: F) -> Option<Entry<V>>
    where
        F: FnOnce(&mut V),
        V: Clone,
    {
        self.with_live(key, |slot| {
            f(&mut slot.entry.value);
            slot.entry.clone()
        })
    }

    /// Transforms the value if the key is live, otherwise inserts `value` as is.
    ///
    /// Returns whether the key existed beforehand. The whole operation is one
    /// critical section, so concurrent counters built on it do not lose updates.
    pub fn set_or_update<F>(&self, key: impl Into<String>, value: V, f: F) -> bool
    where
        F: FnOnce(&mut V),
    {
        let key = key.into();
        let now = Utc::now();
        let mut detached = Vec::new();
        let existed = {
            let mut shard = self.shard_for(&key).lock();
            match self.live_node(&mut shard, &key, now, &mut detached) {
                Some(id) => {
                    refresh(&mut shard, id, now);
                    if let Some(slot) = shard.slot_mut(id) {
                        f(&mut slot.entry.value);
                    }
                    true
                }
                None => {
                    self.insert(&mut shard, key, value, self.ttl, now, &mut detached);
                    false
                }
            }
        };
        self.notify(&detached);
        existed
    }

    // == Remove ==
    /// Detaches a key and returns its value, firing the removal hook.
    pub fn remove(&self, key: &str) -> Option<V> {
        let slot = {
            let mut shard = self.shard_for(key).lock();
            let id = shard.get(key)?;
            shard.remove(id)?
        };
        if let Some(hook) = &self.on_remove {
            hook(&slot.entry);
        }
        Some(slot.entry.value)
    }

    // == Contains ==
    /// Checks for a live key without promoting it or sliding its deadline.
    pub fn contains(&self, key: &str) -> bool {
        let now = Utc::now();
        let shard = self.shard_for(key).lock();
        let live = shard
            .get(key)
            .and_then(|id| shard.slot(id))
            .is_some_and(|slot| !slot.entry.is_expired_at(now));
        live
    }

    // == Length ==
    /// Total entries, summed shard by shard.
    ///
    /// Not a linearizable snapshot while writers are active.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.lock().is_empty())
    }

    // == Keys ==
    /// All keys, captured one shard at a time.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        for shard in self.shards.iter() {
            keys.extend(shard.lock().keys().cloned());
        }
        keys
    }

    // == Iterate ==
    /// Lazily walks live entries, oldest to newest within each shard.
    pub fn iter(&self) -> Iter<'_, V>
    where
        V: Clone,
    {
        Iter::new(&self.shards)
    }

    // == Flush ==
    /// Empties every shard, then fires the removal hook once per old entry.
    pub fn flush(&self) {
        for (idx, shard) in self.shards.iter().enumerate() {
            let old = std::mem::take(&mut *shard.lock());
            if old.is_empty() {
                continue;
            }
            let entries = old.into_entries();
            debug!("Flushed {} entries from shard {}", entries.len(), idx);
            self.notify(&entries);
        }
    }

    // == Stats ==
    /// Returns a snapshot of the cache counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot(self.len())
    }

    /// Inserts a restored entry only if its key is absent.
    ///
    /// Never evicts; entries whose deadline already passed are skipped.
    pub(crate) fn restore(&self, entry: Entry<V>, now: DateTime<Utc>) -> bool {
        if entry.is_expired_at(now) {
            return false;
        }
        let ttl = entry.expiration.map(|deadline| {
            self.ttl
                .unwrap_or_else(|| (deadline - now).to_std().unwrap_or(Duration::ZERO))
        });
        let inserted = self.shard_for(&entry.key).lock().put_if_absent(entry, ttl);
        if inserted {
            self.stats.record_insert();
        }
        inserted
    }

    fn shard_for(&self, key: &str) -> &SpinLock<Shard<V>> {
        &self.shards[self.router.shard_for(key)]
    }

    /// Looks a key up with hit/miss accounting, sliding and promotion.
    fn read<R>(&self, key: &str, f: impl FnOnce(&Entry<V>) -> R) -> Option<R> {
        let result = self.with_live(key, |slot| f(&slot.entry));
        match result {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        result
    }

    fn with_live<R>(&self, key: &str, f: impl FnOnce(&mut Slot<V>) -> R) -> Option<R> {
        let now = Utc::now();
        let mut detached = Vec::new();
        let result = {
            let mut shard = self.shard_for(key).lock();
            self.live_node(&mut shard, key, now, &mut detached)
                .and_then(|id| {
                    refresh(&mut shard, id, now);
                    shard.slot_mut(id).map(f)
                })
        };
        self.notify(&detached);
        result
    }

    /// Resolves a key to a live node, detaching it if its deadline passed.
    fn live_node(
        &self,
        shard: &mut Shard<V>,
        key: &str,
        now: DateTime<Utc>,
        detached: &mut Vec<Entry<V>>,
    ) -> Option<NodeId> {
        let id = shard.get(key)?;
        let expired = shard
            .slot(id)
            .is_some_and(|slot| slot.entry.is_expired_at(now));
        if !expired {
            return Some(id);
        }
        if let Some(slot) = shard.remove(id) {
            self.stats.record_expiration();
            debug!("Expired entry '{}' removed on access", slot.entry.key);
            detached.push(slot.entry);
        }
        None
    }

    fn insert(
        &self,
        shard: &mut Shard<V>,
        key: String,
        value: V,
        ttl: Option<Duration>,
        now: DateTime<Utc>,
        detached: &mut Vec<Entry<V>>,
    ) {
        let entry = Entry {
            key,
            value,
            expiration: deadline_after(now, ttl),
        };
        shard.add(entry, ttl);
        self.stats.record_insert();

        // A restore may have overfilled the shard, so evict until back in bounds.
        while shard.len() > self.capacity_per_shard {
            let Some(slot) = shard.oldest().and_then(|id| shard.remove(id)) else {
                break;
            };
            self.stats.record_eviction();
            debug!("Evicted least recently used entry '{}'", slot.entry.key);
            detached.push(slot.entry);
        }
    }

    fn notify(&self, detached: &[Entry<V>]) {
        if let Some(hook) = &self.on_remove {
            for entry in detached {
                hook(entry);
            }
        }
    }
}

impl<V: Clone> CacheStore<V> {
    // == Get ==
    /// Returns a clone of the value if the key is live.
    ///
    /// A hit slides the deadline by the entry's TTL and promotes the entry.
    /// An expired entry is removed and reported as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        self.read(key, |entry| entry.value.clone())
    }

    /// Like [`CacheStore::get`], but returns the whole entry including its deadline.
    pub fn get_entry(&self, key: &str) -> Option<Entry<V>> {
        self.read(key, Entry::clone)
    }
}

impl<V> fmt::Debug for CacheStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("shards", &self.shards.len())
            .field("capacity_per_shard", &self.capacity_per_shard)
            .field("ttl", &self.ttl)
            .field("on_remove", &self.on_remove.is_some())
            .finish()
    }
}

/// Slides the deadline by the node's own TTL and promotes it.
fn refresh<V>(shard: &mut Shard<V>, id: NodeId, now: DateTime<Utc>) {
    if let Some(slot) = shard.slot_mut(id) {
        slot.entry.expiration = deadline_after(now, slot.ttl);
    }
    shard.offer(id);
}

// == Builder ==
/// Builder for [`CacheStore`]; the only way to attach a removal hook.
pub struct CacheStoreBuilder<V> {
    capacity: usize,
    shards: Option<usize>,
    ttl: Option<Duration>,
    on_remove: Option<RemovalHook<V>>,
}

impl<V> Default for CacheStoreBuilder<V> {
    fn default() -> Self {
        Self {
            capacity: CacheConfig::default().capacity,
            shards: None,
            ttl: None,
            on_remove: None,
        }
    }
}

impl<V> CacheStoreBuilder<V> {
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn shards(mut self, shards: usize) -> Self {
        self.shards = Some(shards);
        self
    }

    pub fn ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Registers the callback fired for every entry leaving the cache.
    pub fn on_remove<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Entry<V>) + Send + Sync + 'static,
    {
        self.on_remove = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> CacheStore<V> {
        let shard_count = if self.capacity < SINGLE_SHARD_THRESHOLD {
            1
        } else {
            self.shards.unwrap_or(DEFAULT_SHARD_COUNT).max(1)
        };
        let capacity_per_shard = self.capacity.div_ceil(shard_count).max(1);

        CacheStore {
            shards: (0..shard_count).map(|_| SpinLock::default()).collect(),
            router: Router::new(shard_count),
            ttl: self.ttl,
            capacity_per_shard,
            on_remove: self.on_remove,
            stats: CacheStats::new(),
        }
    }
}
