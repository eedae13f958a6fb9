//! Lazy Traversal Module
//!
//! Pull-based walk over every live entry, shard by shard.
//!
//! Each shard is locked only while its entries are copied out, and the lock
//! is released before the first of them is yielded. The consumer can pause
//! between items or drop the iterator at any point without leaving a shard
//! locked or anything running in the background.

use std::iter::FusedIterator;
use std::vec;

use chrono::Utc;

use crate::cache::shard::Shard;
use crate::cache::spin::SpinLock;
use crate::cache::Entry;

// == Iter ==
/// Entries ordered oldest to newest within each shard, shards in index order.
pub struct Iter<'a, V> {
    shards: &'a [SpinLock<Shard<V>>],
    next_shard: usize,
    batch: vec::IntoIter<Entry<V>>,
}

impl<'a, V: Clone> Iter<'a, V> {
    pub(crate) fn new(shards: &'a [SpinLock<Shard<V>>]) -> Self {
        Self {
            shards,
            next_shard: 0,
            batch: Vec::new().into_iter(),
        }
    }

    /// Ends the traversal early; later calls to `next` return None.
    pub fn stop(&mut self) {
        self.next_shard = self.shards.len();
        self.batch = Vec::new().into_iter();
    }

    /// Copies out the live entries of the next shard under its lock.
    fn drain_next_shard(&mut self) -> bool {
        let Some(lock) = self.shards.get(self.next_shard) else {
            return false;
        };
        self.next_shard += 1;

        let now = Utc::now();
        let entries: Vec<Entry<V>> = {
            let shard = lock.lock();
            shard
                .iter_oldest_first()
                .filter(|entry| !entry.is_expired_at(now))
                .cloned()
                .collect()
        };
        self.batch = entries.into_iter();
        true
    }
}

impl<V: Clone> Iterator for Iter<'_, V> {
    type Item = Entry<V>;

    fn next(&mut self) -> Option<Entry<V>> {
        loop {
            if let Some(entry) = self.batch.next() {
                return Some(entry);
            }
            if !self.drain_next_shard() {
                return None;
            }
        }
    }
}

impl<V: Clone> FusedIterator for Iter<'_, V> {}
