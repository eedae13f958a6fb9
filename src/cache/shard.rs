//! Shard Module
//!
//! One independently locked partition of the keyspace: a key index plus a
//! recency list. Every method assumes the caller holds the shard's lock.

use std::collections::HashMap;
use std::time::Duration;

use crate::cache::lru::{NodeId, RecencyList};
use crate::cache::Entry;

// == Slot ==
/// Payload of a linked node: the entry plus the TTL used to slide its deadline.
#[derive(Debug)]
pub struct Slot<V> {
    pub entry: Entry<V>,
    pub ttl: Option<Duration>,
}

// == Shard ==
/// Key index and recency list kept in lockstep.
///
/// The set of keys in `index` always equals the set of entries linked in `list`.
#[derive(Debug)]
pub struct Shard<V> {
    index: HashMap<String, NodeId>,
    list: RecencyList<Slot<V>>,
}

impl<V> Shard<V> {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            list: RecencyList::new(),
        }
    }

    // == Add ==
    /// Links a new entry as most recently used.
    ///
    /// The key must not already be present.
    pub fn add(&mut self, entry: Entry<V>, ttl: Option<Duration>) -> NodeId {
        debug_assert!(!self.index.contains_key(&entry.key));
        let key = entry.key.clone();
        let id = self.list.push_front(Slot { entry, ttl });
        self.index.insert(key, id);
        id
    }

    // == Get ==
    /// Index lookup only; does not promote.
    pub fn get(&self, key: &str) -> Option<NodeId> {
        self.index.get(key).copied()
    }

    // == Put If Absent ==
    /// Adds the entry only if its key is not already indexed.
    pub fn put_if_absent(&mut self, entry: Entry<V>, ttl: Option<Duration>) -> bool {
        if self.index.contains_key(&entry.key) {
            return false;
        }
        self.add(entry, ttl);
        true
    }

    /// The least recently used node, i.e. the eviction candidate.
    pub fn oldest(&self) -> Option<NodeId> {
        self.list.back()
    }

    // == Remove ==
    /// Detaches a node from index and list and returns its payload.
    ///
    /// The handle is dead afterwards; its slot goes back to the pool.
    pub fn remove(&mut self, id: NodeId) -> Option<Slot<V>> {
        let slot = self.list.remove(id)?;
        self.index.remove(&slot.entry.key);
        Some(slot)
    }

    // == Offer ==
    /// Promotes a node to most recently used.
    pub fn offer(&mut self, id: NodeId) {
        self.list.move_to_front(id);
    }

    pub fn slot(&self, id: NodeId) -> Option<&Slot<V>> {
        self.list.get(id)
    }

    pub fn slot_mut(&mut self, id: NodeId) -> Option<&mut Slot<V>> {
        self.list.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.index.keys()
    }

    /// Walks entries from least to most recently used.
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = &Entry<V>> {
        self.list.iter_oldest_first().map(|slot| &slot.entry)
    }

    /// Consumes the shard, yielding entries most recently used first.
    pub fn into_entries(mut self) -> Vec<Entry<V>> {
        let mut entries = Vec::with_capacity(self.list.len());
        while let Some(slot) = self.list.pop_front() {
            entries.push(slot.entry);
        }
        entries
    }
}

impl<V> Default for Shard<V> {
    fn default() -> Self {
        Self::new()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, value: i32) -> Entry<i32> {
        Entry::new(key, value, None)
    }

    #[test]
    fn test_add_and_get() {
        let mut shard = Shard::new();
        let id = shard.add(entry("a", 1), None);

        assert_eq!(shard.get("a"), Some(id));
        assert_eq!(shard.slot(id).unwrap().entry.value, 1);
        assert_eq!(shard.len(), 1);
        assert!(shard.get("missing").is_none());
    }

    #[test]
    fn test_put_if_absent_keeps_existing() {
        let mut shard = Shard::new();
        assert!(shard.put_if_absent(entry("a", 1), None));
        assert!(!shard.put_if_absent(entry("a", 2), None));

        let id = shard.get("a").unwrap();
        assert_eq!(shard.slot(id).unwrap().entry.value, 1);
        assert_eq!(shard.len(), 1);
    }

    #[test]
    fn test_oldest_and_offer() {
        let mut shard = Shard::new();
        let a = shard.add(entry("a", 1), None);
        let b = shard.add(entry("b", 2), None);
        shard.add(entry("c", 3), None);

        assert_eq!(shard.oldest(), Some(a));
        shard.offer(a);
        assert_eq!(shard.oldest(), Some(b));

        let order: Vec<_> = shard.iter_oldest_first().map(|e| e.key.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_remove_keeps_index_and_list_in_sync() {
        let mut shard = Shard::new();
        let a = shard.add(entry("a", 1), None);
        shard.add(entry("b", 2), None);

        let slot = shard.remove(a).unwrap();
        assert_eq!(slot.entry.key, "a");
        assert!(shard.get("a").is_none());
        assert_eq!(shard.len(), 1);
        assert_eq!(shard.iter_oldest_first().count(), 1);
        assert!(shard.remove(a).is_none());
    }

    #[test]
    fn test_into_entries_newest_first() {
        let mut shard = Shard::new();
        shard.add(entry("a", 1), None);
        shard.add(entry("b", 2), None);

        let keys: Vec<_> = shard.into_entries().into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }
}
