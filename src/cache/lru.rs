//! LRU Engine Module
//!
//! Least Recently Used eviction backed by a doubly linked recency list.
//!
//! List nodes live in a slot arena and link to each other by [`SlotId`], so
//! promoting a key is O(1) once the map has resolved it:
//! - Head = Most recently used
//! - Tail = Least recently used

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::cache::slots::{SlotArena, SlotId};
use crate::cache::{Cache, CacheStats, Entry};
use crate::config::EvictionPolicy;
use crate::error::{check_capacity, Result};

/// Neighbours of a node in the recency list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Link {
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

type LruEntry<K, V> = Entry<K, V, Link>;

// == Recency List State ==
#[derive(Debug)]
struct LruState<K, V> {
    /// Key to list node
    map: HashMap<K, SlotId>,
    /// List nodes
    nodes: SlotArena<LruEntry<K, V>>,
    head: Option<SlotId>,
    tail: Option<SlotId>,
    stats: CacheStats,
}

impl<K, V> LruState<K, V>
where
    K: Eq + Hash + Clone,
{
    fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity),
            nodes: SlotArena::with_capacity(capacity),
            head: None,
            tail: None,
            stats: CacheStats::new(),
        }
    }

    /// Unlinks a node, leaving it in the arena with an empty link.
    fn detach(&mut self, id: SlotId) {
        let Link { prev, next } = self.nodes[id].meta;

        match prev {
            Some(prev) => self.nodes[prev].meta.next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.nodes[next].meta.prev = prev,
            None => self.tail = prev,
        }

        self.nodes[id].meta = Link::default();
    }

    fn push_front(&mut self, id: SlotId) {
        let old_head = self.head;
        self.nodes[id].meta = Link {
            prev: None,
            next: old_head,
        };

        match old_head {
            Some(old_head) => self.nodes[old_head].meta.prev = Some(id),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
    }

    fn move_to_front(&mut self, id: SlotId) {
        if self.head == Some(id) {
            return;
        }
        self.detach(id);
        self.push_front(id);
    }

    /// Removes a node from the list, the arena and the map.
    fn unlink_and_remove(&mut self, id: SlotId) -> Option<LruEntry<K, V>> {
        self.detach(id);
        let entry = self.nodes.remove(id)?;
        self.map.remove(&entry.key);
        Some(entry)
    }

    fn evict_tail(&mut self) -> Option<LruEntry<K, V>> {
        let tail = self.tail?;
        let entry = self.unlink_and_remove(tail)?;
        self.stats.record_eviction();
        Some(entry)
    }

    fn clear(&mut self) {
        self.map.clear();
        self.nodes.clear();
        self.head = None;
        self.tail = None;
    }
}

// == LRU Cache ==
/// A cache that evicts the least recently used entry when full.
///
/// Both `get` and `put` count as a use.
#[derive(Debug)]
pub struct LruCache<K, V> {
    state: Mutex<LruState<K, V>>,
    capacity: usize,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    // == Constructor ==
    /// Creates an LRU cache holding at most `capacity` entries.
    ///
    /// # Errors
    /// Returns [`CacheError::InvalidCapacity`](crate::CacheError::InvalidCapacity)
    /// when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = check_capacity(capacity)?;
        debug!(capacity, "Created LRU cache");

        Ok(Self {
            state: Mutex::new(LruState::new(capacity)),
            capacity,
        })
    }

    /// Returns the key that would be evicted next, without touching it.
    pub fn lru_key(&self) -> Option<K> {
        let state = self.state.lock();
        state.tail.map(|tail| state.nodes[tail].key.clone())
    }

    /// Returns keys from most to least recently used.
    pub fn keys_by_recency(&self) -> Vec<K> {
        let state = self.state.lock();
        let mut keys = Vec::with_capacity(state.map.len());
        let mut cursor = state.head;
        while let Some(id) = cursor {
            let node = &state.nodes[id];
            keys.push(node.key.clone());
            cursor = node.meta.next;
        }
        keys
    }

    /// Validates internal invariants. Available in debug/test builds.
    ///
    /// Panics if the map and the recency list disagree or the capacity bound
    /// is broken.
    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        let state = self.state.lock();

        assert!(state.map.len() <= self.capacity, "len exceeds capacity");
        assert_eq!(state.map.len(), state.nodes.len(), "map/arena size mismatch");

        // Walk head to tail, checking back links and map membership.
        let mut walked = 0;
        let mut prev = None;
        let mut cursor = state.head;
        while let Some(id) = cursor {
            let node = &state.nodes[id];
            assert_eq!(node.meta.prev, prev, "broken back link at slot {}", id.index());
            assert_eq!(state.map.get(&node.key), Some(&id), "list node missing from map");
            walked += 1;
            assert!(walked <= state.nodes.len(), "cycle in recency list");
            prev = Some(id);
            cursor = node.meta.next;
        }

        assert_eq!(state.tail, prev, "tail does not end the list");
        assert_eq!(walked, state.map.len(), "list length differs from map");
    }
}

impl<K, V> Cache<K, V> for LruCache<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Send + Sync,
{
    fn get(&self, key: &K) -> Option<Arc<V>> {
        let mut state = self.state.lock();

        let Some(&id) = state.map.get(key) else {
            state.stats.record_miss();
            return None;
        };

        state.move_to_front(id);
        state.stats.record_hit();
        Some(state.nodes[id].value_handle())
    }

    fn put(&self, key: K, value: V) {
        let mut state = self.state.lock();

        if let Some(&id) = state.map.get(&key) {
            state.nodes[id].replace_value(value);
            state.move_to_front(id);
            return;
        }

        if state.map.len() >= self.capacity && state.evict_tail().is_some() {
            trace!(capacity = self.capacity, "LRU evicted least recently used entry");
        }

        let id = state.nodes.insert(Entry::new(key.clone(), value, Link::default()));
        state.push_front(id);
        state.map.insert(key, id);
    }

    fn remove(&self, key: &K) {
        let mut state = self.state.lock();
        if let Some(&id) = state.map.get(key) {
            state.unlink_and_remove(id);
        }
    }

    fn len(&self) -> usize {
        self.state.lock().map.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn clear(&self) {
        self.state.lock().clear();
    }

    fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        state.stats.snapshot(state.map.len())
    }

    fn policy(&self) -> EvictionPolicy {
        EvictionPolicy::Lru
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::CacheError;

    #[test]
    fn test_lru_new() {
        let cache: LruCache<String, String> = LruCache::new(3).unwrap();
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 3);
        assert_eq!(cache.lru_key(), None);
    }

    #[test]
    fn test_lru_zero_capacity_rejected() {
        let result = LruCache::<u32, u32>::new(0);
        assert!(matches!(result, Err(CacheError::InvalidCapacity(0))));
    }

    #[test]
    fn test_lru_recency_example() {
        let cache = LruCache::new(2).unwrap();
        cache.put("a", 1);
        cache.put("b", 2);
        cache.get(&"a");
        cache.put("c", 3);

        assert!(cache.get(&"b").is_none());
        assert_eq!(cache.get(&"a").as_deref(), Some(&1));
        assert_eq!(cache.get(&"c").as_deref(), Some(&3));
        cache.debug_validate_invariants();
    }

    #[test]
    fn test_lru_put_existing_promotes() {
        let cache = LruCache::new(3).unwrap();
        cache.put("key1", 1);
        cache.put("key2", 2);
        cache.put("key3", 3);

        cache.put("key1", 10);
        assert_eq!(cache.lru_key(), Some("key2"));

        cache.put("key4", 4);
        assert!(cache.get(&"key2").is_none());
        assert_eq!(cache.get(&"key1").as_deref(), Some(&10));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_lru_order_after_multiple_touches() {
        let cache = LruCache::new(3).unwrap();
        cache.put("a", ());
        cache.put("b", ());
        cache.put("c", ());

        cache.get(&"a");
        cache.get(&"c");
        cache.get(&"b");

        // front=[b, c, a]=back
        assert_eq!(cache.keys_by_recency(), vec!["b", "c", "a"]);
        assert_eq!(cache.lru_key(), Some("a"));
        cache.debug_validate_invariants();
    }

    #[test]
    fn test_lru_get_head_is_stable() {
        let cache = LruCache::new(2).unwrap();
        cache.put(1, "one");
        cache.put(2, "two");

        cache.get(&2);
        cache.get(&2);

        assert_eq!(cache.keys_by_recency(), vec![2, 1]);
        cache.debug_validate_invariants();
    }

    #[test]
    fn test_lru_remove_middle_head_and_tail() {
        let cache = LruCache::new(4).unwrap();
        for key in ["a", "b", "c", "d"] {
            cache.put(key, ());
        }

        cache.remove(&"b");
        cache.debug_validate_invariants();
        cache.remove(&"d");
        cache.debug_validate_invariants();
        cache.remove(&"a");
        cache.debug_validate_invariants();

        assert_eq!(cache.keys_by_recency(), vec!["c"]);
        cache.remove(&"c");
        cache.remove(&"nonexistent");
        assert!(cache.is_empty());
        cache.debug_validate_invariants();
    }

    #[test]
    fn test_lru_capacity_one() {
        let cache = LruCache::new(1).unwrap();
        cache.put("x", 1);
        cache.put("y", 2);

        assert!(cache.get(&"x").is_none());
        assert_eq!(cache.get(&"y").as_deref(), Some(&2));
        assert_eq!(cache.stats().evictions, 1);
        cache.debug_validate_invariants();
    }

    #[test]
    fn test_lru_reuses_slots_after_eviction() {
        let cache = LruCache::new(2).unwrap();
        for i in 0..100 {
            cache.put(i, i * 2);
        }

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.keys_by_recency(), vec![99, 98]);
        assert_eq!(cache.stats().evictions, 98);
        cache.debug_validate_invariants();
    }

    #[test]
    fn test_lru_stats() {
        let cache = LruCache::new(10).unwrap();
        cache.put("key1", "value1");
        cache.get(&"key1");
        cache.get(&"nonexistent");

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn test_lru_clear() {
        let cache = LruCache::new(3).unwrap();
        cache.put(1, 1);
        cache.put(2, 2);
        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.lru_key(), None);
        cache.put(3, 3);
        assert_eq!(cache.keys_by_recency(), vec![3]);
        cache.debug_validate_invariants();
    }
}
