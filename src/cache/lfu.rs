//! LFU Engine Module
//!
//! Least Frequently Used eviction backed by an array binary min-heap.
//!
//! Entries live in a slot arena; the heap is a `Vec<SlotId>` ordered by each
//! entry's access count. Every entry records its own heap index, and every
//! swap rewrites both back-pointers, so an entry found through the map can be
//! re-sifted or removed in O(log n) without scanning the heap.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::cache::slots::{SlotArena, SlotId};
use crate::cache::{Cache, CacheStats, Entry};
use crate::config::EvictionPolicy;
use crate::error::{check_capacity, Result};

/// Access count and heap index of an LFU entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frequency {
    /// Starts at 1 on insertion, bumped on every hit and overwrite
    count: u64,
    /// Index of this entry in the heap array
    position: usize,
}

type LfuEntry<K, V> = Entry<K, V, Frequency>;

// == Frequency Heap State ==
#[derive(Debug)]
struct LfuState<K, V> {
    map: HashMap<K, SlotId>,
    entries: SlotArena<LfuEntry<K, V>>,
    heap: Vec<SlotId>,
    stats: CacheStats,
}

impl<K, V> LfuState<K, V>
where
    K: Eq + Hash + Clone,
{
    fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity),
            entries: SlotArena::with_capacity(capacity),
            heap: Vec::with_capacity(capacity),
            stats: CacheStats::new(),
        }
    }

    fn count_at(&self, position: usize) -> u64 {
        self.entries[self.heap[position]].meta.count
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        let (a, b) = (self.heap[i], self.heap[j]);
        self.entries[a].meta.position = i;
        self.entries[b].meta.position = j;
    }

    fn sift_up(&mut self, mut position: usize) {
        while position > 0 {
            let parent = (position - 1) / 2;
            if self.count_at(position) >= self.count_at(parent) {
                break;
            }
            self.swap(position, parent);
            position = parent;
        }
    }

    fn sift_down(&mut self, mut position: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * position + 1;
            let right = left + 1;
            let mut smallest = position;

            if left < len && self.count_at(left) < self.count_at(smallest) {
                smallest = left;
            }
            if right < len && self.count_at(right) < self.count_at(smallest) {
                smallest = right;
            }
            if smallest == position {
                break;
            }
            self.swap(position, smallest);
            position = smallest;
        }
    }

    /// Restores the heap property around an entry whose count changed.
    fn fix(&mut self, position: usize) {
        // A bumped count only ever moves an entry toward the leaves; the
        // up-sift is a no-op then, but keeps `fix` correct for any change.
        self.sift_down(position);
        self.sift_up(position);
    }

    fn push(&mut self, id: SlotId) {
        let position = self.heap.len();
        self.entries[id].meta.position = position;
        self.heap.push(id);
        self.sift_up(position);
    }

    /// Takes the entry at `position` out of the heap, leaving it in the arena.
    fn remove_at(&mut self, position: usize) -> Option<SlotId> {
        let last = self.heap.len().checked_sub(1)?;
        if position > last {
            return None;
        }

        self.swap(position, last);
        let id = self.heap.pop()?;
        if position < self.heap.len() {
            self.fix(position);
        }
        Some(id)
    }

    /// Bumps an entry's count and re-sifts it.
    fn touch(&mut self, id: SlotId) {
        let meta = &mut self.entries[id].meta;
        meta.count = meta.count.saturating_add(1);
        let position = meta.position;
        self.fix(position);
    }

    fn remove_entry(&mut self, id: SlotId) -> Option<LfuEntry<K, V>> {
        let position = self.entries.get(id)?.meta.position;
        self.remove_at(position)?;
        let entry = self.entries.remove(id)?;
        self.map.remove(&entry.key);
        Some(entry)
    }

    fn evict_min(&mut self) -> Option<LfuEntry<K, V>> {
        let id = *self.heap.first()?;
        let entry = self.remove_entry(id)?;
        self.stats.record_eviction();
        Some(entry)
    }

    fn clear(&mut self) {
        self.map.clear();
        self.entries.clear();
        self.heap.clear();
    }
}

// == LFU Cache ==
/// A cache that evicts the least frequently used entry when full.
///
/// Frequency counts hits and overwrites since insertion. Among entries tied
/// at the lowest count, which one is evicted is unspecified.
#[derive(Debug)]
pub struct LfuCache<K, V> {
    state: Mutex<LfuState<K, V>>,
    capacity: usize,
}

impl<K, V> LfuCache<K, V>
where
    K: Eq + Hash + Clone,
{
    // == Constructor ==
    /// Creates an LFU cache holding at most `capacity` entries.
    ///
    /// # Errors
    /// Returns [`CacheError::InvalidCapacity`](crate::CacheError::InvalidCapacity)
    /// when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = check_capacity(capacity)?;
        debug!(capacity, "Created LFU cache");

        Ok(Self {
            state: Mutex::new(LfuState::new(capacity)),
            capacity,
        })
    }

    /// Returns the access count of a key without counting as an access.
    pub fn frequency(&self, key: &K) -> Option<u64> {
        let state = self.state.lock();
        state.map.get(key).map(|&id| state.entries[id].meta.count)
    }

    /// Returns the lowest access count currently held.
    pub fn min_frequency(&self) -> Option<u64> {
        let state = self.state.lock();
        state.heap.first().map(|&id| state.entries[id].meta.count)
    }

    /// Validates internal invariants. Available in debug/test builds.
    ///
    /// Panics if the map, the arena and the heap disagree, if a stored
    /// position is stale, or if the min-heap property is broken.
    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        let state = self.state.lock();
        let len = state.heap.len();

        assert!(len <= self.capacity, "len exceeds capacity");
        assert_eq!(state.map.len(), len, "map/heap size mismatch");
        assert_eq!(state.entries.len(), len, "arena/heap size mismatch");

        for (position, &id) in state.heap.iter().enumerate() {
            let entry = &state.entries[id];
            assert_eq!(entry.meta.position, position, "stale position for slot {}", id.index());
            assert_eq!(state.map.get(&entry.key), Some(&id), "heap entry missing from map");
            assert!(entry.meta.count >= 1, "count below 1");

            if position > 0 {
                let parent = (position - 1) / 2;
                assert!(
                    state.count_at(parent) <= entry.meta.count,
                    "heap property broken at position {}",
                    position
                );
            }
        }
    }
}

impl<K, V> Cache<K, V> for LfuCache<K, V>
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

        state.touch(id);
        state.stats.record_hit();
        Some(state.entries[id].value_handle())
    }

    fn put(&self, key: K, value: V) {
        let mut state = self.state.lock();

        if let Some(&id) = state.map.get(&key) {
            state.entries[id].replace_value(value);
            state.touch(id);
            return;
        }

        if state.map.len() >= self.capacity {
            if let Some(evicted) = state.evict_min() {
                trace!(
                    capacity = self.capacity,
                    frequency = evicted.meta.count,
                    "LFU evicted least frequently used entry"
                );
            }
        }

        let meta = Frequency {
            count: 1,
            position: 0,
        };
        let id = state.entries.insert(Entry::new(key.clone(), value, meta));
        state.map.insert(key, id);
        state.push(id);
    }

    fn remove(&self, key: &K) {
        let mut state = self.state.lock();
        if let Some(&id) = state.map.get(key) {
            state.remove_entry(id);
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
        EvictionPolicy::Lfu
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::CacheError;

    #[test]
    fn test_lfu_new() {
        let cache: LfuCache<&str, i32> = LfuCache::new(4).unwrap();
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 4);
        assert_eq!(cache.min_frequency(), None);
    }

    #[test]
    fn test_lfu_zero_capacity_rejected() {
        assert!(matches!(
            LfuCache::<u8, u8>::new(0),
            Err(CacheError::InvalidCapacity(0))
        ));
    }

    #[test]
    fn test_lfu_frequency_example() {
        let cache = LfuCache::new(2).unwrap();
        cache.put("x", 10);
        cache.put("y", 20);
        cache.get(&"x");

        assert_eq!(cache.frequency(&"x"), Some(2));
        assert_eq!(cache.frequency(&"y"), Some(1));

        cache.put("z", 30);
        assert!(cache.get(&"y").is_none());
        assert_eq!(cache.get(&"x").as_deref(), Some(&10));
        assert_eq!(cache.get(&"z").as_deref(), Some(&30));
        cache.debug_validate_invariants();
    }

    #[test]
    fn test_lfu_hits_and_overwrites_both_count() {
        let cache = LfuCache::new(3).unwrap();
        cache.put("a", 1);
        cache.put("a", 2);
        cache.get(&"a");

        assert_eq!(cache.frequency(&"a"), Some(3));
        assert_eq!(cache.get(&"a").as_deref(), Some(&2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_lfu_misses_do_not_count() {
        let cache = LfuCache::new(2).unwrap();
        cache.put("a", 1);
        cache.get(&"b");

        assert_eq!(cache.frequency(&"a"), Some(1));
        assert_eq!(cache.frequency(&"b"), None);
    }

    #[test]
    fn test_lfu_frequency_does_not_touch() {
        let cache = LfuCache::new(2).unwrap();
        cache.put("a", 1);
        cache.frequency(&"a");
        cache.frequency(&"a");

        assert_eq!(cache.frequency(&"a"), Some(1));
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_lfu_evicts_strict_minimum() {
        let cache = LfuCache::new(4).unwrap();
        for (key, hits) in [("a", 3), ("b", 0), ("c", 5), ("d", 1)] {
            cache.put(key, ());
            for _ in 0..hits {
                cache.get(&key);
            }
        }
        cache.debug_validate_invariants();
        assert_eq!(cache.min_frequency(), Some(1));

        cache.put("e", ());
        assert!(cache.get(&"b").is_none());
        cache.debug_validate_invariants();

        // "e" is now the only entry at 1 before this insert.
        cache.put("f", ());
        assert_eq!(cache.frequency(&"e"), None);
        assert_eq!(cache.frequency(&"d"), Some(2));
        cache.debug_validate_invariants();
    }

    #[test]
    fn test_lfu_new_entry_starts_at_one() {
        let cache = LfuCache::new(2).unwrap();
        cache.put("hot", 0);
        for _ in 0..10 {
            cache.get(&"hot");
        }
        cache.put("cold", 0);

        assert_eq!(cache.frequency(&"cold"), Some(1));
        assert_eq!(cache.min_frequency(), Some(1));
    }

    #[test]
    fn test_lfu_remove_keeps_heap_valid() {
        let cache = LfuCache::new(16).unwrap();
        for i in 0..16u32 {
            cache.put(i, i);
            for _ in 0..(i % 5) {
                cache.get(&i);
            }
        }
        cache.debug_validate_invariants();

        for i in [0u32, 7, 15, 3, 3, 100] {
            cache.remove(&i);
            cache.debug_validate_invariants();
        }

        assert_eq!(cache.len(), 12);
        assert!(cache.get(&7).is_none());
        assert_eq!(cache.get(&8).as_deref(), Some(&8));
    }

    #[test]
    fn test_lfu_remove_last_heap_slot() {
        let cache = LfuCache::new(3).unwrap();
        cache.put("a", 1);
        cache.put("b", 2);
        cache.get(&"a");
        cache.get(&"a");

        cache.remove(&"a");
        cache.remove(&"b");

        assert!(cache.is_empty());
        assert_eq!(cache.min_frequency(), None);
        cache.debug_validate_invariants();
    }

    #[test]
    fn test_lfu_churn_keeps_invariants() {
        let cache = LfuCache::new(8).unwrap();
        for i in 0..500u64 {
            cache.put(i % 23, i);
            cache.get(&(i % 7));
            if i % 11 == 0 {
                cache.remove(&(i % 13));
            }
            cache.debug_validate_invariants();
        }
        assert!(cache.len() <= 8);
    }

    #[test]
    fn test_lfu_clear() {
        let cache = LfuCache::new(2).unwrap();
        cache.put(1, "one");
        cache.get(&1);
        cache.clear();

        assert!(cache.is_empty());
        cache.put(1, "again");
        assert_eq!(cache.frequency(&1), Some(1));
        cache.debug_validate_invariants();
    }
}
