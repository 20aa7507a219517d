//! Cache Entry Module
//!
//! Defines the unit of storage shared by every eviction engine.

use std::sync::Arc;

// == Cache Entry ==
/// A single live key with its value and policy-specific metadata.
///
/// The value is held behind an `Arc` so that reads hand out the same handle
/// the caller stored; the cache never inspects or clones the value itself.
/// `M` carries what the owning engine needs to order the entry: a list link
/// for LRU, a frequency counter and heap position for LFU, a write timestamp
/// for TTL.
#[derive(Debug)]
pub struct Entry<K, V, M> {
    /// The key this entry is stored under
    pub key: K,
    /// The stored value
    pub value: Arc<V>,
    /// Engine-owned bookkeeping
    pub meta: M,
}

impl<K, V, M> Entry<K, V, M> {
    // == Constructor ==
    /// Creates a new entry, taking ownership of the value.
    pub fn new(key: K, value: V, meta: M) -> Self {
        Self {
            key,
            value: Arc::new(value),
            meta,
        }
    }

    /// Replaces the stored value, dropping this entry's handle to the old one.
    pub fn replace_value(&mut self, value: V) {
        self.value = Arc::new(value);
    }

    /// Returns a new handle to the stored value.
    pub fn value_handle(&self) -> Arc<V> {
        Arc::clone(&self.value)
    }
}
