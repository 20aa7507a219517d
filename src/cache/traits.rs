//! Cache Contract Module
//!
//! The polymorphic surface every eviction engine satisfies. Callers program
//! against [`Cache`] and pick the engine once, at construction.

use std::sync::Arc;

use crate::cache::CacheStats;
use crate::config::EvictionPolicy;

// == Cache Trait ==
/// A bounded, thread-safe key/value cache.
///
/// All methods take `&self`: each implementation serializes its operations
/// behind one internal lock, so a single instance can be shared across
/// threads through an `Arc`. Every operation is linearizable with respect to
/// the others on the same instance.
///
/// # Example
/// ```
/// use tricache::{Cache, LruCache};
///
/// let cache = LruCache::new(2).unwrap();
/// cache.put("a", 1);
/// cache.put("b", 2);
/// assert_eq!(cache.get(&"a").as_deref(), Some(&1));
///
/// cache.put("c", 3);
/// assert!(cache.get(&"b").is_none());
/// ```
pub trait Cache<K, V>: Send + Sync {
    /// Looks up a key.
    ///
    /// Returns a handle to the stored value on a hit and `None` on a miss.
    /// A hit counts as an access: LRU promotes the key, LFU bumps its
    /// frequency, and TTL drops the entry instead if it has expired.
    fn get(&self, key: &K) -> Option<Arc<V>>;

    /// Inserts or overwrites a key.
    ///
    /// Overwriting counts as an access and never evicts. Inserting a new key
    /// into a full cache evicts exactly one entry chosen by the policy first.
    fn put(&self, key: K, value: V);

    /// Deletes a key. Removing an absent key is a no-op.
    fn remove(&self, key: &K);

    /// Number of live entries, including TTL entries that have expired but
    /// not yet been observed.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries, fixed at construction.
    fn capacity(&self) -> usize;

    /// Drops every entry. Statistics are kept.
    fn clear(&self);

    /// Snapshot of the hit/miss/eviction counters.
    fn stats(&self) -> CacheStats;

    /// The eviction policy this engine implements.
    fn policy(&self) -> EvictionPolicy;
}
