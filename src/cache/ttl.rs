//! TTL Engine Module
//!
//! Time-to-live expiration over a flat key/entry map.
//!
//! Expiration is lazy: an entry older than the configured duration is only
//! removed when a `get` observes it. When a new key arrives at capacity the
//! entry with the oldest write timestamp is evicted, expired or not.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::cache::{Cache, CacheStats, Clock, Entry, SystemClock};
use crate::config::EvictionPolicy;
use crate::error::{check_capacity, CacheError, Result};

/// TTL entries carry their last write time.
type TtlEntry<K, V> = Entry<K, V, Instant>;

#[derive(Debug)]
struct TtlState<K, V> {
    map: HashMap<K, TtlEntry<K, V>>,
    stats: CacheStats,
}

// == TTL Cache ==
/// A cache whose entries expire a fixed duration after they were written.
///
/// Every `put` stamps the entry with the current time, including overwrites
/// of an existing key, so a write restarts the entry's clock. Reads never
/// extend an entry's life. An entry is expired once strictly more than
/// `expiration` has elapsed since its last write.
#[derive(Debug)]
pub struct TtlCache<K, V, C = SystemClock> {
    state: Mutex<TtlState<K, V>>,
    capacity: usize,
    expiration: Duration,
    clock: C,
}

impl<K, V> TtlCache<K, V, SystemClock>
where
    K: Eq + Hash + Clone,
{
    // == Constructor ==
    /// Creates a TTL cache on the system clock.
    ///
    /// # Errors
    /// - [`CacheError::InvalidCapacity`] when `capacity` is zero
    /// - [`CacheError::InvalidExpiration`] when `expiration` is zero
    pub fn new(capacity: usize, expiration: Duration) -> Result<Self> {
        Self::with_clock(capacity, expiration, SystemClock)
    }
}

impl<K, V, C> TtlCache<K, V, C>
where
    K: Eq + Hash + Clone,
    C: Clock,
{
    /// Creates a TTL cache reading time from `clock`.
    pub fn with_clock(capacity: usize, expiration: Duration, clock: C) -> Result<Self> {
        let capacity = check_capacity(capacity)?;
        if expiration.is_zero() {
            return Err(CacheError::InvalidExpiration(expiration));
        }
        debug!(capacity, ?expiration, "Created TTL cache");

        Ok(Self {
            state: Mutex::new(TtlState {
                map: HashMap::with_capacity(capacity),
                stats: CacheStats::new(),
            }),
            capacity,
            expiration,
            clock,
        })
    }

    /// The fixed lifetime shared by all entries.
    pub fn expiration(&self) -> Duration {
        self.expiration
    }

    /// Remaining lifetime of a key, or `None` if it is absent or expired.
    ///
    /// Does not count as an access and does not remove expired entries.
    pub fn ttl_remaining(&self, key: &K) -> Option<Duration> {
        let now = self.clock.now();
        let state = self.state.lock();
        let age = now.saturating_duration_since(state.map.get(key)?.meta);
        if age > self.expiration {
            None
        } else {
            Some(self.expiration - age)
        }
    }

    fn is_expired(&self, written_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(written_at) > self.expiration
    }

    /// Validates internal invariants. Available in debug/test builds.
    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        let state = self.state.lock();
        assert!(state.map.len() <= self.capacity, "len exceeds capacity");
        for (key, entry) in &state.map {
            assert!(*key == entry.key, "entry stored under a different key");
        }
    }
}

impl<K, V> TtlState<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Evicts the entry with the oldest write timestamp (linear scan).
    fn evict_oldest(&mut self) -> Option<TtlEntry<K, V>> {
        let oldest = self
            .map
            .values()
            .min_by_key(|entry| entry.meta)
            .map(|entry| entry.key.clone())?;

        let entry = self.map.remove(&oldest)?;
        self.stats.record_eviction();
        Some(entry)
    }
}

impl<K, V, C> Cache<K, V> for TtlCache<K, V, C>
where
    K: Eq + Hash + Clone + Send,
    V: Send + Sync,
    C: Clock,
{
    fn get(&self, key: &K) -> Option<Arc<V>> {
        let now = self.clock.now();
        let mut state = self.state.lock();

        let Some(entry) = state.map.get(key) else {
            state.stats.record_miss();
            return None;
        };

        if self.is_expired(entry.meta, now) {
            state.map.remove(key);
            state.stats.record_expiration();
            state.stats.record_miss();
            trace!(expiration = ?self.expiration, "TTL entry expired on read");
            return None;
        }

        let value = entry.value_handle();
        state.stats.record_hit();
        Some(value)
    }

    fn put(&self, key: K, value: V) {
        let now = self.clock.now();
        let mut state = self.state.lock();

        if let Some(entry) = state.map.get_mut(&key) {
            entry.replace_value(value);
            entry.meta = now;
            return;
        }

        if state.map.len() >= self.capacity && state.evict_oldest().is_some() {
            trace!(capacity = self.capacity, "TTL evicted oldest entry");
        }

        state.map.insert(key.clone(), Entry::new(key, value, now));
    }

    fn remove(&self, key: &K) {
        self.state.lock().map.remove(key);
    }

    fn len(&self) -> usize {
        self.state.lock().map.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn clear(&self) {
        self.state.lock().map.clear();
    }

    fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        state.stats.snapshot(state.map.len())
    }

    fn policy(&self) -> EvictionPolicy {
        EvictionPolicy::Ttl
    }
}
