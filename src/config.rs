//! Configuration Module
//!
//! Describes which engine to build and with what bounds. Nothing is read
//! from the environment; a host application can embed [`CacheConfig`] in its
//! own serde-loaded settings and hand it to [`CacheConfig::build`].

use std::fmt;
use std::hash::Hash;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{Cache, LfuCache, LruCache, TtlCache};
use crate::error::{check_capacity, CacheError, Result};

/// Default number of entries when none is configured.
pub const DEFAULT_CAPACITY: usize = 1000;

// == Eviction Policy ==
/// The eviction engines available behind [`Cache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Least recently used
    #[default]
    Lru,
    /// Least frequently used
    Lfu,
    /// Fixed time-to-live, oldest write evicted under capacity pressure
    Ttl,
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EvictionPolicy::Lru => "lru",
            EvictionPolicy::Lfu => "lfu",
            EvictionPolicy::Ttl => "ttl",
        };
        f.write_str(name)
    }
}

// == Cache Config ==
/// Construction parameters for a cache instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Which engine to build
    pub policy: EvictionPolicy,
    /// Maximum number of entries the cache can hold
    pub capacity: usize,
    /// Entry lifetime, required by the TTL policy and ignored by the others
    pub expiration: Option<Duration>,
}

impl CacheConfig {
    pub fn lru(capacity: usize) -> Self {
        Self {
            policy: EvictionPolicy::Lru,
            capacity,
            expiration: None,
        }
    }

    pub fn lfu(capacity: usize) -> Self {
        Self {
            policy: EvictionPolicy::Lfu,
            capacity,
            expiration: None,
        }
    }

    pub fn ttl(capacity: usize, expiration: Duration) -> Self {
        Self {
            policy: EvictionPolicy::Ttl,
            capacity,
            expiration: Some(expiration),
        }
    }

    /// Checks the configuration without building anything.
    ///
    /// # Errors
    /// - [`CacheError::InvalidCapacity`] when `capacity` is zero
    /// - [`CacheError::MissingExpiration`] for TTL without an expiration
    /// - [`CacheError::InvalidExpiration`] for TTL with a zero expiration
    pub fn validate(&self) -> Result<()> {
        check_capacity(self.capacity)?;
        if self.policy == EvictionPolicy::Ttl {
            match self.expiration {
                None => return Err(CacheError::MissingExpiration),
                Some(expiration) if expiration.is_zero() => {
                    return Err(CacheError::InvalidExpiration(expiration))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Builds the configured engine behind the shared contract.
    pub fn build<K, V>(&self) -> Result<Box<dyn Cache<K, V>>>
    where
        K: Eq + Hash + Clone + Send + 'static,
        V: Send + Sync + 'static,
    {
        self.validate()?;
        let cache: Box<dyn Cache<K, V>> = match self.policy {
            EvictionPolicy::Lru => Box::new(LruCache::new(self.capacity)?),
            EvictionPolicy::Lfu => Box::new(LfuCache::new(self.capacity)?),
            EvictionPolicy::Ttl => {
                let expiration = self.expiration.ok_or(CacheError::MissingExpiration)?;
                Box::new(TtlCache::new(self.capacity, expiration)?)
            }
        };
        Ok(cache)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::lru(DEFAULT_CAPACITY)
    }
}
