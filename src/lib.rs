//! Tricache - an in-process key/value cache
//!
//! Provides interchangeable LRU, LFU and TTL eviction behind one thread-safe
//! [`Cache`] trait. Capacity is counted in entries and fixed at construction.

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{Cache, CacheStats, Clock, LfuCache, LruCache, MockClock, SystemClock, TtlCache};
pub use config::{CacheConfig, EvictionPolicy};
pub use error::{CacheError, Result};
