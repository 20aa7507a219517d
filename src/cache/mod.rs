//! Cache Module
//!
//! Eviction engines behind the shared [`Cache`] contract: LRU (recency list),
//! LFU (frequency min-heap) and TTL (lazy expiration).

mod clock;
mod entry;
mod lfu;
mod lru;
mod slots;
mod stats;
mod traits;
mod ttl;


// Re-export public types
pub use clock::{Clock, MockClock, SystemClock};
pub use entry::Entry;
pub use lfu::LfuCache;
pub use lru::LruCache;
pub use stats::CacheStats;
pub use traits::Cache;
pub use ttl::TtlCache;
