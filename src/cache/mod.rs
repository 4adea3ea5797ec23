//! Cache Module
//!
//! In-memory entry store with TTL expiration and LRU eviction.

mod entry;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use entry::{current_timestamp, CacheEntry};
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::{CacheKey, EntryStore};
