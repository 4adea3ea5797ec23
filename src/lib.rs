//! LRU TTL Cache - an embeddable in-memory key/value cache
//!
//! Bounded capacity with least-recently-used eviction, per-entry TTL expiration,
//! and optional JSON snapshot persistence with background autosave.

pub mod cache;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod persistence;
mod tasks;

pub use cache::{CacheKey, CacheStats};
pub use config::CacheConfig;
pub use error::{CacheError, PersistenceError, Result};
pub use lifecycle::{Cache, CLOSE_TIMEOUT};
pub use persistence::SnapshotRecord;
