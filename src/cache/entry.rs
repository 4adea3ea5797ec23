//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use chrono::Utc;
use serde_json::Value;

// == Cache Entry ==
/// Represents a single cache entry with value and absolute expiry.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Expiration timestamp (Unix seconds), None = no expiration
    pub expire_at: Option<f64>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry with optional TTL.
    ///
    /// A zero TTL yields an entry that is already stale on the next read.
    pub fn new(value: Value, ttl: Option<Duration>) -> Self {
        let expire_at = ttl.map(|ttl| current_timestamp() + ttl.as_secs_f64());
        Self { value, expire_at }
    }

    /// Rebuilds an entry from a persisted absolute expiry.
    pub fn with_expiry(value: Value, expire_at: Option<f64>) -> Self {
        Self { value, expire_at }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired once the current time is greater than
    /// or equal to the expiration time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp())
    }

    /// Same as [`CacheEntry::is_expired`] against a caller-supplied clock reading,
    /// so bulk scans use one consistent `now`.
    pub fn is_expired_at(&self, now: f64) -> bool {
        match self.expire_at {
            Some(expire_at) => expire_at <= now,
            None => false,
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in seconds with microsecond precision.
pub fn current_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
