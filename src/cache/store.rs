//! Cache Store Module
//!
//! Main cache engine combining the recency-ordered map with TTL expiration and
//! capacity-bound LRU eviction. Not synchronized; [`crate::Cache`] guards it.

use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::cache::{current_timestamp, CacheEntry, CacheStats, LruTracker};
use crate::error::{CacheError, Result};
use crate::persistence::SnapshotRecord;

/// Bounds every cache key must satisfy: hashable for lookup, serializable for
/// snapshots, and sendable to the autosave task.
pub trait CacheKey: Hash + Eq + Clone + Debug + Serialize + DeserializeOwned + Send + 'static {}

impl<T> CacheKey for T where T: Hash + Eq + Clone + Debug + Serialize + DeserializeOwned + Send + 'static {}

// == Entry Store ==
/// Cache storage with LRU eviction and TTL support.
#[derive(Debug)]
pub struct EntryStore<K: CacheKey> {
    /// Entries ordered from least to most recently used
    entries: LruTracker<K, CacheEntry>,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    capacity: usize,
    /// TTL for entries inserted without an explicit TTL
    default_ttl: Option<Duration>,
}

impl<K: CacheKey> EntryStore<K> {
    // == Constructor ==
    /// Creates a new EntryStore.
    ///
    /// Fails with [`CacheError::InvalidCapacity`] when `capacity` is zero.
    pub fn new(capacity: usize, default_ttl: Option<Duration>) -> Result<Self> {
        if capacity == 0 {
            return Err(CacheError::InvalidCapacity(capacity));
        }

        Ok(Self {
            entries: LruTracker::new(),
            stats: CacheStats::new(),
            capacity,
            default_ttl,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    // == Set ==
    /// Stores a key-value pair with optional TTL.
    ///
    /// An existing key is re-inserted at the most recently used position with both
    /// value and expiry replaced. Afterwards, least recently used entries are evicted
    /// one at a time until the store is within capacity, expired or not.
    pub fn set(&mut self, key: K, value: Value, ttl: Option<Duration>) {
        let entry = CacheEntry::new(value, ttl.or(self.default_ttl));
        self.entries.insert(key, entry);
        self.evict_if_needed();
    }

    // == Get ==
    /// Retrieves a value by key and marks it most recently used.
    ///
    /// A stale entry is removed on the spot and reported as [`CacheError::Expired`].
    pub fn get(&mut self, key: &K) -> Result<Value> {
        self.check_live(key)?;
        self.stats.record_hit();

        self.entries
            .touch(key)
            .map(|entry| entry.value.clone())
            .ok_or_else(|| CacheError::NotFound(describe(key)))
    }

    // == Pop ==
    /// Removes a live entry and returns its value. Misses behave like [`EntryStore::get`].
    pub fn pop(&mut self, key: &K) -> Result<Value> {
        self.check_live(key)?;
        self.stats.record_hit();

        self.entries
            .remove(key)
            .map(|entry| entry.value)
            .ok_or_else(|| CacheError::NotFound(describe(key)))
    }

    // == Contains ==
    /// True if the key is present and live. A stale entry is purged as a side effect.
    ///
    /// Does not change recency and does not count as a hit or miss.
    pub fn contains(&mut self, key: &K) -> bool {
        match self.entries.peek(key).map(CacheEntry::is_expired) {
            None => false,
            Some(true) => {
                self.expire(key);
                false
            }
            Some(false) => true,
        }
    }

    // == Length ==
    /// Purges every stale entry, then returns the live count.
    pub fn len(&mut self) -> usize {
        self.purge_expired();
        self.entries.len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    // == Keys / Items ==
    /// Live keys, least recently used first, taken after a full purge.
    pub fn keys(&mut self) -> Vec<K> {
        self.purge_expired();
        self.entries
            .iter_oldest_first()
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Live key/value pairs, least recently used first, taken after a full purge.
    pub fn items(&mut self) -> Vec<(K, Value)> {
        self.purge_expired();
        self.entries
            .iter_oldest_first()
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    // == Purge Expired ==
    /// Removes all expired entries from the store.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = current_timestamp();
        let expired_keys: Vec<K> = self
            .entries
            .iter_oldest_first()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();
        for key in &expired_keys {
            self.entries.remove(key);
        }

        if count > 0 {
            self.stats.record_expirations(count);
            debug!(count, "Purged expired entries");
        }
        count
    }

    // == Snapshot ==
    /// Builds snapshot records for every live entry, least recently used first.
    pub fn snapshot(&mut self) -> Vec<SnapshotRecord<K>> {
        self.purge_expired();
        let now = current_timestamp();

        self.entries
            .iter_oldest_first()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, entry)| SnapshotRecord {
                key: key.clone(),
                value: entry.value.clone(),
                expire_at: entry.expire_at,
            })
            .collect()
    }

    // == Restore ==
    /// Replaces the store contents with the live records of a snapshot.
    ///
    /// File order becomes the initial recency order. Stale records are dropped, then
    /// eviction runs once so the store fits the current capacity.
    ///
    /// Returns the number of entries held afterwards.
    pub fn restore(&mut self, records: Vec<SnapshotRecord<K>>) -> usize {
        self.entries.clear();
        let now = current_timestamp();

        for record in records {
            let entry = CacheEntry::with_expiry(record.value, record.expire_at);
            if entry.is_expired_at(now) {
                continue;
            }
            self.entries.insert(record.key, entry);
        }

        self.evict_if_needed();
        self.entries.len()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.entries.len();
        stats
    }

    fn evict_if_needed(&mut self) {
        while self.entries.len() > self.capacity {
            match self.entries.evict_oldest() {
                Some((key, _)) => {
                    self.stats.record_eviction();
                    debug!(key = ?key, "Evicted least recently used entry");
                }
                None => break,
            }
        }
    }

    /// Lazy expiry for a single key: fails for absent keys, and purges then fails
    /// for stale ones. Misses are recorded here.
    fn check_live(&mut self, key: &K) -> Result<()> {
        match self.entries.peek(key).map(CacheEntry::is_expired) {
            None => {
                self.stats.record_miss();
                Err(CacheError::NotFound(describe(key)))
            }
            Some(true) => {
                self.expire(key);
                self.stats.record_miss();
                Err(CacheError::Expired(describe(key)))
            }
            Some(false) => Ok(()),
        }
    }

    fn expire(&mut self, key: &K) {
        if self.entries.remove(key).is_some() {
            self.stats.record_expirations(1);
        }
    }
}

fn describe<K: Debug>(key: &K) -> String {
    format!("{key:?}")
}
