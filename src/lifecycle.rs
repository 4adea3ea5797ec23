//! Cache Lifecycle
//!
//! The public [`Cache`] handle: one lock around the entry store, optional snapshot
//! hydration at construction, the autosave task, and the close/drop sequence.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheKey, CacheStats, EntryStore};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::persistence;
use crate::tasks::Autosave;

/// Upper bound on how long `close` waits for the autosave task to finish.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

// == Shared State ==
/// State shared between the cache handle and the autosave task.
///
/// Every operation takes the store lock exactly once at its outermost call, so save
/// and load never need to re-enter it.
pub(crate) struct Shared<K: CacheKey> {
    store: Mutex<EntryStore<K>>,
    persist_path: Option<PathBuf>,
}

impl<K: CacheKey> Shared<K> {
    pub(crate) fn new(store: EntryStore<K>, persist_path: Option<PathBuf>) -> Self {
        Self {
            store: Mutex::new(store),
            persist_path,
        }
    }

    #[cfg(test)]
    pub(crate) fn store_for_test(&self) -> parking_lot::MutexGuard<'_, EntryStore<K>> {
        self.store.lock()
    }

    /// Writes the live entries to the snapshot file. Returns the number of records
    /// written; a no-op returning 0 without a configured path.
    pub(crate) fn save(&self) -> Result<usize> {
        let Some(path) = &self.persist_path else {
            return Ok(0);
        };

        let mut store = self.store.lock();
        let records = store.snapshot();
        persistence::write_snapshot(path, &records)?;

        debug!(path = %path.display(), records = records.len(), "Snapshot saved");
        Ok(records.len())
    }

    /// Replaces the store contents with the snapshot file. Returns the number of
    /// entries held afterwards; a no-op without a path or when the file is absent.
    pub(crate) fn load(&self) -> Result<usize> {
        let Some(path) = &self.persist_path else {
            return Ok(0);
        };

        let mut store = self.store.lock();
        let Some(records) = persistence::read_snapshot(path)? else {
            return Ok(0);
        };

        let read = records.len();
        let restored = store.restore(records);
        info!(path = %path.display(), read, restored, "Snapshot loaded");
        Ok(restored)
    }
}

// == Cache ==
/// Thread-safe LRU cache with per-entry TTL and optional snapshot persistence.
///
/// Share it between threads with `Arc<Cache<K>>`. Every operation blocks on a single
/// lock, so operations are totally ordered.
///
/// Call [`Cache::close`] for an orderly shutdown. If the cache is dropped without
/// being closed, the drop performs the same stop-and-save sequence, logging instead
/// of returning any save error.
///
/// # Example
/// ```rust,no_run
/// use lru_ttl_cache::{Cache, CacheConfig};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> lru_ttl_cache::Result<()> {
///     let config = CacheConfig::new(3)
///         .with_persist_path("cache.json")
///         .with_autosave_interval(Duration::from_secs(1));
///     let cache: Cache = Cache::open(config)?;
///
///     cache.set("a".to_string(), "value A", Some(Duration::from_secs(60)));
///     assert_eq!(cache.get(&"a".to_string())?, "value A");
///
///     cache.close().await
/// }
/// ```
pub struct Cache<K: CacheKey = String> {
    shared: Arc<Shared<K>>,
    autosave: Mutex<Option<Autosave>>,
    closed: AtomicBool,
}

impl<K: CacheKey> Cache<K> {
    // == Constructors ==
    /// Creates an in-memory cache without persistence.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::open(CacheConfig::new(capacity))
    }

    /// Creates a cache from a full configuration.
    ///
    /// With a `persist_path`, an existing snapshot is loaded first; an unreadable or
    /// malformed file fails construction instead of starting empty. Autosave starts
    /// when a path and a non-zero interval are set. It runs on the current tokio
    /// runtime, or on a dedicated background thread when there is none.
    pub fn open(config: CacheConfig) -> Result<Self> {
        let store = EntryStore::new(config.capacity, config.default_ttl)?;

        let shared = Arc::new(Shared::new(store, config.persist_path.clone()));
        shared.load()?;

        let autosave = if config.autosave_enabled() {
            let autosave = Autosave::start(Arc::clone(&shared), config.autosave_interval)
                .map_err(CacheError::AutosaveStart)?;
            Some(autosave)
        } else {
            None
        };

        info!(
            capacity = config.capacity,
            default_ttl = ?config.default_ttl,
            persist_path = ?config.persist_path,
            autosave = autosave.is_some(),
            "Cache opened"
        );

        Ok(Self {
            shared,
            autosave: Mutex::new(autosave),
            closed: AtomicBool::new(false),
        })
    }

    // == Entry Operations ==
    /// Inserts or replaces `key`. Without `ttl`, the configured default TTL applies.
    pub fn set(&self, key: K, value: impl Into<Value>, ttl: Option<Duration>) {
        self.shared.store.lock().set(key, value.into(), ttl);
    }

    /// Serializes `value` to JSON and stores it.
    ///
    /// Fails with [`CacheError::Serialization`] when the value has no JSON form
    /// (for example a map with non-string keys); the cache is left unchanged.
    pub fn set_json<T: Serialize + ?Sized>(
        &self,
        key: K,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.set(key, value, ttl);
        Ok(())
    }

    /// Returns the value for `key` and marks it most recently used.
    ///
    /// Fails with [`CacheError::NotFound`] for absent keys and [`CacheError::Expired`]
    /// for stale ones, which are removed by the call.
    pub fn get(&self, key: &K) -> Result<Value> {
        self.shared.store.lock().get(key)
    }

    /// Like [`Cache::get`], but returns `default` on a miss or expiry.
    pub fn get_or(&self, key: &K, default: impl Into<Value>) -> Value {
        self.get(key).unwrap_or_else(|_| default.into())
    }

    /// Like [`Cache::get`], deserializing the stored value into `T`.
    pub fn get_json<T: DeserializeOwned>(&self, key: &K) -> Result<T> {
        let value = self.get(key)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Removes `key` and returns its value. Misses behave like [`Cache::get`].
    pub fn pop(&self, key: &K) -> Result<Value> {
        self.shared.store.lock().pop(key)
    }

    /// Like [`Cache::pop`], but returns `default` on a miss or expiry.
    pub fn pop_or(&self, key: &K, default: impl Into<Value>) -> Value {
        self.pop(key).unwrap_or_else(|_| default.into())
    }

    /// True if `key` is present and live. Purges it if it is stale.
    pub fn contains(&self, key: &K) -> bool {
        self.shared.store.lock().contains(key)
    }

    /// Number of live entries, after purging every stale one.
    pub fn len(&self) -> usize {
        self.shared.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live keys, least recently used first. A fresh snapshot on every call.
    pub fn keys(&self) -> Vec<K> {
        self.shared.store.lock().keys()
    }

    /// Live key/value pairs, least recently used first. A fresh snapshot on every call.
    pub fn items(&self) -> Vec<(K, Value)> {
        self.shared.store.lock().items()
    }

    pub fn clear(&self) {
        self.shared.store.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.shared.store.lock().stats()
    }

    pub fn capacity(&self) -> usize {
        self.shared.store.lock().capacity()
    }

    pub fn persist_path(&self) -> Option<&Path> {
        self.shared.persist_path.as_deref()
    }

    // == Persistence ==
    /// Writes a snapshot of the live entries. No-op without a configured path.
    pub fn save(&self) -> Result<()> {
        self.shared.save().map(|_| ())
    }

    /// Replaces the contents with the snapshot file. No-op without a configured path
    /// or when the file does not exist.
    pub fn load(&self) -> Result<()> {
        self.shared.load().map(|_| ())
    }

    // == Close ==
    /// Stops autosave, waiting at most [`CLOSE_TIMEOUT`] for it, then performs a
    /// final save whose error is returned.
    ///
    /// Only the first call does anything. The cache stays usable afterwards, but is
    /// no longer saved automatically. The final save runs on the blocking pool, so
    /// the calling runtime keeps making progress while the snapshot is written.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let autosave = self.autosave.lock().take();
        if let Some(autosave) = autosave {
            if !autosave.stop(CLOSE_TIMEOUT).await {
                warn!(timeout = ?CLOSE_TIMEOUT, "Autosave task did not stop in time, continuing shutdown");
            }
        }

        let shared = Arc::clone(&self.shared);
        match tokio::task::spawn_blocking(move || shared.save()).await {
            Ok(result) => result?,
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        };
        info!("Cache closed");
        Ok(())
    }

    /// Synchronous [`Cache::close`] for callers outside of tokio. Same bounded wait
    /// and final save, performed on the calling thread.
    pub fn close_blocking(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let autosave = self.autosave.lock().take();
        if let Some(autosave) = autosave {
            if !autosave.stop_blocking(CLOSE_TIMEOUT) {
                warn!(timeout = ?CLOSE_TIMEOUT, "Autosave task did not stop in time, continuing shutdown");
            }
        }

        self.shared.save()?;
        info!("Cache closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl<K: CacheKey> Drop for Cache<K> {
    fn drop(&mut self) {
        if *self.closed.get_mut() {
            return;
        }

        // Dropping the handle signals the task without waiting for it
        drop(self.autosave.get_mut().take());

        if let Err(e) = self.shared.save() {
            error!(error = %e, "Final save on drop failed");
        }
    }
}

impl<K: CacheKey> fmt::Debug for Cache<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = self.shared.store.lock();
        f.debug_struct("Cache")
            .field("capacity", &store.capacity())
            .field("default_ttl", &store.default_ttl())
            .field("persist_path", &self.shared.persist_path)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_open_rejects_zero_capacity() {
        let result = Cache::<String>::new(0);
        assert!(matches!(result, Err(CacheError::InvalidCapacity(0))));
    }

    #[test]
    fn test_autosave_runs_without_runtime() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");

        // Default interval is enabled as soon as a path is set
        let default_config = CacheConfig::new(4).with_persist_path(&path);
        assert!(default_config.autosave_enabled());
        let cache: Cache = Cache::open(default_config).unwrap();
        cache.close_blocking().unwrap();

        let config = CacheConfig::new(4)
            .with_persist_path(&path)
            .with_autosave_interval(Duration::from_millis(20));
        let cache: Cache = Cache::open(config.clone()).unwrap();
        cache.set("a".to_string(), 1, None);

        std::thread::sleep(Duration::from_millis(200));
        let records: Vec<persistence::SnapshotRecord<String>> =
            persistence::read_snapshot(&path).unwrap().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, "a");

        cache.set("b".to_string(), 2, None);
        cache.close_blocking().unwrap();
        assert!(cache.is_closed());
        cache.close_blocking().unwrap();
        drop(cache);

        let reopened: Cache = Cache::open(config.with_autosave_interval(Duration::ZERO)).unwrap();
        assert_eq!(reopened.keys(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_drop_without_runtime_stops_autosave() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let config = CacheConfig::new(4)
            .with_persist_path(&path)
            .with_autosave_interval(Duration::from_millis(20));

        {
            let cache: Cache = Cache::open(config.clone()).unwrap();
            cache.set("a".to_string(), 1, None);
        }

        let reopened: Cache = Cache::open(config.with_autosave_interval(Duration::ZERO)).unwrap();
        assert_eq!(reopened.get(&"a".to_string()).unwrap(), json!(1));
    }

    #[test]
    fn test_get_or_and_pop_or_distinguish_empty_default() {
        let cache: Cache = Cache::new(4).unwrap();
        cache.set("empty".to_string(), "", None);

        // A stored empty value is a hit, not a reason to fall back
        assert_eq!(cache.get_or(&"empty".to_string(), "fallback"), json!(""));
        assert_eq!(cache.get_or(&"missing".to_string(), ""), json!(""));
        assert_eq!(cache.pop_or(&"missing".to_string(), Value::Null), Value::Null);
        assert!(cache.get(&"missing".to_string()).is_err());
    }

    #[test]
    fn test_set_json_rejects_unrepresentable_value() {
        let cache: Cache = Cache::new(4).unwrap();
        let mut bad = HashMap::new();
        bad.insert((1, 2), "tuple keys have no JSON form");

        let result = cache.set_json("bad".to_string(), &bad, None);

        assert!(matches!(result, Err(CacheError::Serialization(_))));
        assert!(!cache.contains(&"bad".to_string()));
    }

    #[test]
    fn test_set_json_and_get_json() {
        let cache: Cache = Cache::new(4).unwrap();
        cache
            .set_json("list".to_string(), &vec![1, 2, 3], None)
            .unwrap();

        let list: Vec<i32> = cache.get_json(&"list".to_string()).unwrap();
        assert_eq!(list, vec![1, 2, 3]);

        let wrong: Result<String> = cache.get_json(&"list".to_string());
        assert!(matches!(wrong, Err(CacheError::Serialization(_))));
    }

    #[test]
    fn test_drop_performs_final_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let config = CacheConfig::new(4)
            .with_persist_path(&path)
            .with_autosave_interval(Duration::ZERO);

        {
            let cache: Cache = Cache::open(config.clone()).unwrap();
            cache.set("a".to_string(), 1, None);
        }

        let reopened: Cache = Cache::open(config).unwrap();
        assert_eq!(reopened.get(&"a".to_string()).unwrap(), json!(1));
    }

    #[test]
    fn test_save_and_load_without_path_are_noops() {
        let cache: Cache = Cache::new(4).unwrap();
        cache.set("a".to_string(), 1, None);

        cache.save().unwrap();
        cache.load().unwrap();

        assert_eq!(cache.len(), 1);
        assert!(cache.persist_path().is_none());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let dir = tempdir().unwrap();
        let config = CacheConfig::new(4)
            .with_persist_path(dir.path().join("cache.json"))
            .with_autosave_interval(Duration::from_millis(50));
        let cache: Cache = Cache::open(config).unwrap();

        cache.close().await.unwrap();
        assert!(cache.is_closed());
        cache.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_final_save_does_not_block_runtime() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let config = CacheConfig::new(4)
            .with_persist_path(&path)
            .with_autosave_interval(Duration::ZERO);
        let cache: Cache = Cache::open(config).unwrap();
        cache.set("a".to_string(), 1, None);

        // Hold the store lock so the final save stalls until it is released
        let guard = cache.shared.store_for_test();
        let ticker = tokio::spawn(async {
            tokio::time::sleep(Duration::from_millis(20)).await;
        });

        let (close_result, ()) = tokio::join!(cache.close(), async {
            // Other tasks still run while close waits on the lock
            ticker.await.unwrap();
            drop(guard);
        });

        close_result.unwrap();
        let records: Vec<persistence::SnapshotRecord<String>> =
            persistence::read_snapshot(&path).unwrap().unwrap();
        assert_eq!(records.len(), 1);
    }
}
