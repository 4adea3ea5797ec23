//! LRU Tracker Module
//!
//! Order-preserving map used as the entry store: O(1) lookup, move-to-tail and
//! removal of the least recently used element.

use std::hash::Hash;

use lru::LruCache;

// == LRU Tracker ==
/// Keyed storage that remembers recency of insertion and access.
///
/// - Head = least recently used
/// - Tail = most recently used
///
/// The underlying `lru::LruCache` is unbounded; capacity is enforced by the owning
/// store one eviction at a time.
#[derive(Debug)]
pub struct LruTracker<K: Hash + Eq, V> {
    order: LruCache<K, V>,
}

impl<K: Hash + Eq, V> LruTracker<K, V> {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self {
            order: LruCache::unbounded(),
        }
    }

    // == Insert ==
    /// Inserts a value at the tail.
    ///
    /// An existing key is removed from its position first, then re-inserted, so the
    /// old value is replaced and the key becomes most recently used.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let previous = self.order.pop(&key);
        self.order.put(key, value);
        previous
    }

    // == Touch ==
    /// Marks a key as recently used (moves to tail) and returns its value.
    pub fn touch(&mut self, key: &K) -> Option<&V> {
        self.order.get(key)
    }

    // == Peek ==
    /// Returns the value without changing recency.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.order.peek(key)
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.order.pop(key)
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used entry.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<(K, V)> {
        self.order.pop_lru()
    }

    /// Iterates from least to most recently used.
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = (&K, &V)> {
        self.order.iter().rev()
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    // == Contains ==
    /// Checks if a key is being tracked, without touching it.
    pub fn contains(&self, key: &K) -> bool {
        self.order.contains(key)
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }
}

impl<K: Hash + Eq, V> Default for LruTracker<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
