//! Relationship caches.
//!
//! Three concurrent maps remember how to reach users who are not mutual
//! contacts, plus pending contact requests:
//!
//! | Map | Key | Value |
//! |-----|-----|-------|
//! | `friend_requests` | requester | approval token |
//! | `temp_sessions` | peer | group the session was opened through |
//! | `one_way` | peer | (presence only) |
//!
//! Entries are never evicted; a later store for the same key wins.

use std::hash::Hash;

use dashmap::DashMap;

/// A concurrent key-value cache with store/load/delete semantics.
#[derive(Debug)]
pub struct CacheMap<K: Eq + Hash, V> {
    inner: DashMap<K, V>,
}

impl<K: Eq + Hash, V> Default for CacheMap<K, V> {
    fn default() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V: Clone> CacheMap<K, V> {
    /// Stores `value` under `key`, returning the previous value.
    pub fn store(&self, key: K, value: V) -> Option<V> {
        self.inner.insert(key, value)
    }

    /// Returns a copy of the value stored under `key`.
    pub fn load(&self, key: &K) -> Option<V> {
        self.inner.get(key).map(|entry| entry.value().clone())
    }

    /// Removes and returns the value stored under `key`.
    pub fn delete(&self, key: &K) -> Option<V> {
        self.inner.remove(key).map(|(_, value)| value)
    }

    /// Returns `true` if `key` is present.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.contains_key(key)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// The relationship caches held by a bot.
#[derive(Debug, Default)]
pub struct RelationshipCache {
    /// Pending contact requests: requester → approval token.
    pub friend_requests: CacheMap<i64, String>,
    /// Temporary sessions: peer → group number.
    pub temp_sessions: CacheMap<i64, i64>,
    /// Peers reachable through a one-way relationship.
    pub one_way: CacheMap<i64, ()>,
}

impl RelationshipCache {
    /// Creates empty caches.
    pub fn new() -> Self {
        Self::default()
    }
}
