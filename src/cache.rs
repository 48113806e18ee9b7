//! Thread-safe cache: an [`LruCore`] behind a single lock.
//!
//! `Cache<K, V>` is what [`crate::group::Group`] actually stores entries in.
//! Every operation takes the lock for the duration of the `LruCore` call and
//! releases it immediately after — the lock is never held across a loader
//! call, a peer fetch, or any other user-supplied callback, so a slow or
//! blocking loader can't stall unrelated cache traffic.

use crate::lru::{EvictCallback, LruCore};
use parking_lot::Mutex;
use std::borrow::Borrow;
use std::hash::Hash;

/// A bounded, lazily-expiring cache safe to share across threads.
pub struct Cache<K, V> {
    inner: Mutex<LruCore<K, V>>,
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Creates a cache with no eviction callback. `max_entries == 0` means
    /// unbounded.
    pub fn new(max_entries: usize) -> Self {
        Cache {
            inner: Mutex::new(LruCore::new(max_entries)),
        }
    }

    /// Creates a cache with an eviction callback invoked, under the lock,
    /// whenever an entry leaves for any reason (capacity, overwrite,
    /// explicit removal, clear, or lazy expiration).
    pub fn with_evict(max_entries: usize, on_evict: Option<EvictCallback<K, V>>) -> Self {
        Cache {
            inner: Mutex::new(LruCore::with_evict(max_entries, on_evict)),
        }
    }

    /// Adds or overwrites `key` with an absolute expiration (`0` = never).
    pub fn add(&self, key: K, value: V, expires: u64) {
        self.inner.lock().add(key, value, expires);
    }

    /// Looks up `key`, cloning out the value so the lock need not be held
    /// by the caller afterward.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        self.inner.lock().get(key).cloned()
    }

    /// Removes `key` if present.
    pub fn remove<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.lock().remove(key);
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl<K, V> std::fmt::Debug for Cache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn add_and_get_roundtrip() {
        let c = Cache::new(10);
        c.add("a", 1, 0);
        assert_eq!(c.get("a"), Some(1));
        assert_eq!(c.get("b"), None);
    }

    #[test]
    fn concurrent_callers_see_a_consistent_cache() {
        let cache = Arc::new(Cache::new(0));
        let mut handles = Vec::new();
        for i in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    cache.add(i * 100 + j, j, 0);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 800);
    }

    #[test]
    fn remove_and_clear() {
        let c = Cache::new(10);
        c.add("a", 1, 0);
        c.add("b", 2, 0);
        c.remove("a");
        assert_eq!(c.get("a"), None);
        c.clear();
        assert!(c.is_empty());
    }
}
