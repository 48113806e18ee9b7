//! Least Recently Used (LRU) cache core with per-entry expiration.
//!
//! `LruCore` is a bounded key→entry index over a [`crate::list::List`]. It
//! is the single-threaded building block that [`crate::cache::Cache`] wraps
//! in a lock for concurrent use; nothing in this module is safe to share
//! across threads without external synchronization.
//!
//! Expiration is lazy: expired entries are only reclaimed when touched by
//! [`LruCore::get`]. `max_entries == 0` means unbounded — the caller is
//! responsible for eviction in that mode, matching the original
//! `maxEntries` convention this design is based on.

use crate::list::{List, NodePtr};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::mem;

/// Callback invoked whenever an entry leaves the cache: capacity
/// eviction, overwrite, explicit `remove`, `clear`, or lazy expiration.
/// Invoked while the cache's lock (if any) is held — it must not block
/// and must not re-enter the cache.
pub type EvictCallback<K, V> = Box<dyn FnMut(K, V) + Send>;

/// A bounded, lazily-expiring LRU index.
pub struct LruCore<K, V> {
    max_entries: usize,
    list: List<K, V>,
    map: HashMap<K, NodePtr<K, V>>,
    on_evict: Option<EvictCallback<K, V>>,
}

impl<K, V> LruCore<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Creates an LRU core with no eviction callback. `max_entries == 0`
    /// means unbounded.
    pub fn new(max_entries: usize) -> Self {
        Self::with_evict(max_entries, None)
    }

    /// Creates an LRU core with an optional eviction callback.
    pub fn with_evict(max_entries: usize, on_evict: Option<EvictCallback<K, V>>) -> Self {
        LruCore {
            max_entries,
            list: List::new(),
            map: HashMap::new(),
            on_evict,
        }
    }

    /// Number of live entries (including ones that have expired but not
    /// yet been touched by `get`).
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Adds or overwrites `key`. If `key` is already present, the evict
    /// callback fires for the *existing* (key, value) before it is
    /// replaced — this is invoked on overwrite, not just eviction. The
    /// entry is then moved to the front with the new value and
    /// expiration. If absent, a new entry is inserted at the front. In
    /// either case, if `max_entries > 0` and the index now exceeds it,
    /// the tail-most entry is evicted.
    pub fn add(&mut self, key: K, value: V, expires: u64) {
        if let Some(&node) = self.map.get(&key) {
            // SAFETY: `node` came from `self.map` and is still linked in;
            // entries are only unlinked together with their map entry.
            let old_value = unsafe {
                let entry = self.list.entry_mut(node);
                mem::replace(entry.value_mut(), value)
            };
            self.fire_evict(key.clone(), old_value);
            // SAFETY: `node` is still linked in.
            unsafe {
                self.list.move_to_front(node);
                self.list.entry_mut(node).set_expires(expires);
            }
            self.enforce_capacity();
            return;
        }

        let node = self.list.insert(key.clone(), value, expires);
        self.map.insert(key, node);
        self.enforce_capacity();
    }

    /// Looks up `key`. Absent keys return `None`. A present-but-expired
    /// entry is removed (firing the evict callback) and `None` is
    /// returned. Otherwise the entry is moved to the front and its value
    /// returned.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let node = *self.map.get(key)?;
        // SAFETY: `node` came from `self.map` and is still linked in.
        if unsafe { self.list.entry(node).expired() } {
            let (k, v) = self.remove_node(node);
            self.fire_evict(k, v);
            return None;
        }
        // SAFETY: `node` is still linked in.
        unsafe {
            self.list.move_to_front(node);
            Some(self.list.entry(node).value())
        }
    }

    /// Removes `key` if present, firing the evict callback.
    pub fn remove<Q>(&mut self, key: &Q)
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        if let Some(&node) = self.map.get(key) {
            let (k, v) = self.remove_node(node);
            self.fire_evict(k, v);
        }
    }

    /// Removes the tail-most (least recently used) entry, if any, firing
    /// the evict callback.
    pub fn remove_oldest(&mut self) {
        if let Some(node) = self.list.back() {
            let (k, v) = self.remove_node(node);
            self.fire_evict(k, v);
        }
    }

    /// Drops every entry, firing the evict callback for each one.
    pub fn clear(&mut self) {
        let entries = self.list.drain();
        self.map.clear();
        for entry in entries {
            let (k, v) = entry.into_parts();
            self.fire_evict(k, v);
        }
    }

    fn enforce_capacity(&mut self) {
        if self.max_entries != 0 && self.map.len() > self.max_entries {
            self.remove_oldest();
        }
    }

    /// Unlinks `node` from both the list and the map, returning its
    /// owned key/value. Does not fire the evict callback — callers do
    /// that so they control ordering relative to other side effects.
    fn remove_node(&mut self, node: NodePtr<K, V>) -> (K, V) {
        // SAFETY: every live `NodePtr` handed out by this type is still
        // linked into `self.list` until removed here, and this is the
        // only place nodes are removed.
        let entry = unsafe { self.list.remove(node) };
        let (k, v) = entry.into_parts();
        self.map.remove(&k);
        (k, v)
    }

    fn fire_evict(&mut self, key: K, value: V) {
        if let Some(cb) = &mut self.on_evict {
            cb(key, value);
        }
    }
}

impl<K, V> std::fmt::Debug for LruCore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruCore")
            .field("max_entries", &self.max_entries)
            .field("len", &self.map.len())
            .finish()
    }
}

// SAFETY: `LruCore` owns every node its map points into exclusively
// through `self.list`; no shared aliasing of a `NodePtr` escapes this
// type. Send follows K, V being Send, matching `List`'s own impl.
unsafe impl<K: Send, V: Send> Send for LruCore<K, V> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::now;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[test]
    fn capacity_overflow_evicts_the_least_recently_used_key() {
        let mut c = LruCore::new(2);
        c.add("key1", "1234", 0);
        c.add("key2", "12", 0);
        assert_eq!(c.get("key1"), Some(&"1234"));
        c.add("key3", "14", 0);

        assert_eq!(c.get("key2"), None);
        assert_eq!(c.get("key1"), Some(&"1234"));
        assert_eq!(c.get("key3"), Some(&"14"));
    }

    #[test]
    fn lazy_expiration_reclaims_on_get() {
        // expirations set in the past up front, instead of a real sleep.
        let mut c = LruCore::new(100);
        let past = now().saturating_sub(Duration::from_secs(1).as_nanos() as u64);
        c.add("k1", "v1", past);
        c.add("k2", "v2", past);
        c.add("k3", "v3", past);
        c.add("k4", "v4", 0);

        assert_eq!(c.get("k1"), None);
        assert_eq!(c.get("k2"), None);
        assert_eq!(c.get("k3"), None);
        assert_eq!(c.get("k4"), Some(&"v4"));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn evict_callback_fires_on_overflow_and_overwrite() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = Arc::clone(&seen);
        let mut c = LruCore::with_evict(
            2,
            Some(Box::new(move |k, _v| seen_cb.lock().unwrap().push(k))),
        );
        c.add("key1", "123456", 0);
        c.add("k2", "k2", 0);
        c.add("k3", "k3", 0);
        c.add("k4", "k4", 0);

        assert_eq!(*seen.lock().unwrap(), vec!["key1", "k2"]);
    }

    #[test]
    fn overwrite_does_not_change_len_and_moves_to_front() {
        let mut c = LruCore::new(3);
        c.add("a", 1, 0);
        c.add("b", 2, 0);
        c.add("a", 10, 0);
        assert_eq!(c.len(), 2);
        c.add("c", 3, 0);
        c.add("d", 4, 0);
        // "b" was least-recently-touched after the overwrite of "a".
        assert_eq!(c.get("b"), None);
        assert_eq!(c.get("a"), Some(&10));
    }

    #[test]
    fn unbounded_when_max_entries_zero() {
        let mut c = LruCore::new(0);
        for i in 0..1000 {
            c.add(i, i, 0);
        }
        assert_eq!(c.len(), 1000);
    }

    #[test]
    fn clear_fires_callback_for_every_entry() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_cb = Arc::clone(&seen);
        let mut c = LruCore::with_evict(
            0,
            Some(Box::new(move |_k, _v| {
                seen_cb.fetch_add(1, Ordering::SeqCst);
            })),
        );
        for i in 0..5 {
            c.add(i, i, 0);
        }
        c.clear();
        assert_eq!(seen.load(Ordering::SeqCst), 5);
        assert_eq!(c.len(), 0);
    }
}
