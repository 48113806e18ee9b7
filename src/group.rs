//! A named cache group: the piece that ties a cache, a loader, a peer
//! picker, and single-flight coalescing together into one `get`.
//!
//! The resolution order on a miss is: ask single-flight to coalesce
//! concurrent misses for the key, then inside that try the peer picked
//! for the key (if any), falling through to the local loader if there is
//! no peer, no picker, or the peer fetch fails. Only a *local* load
//! populates this process's cache — a value fetched from a peer is
//! already cached on the peer that owns it, and caching it here too would
//! defeat the point of routing by key.

use crate::cache::Cache;
use crate::entry::now;
use crate::error::Error;
use crate::peer::{Loader, Picker};
use crate::singleflight::SingleFlight;
use parking_lot::RwLock;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// A cache group: a name, a loader of last resort, a bounded cache, and
/// an optional peer picker for distributed lookups.
pub struct Group<K, V> {
    name: String,
    loader: Arc<dyn Loader<K, V>>,
    cache: Cache<K, V>,
    peers: RwLock<Option<Arc<dyn Picker<K, V>>>>,
    flight: SingleFlight<K, V, Error>,
    ttl: Duration,
}

impl<K, V> Group<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a group and registers it under `name` in the process-wide
    /// [`crate::registry::global`]. `max_entries == 0` means an unbounded
    /// cache. `ttl` is applied to every value this process loads locally;
    /// `Duration::ZERO` means entries never expire.
    pub fn new(
        name: impl Into<String>,
        max_entries: usize,
        ttl: Duration,
        loader: Arc<dyn Loader<K, V>>,
    ) -> Arc<Self> {
        let group = Arc::new(Self::new_unregistered(name, max_entries, ttl, loader));
        crate::registry::global().register(Arc::clone(&group));
        group
    }

    /// Creates a group without registering it anywhere. Useful for tests
    /// or callers managing their own registry via [`crate::registry::Registry`].
    pub fn new_unregistered(
        name: impl Into<String>,
        max_entries: usize,
        ttl: Duration,
        loader: Arc<dyn Loader<K, V>>,
    ) -> Self {
        Group {
            name: name.into(),
            loader,
            cache: Cache::new(max_entries),
            peers: RwLock::new(None),
            flight: SingleFlight::new(),
            ttl,
        }
    }

    /// The group's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers the peer picker used for routing misses to remote
    /// owners. A group with no picker (or one that was never called)
    /// always falls through to the local loader. Calling this more than
    /// once is a logged no-op — the first picker wins.
    pub fn register_server(&self, picker: Arc<dyn Picker<K, V>>) {
        let mut slot = self.peers.write();
        if slot.is_some() {
            error!(group = %self.name, "register_server called more than once");
            return;
        }
        *slot = Some(picker);
    }

    /// Gets `key`, consulting the cache first, then coalescing concurrent
    /// misses through the peer picker and local loader.
    pub fn get(&self, key: K) -> Result<V, Error> {
        if let Some(value) = self.cache.get(&key) {
            debug!(group = %self.name, "cache hit");
            return Ok(value);
        }
        self.load(key)
    }

    fn load(&self, key: K) -> Result<V, Error> {
        let result = self.flight.do_call(key.clone(), || self.resolve_miss(&key));
        if let Err(err) = &result {
            debug!(group = %self.name, error = %err, "load failed");
        }
        result
    }

    fn resolve_miss(&self, key: &K) -> Result<V, Error> {
        let picker = self.peers.read().clone();
        if let Some(picker) = picker {
            if let Some(peer) = picker.pick(key) {
                match peer.fetch(&self.name, key) {
                    Ok(value) => return Ok(value),
                    Err(err) => {
                        warn!(group = %self.name, error = %err, "peer fetch failed, falling back to local load");
                    }
                }
            }
        }
        self.get_locally(key)
    }

    fn get_locally(&self, key: &K) -> Result<V, Error> {
        let value = self.loader.load(key)?;
        self.populate_cache(key.clone(), value.clone());
        Ok(value)
    }

    fn populate_cache(&self, key: K, value: V) {
        let expires = if self.ttl.is_zero() {
            0
        } else {
            now() + self.ttl.as_nanos() as u64
        };
        self.cache.add(key, value, expires);
    }

    /// Number of entries currently cached locally.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether the local cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl<K, V> std::fmt::Debug for Group<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("len", &self.len())
            .finish()
    }
}
