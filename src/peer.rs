//! Traits at the boundary between a [`crate::group::Group`] and the rest
//! of the cluster: loading a value locally, routing a key to a remote
//! peer, and fetching from that peer. None of these traits say anything
//! about wire formats or discovery — that's deliberately left to callers,
//! per the core's scope.

use crate::error::Error;

/// Loads a value for a key that isn't in the cache and wasn't found on
/// any peer. This is the single source of truth for a key's value.
pub trait Loader<K, V>: Send + Sync {
    /// Loads `key`, returning its value or the error that prevented
    /// loading it.
    fn load(&self, key: &K) -> Result<V, Error>;
}

impl<K, V, F> Loader<K, V> for F
where
    F: Fn(&K) -> Result<V, Error> + Send + Sync,
{
    fn load(&self, key: &K) -> Result<V, Error> {
        self(key)
    }
}

/// Routes a key to the peer responsible for it, if any peer other than
/// this process owns it.
pub trait Picker<K, V>: Send + Sync {
    /// Picks the peer that owns `key`. Returns `None` if there are no
    /// peers, or if this process itself owns the key.
    fn pick(&self, key: &K) -> Option<std::sync::Arc<dyn Fetcher<K, V>>>;
}

/// Fetches a key's value from a specific remote peer.
pub trait Fetcher<K, V>: Send + Sync {
    /// Fetches `key` from this peer on behalf of the named group.
    fn fetch(&self, group: &str, key: &K) -> Result<V, Error>;
}

/// An event describing a peer joining or leaving the cluster, as reported
/// by whatever discovery mechanism the caller wires up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent<P> {
    /// A peer became reachable and should be added to routing.
    Added(P),
    /// A peer became unreachable and should be removed from routing.
    Removed(P),
}
