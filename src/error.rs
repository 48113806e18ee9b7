//! Error types shared across the cluster core.

use std::fmt;
use std::sync::Arc;

/// Errors produced by the cache, the group, and the pieces that compose
/// them.
///
/// `Clone` so that single-flight can hand the identical error back to
/// every waiter coalesced onto the same call, the same way it hands back
/// the identical value.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// The key was not found by any reachable loader or peer.
    #[error("key not found")]
    NotFound,

    /// A peer was picked for the key but could not be reached, and no
    /// local loader recovered the value either.
    #[error("peer unavailable: {0}")]
    PeerUnavailable(String),

    /// `get` was called against a group name that has no registered
    /// [`crate::group::Group`].
    #[error("unknown group: {0}")]
    UnknownGroup(String),

    /// A caller-facing request (e.g. over a server boundary) was
    /// malformed — missing group name, empty key, and the like.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The user-supplied loader failed.
    #[error("loader failed: {0}")]
    Loader(#[source] Arc<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wraps an arbitrary loader error.
    pub fn loader<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Loader(Arc::new(err))
    }

    /// Builds a [`Error::PeerUnavailable`] from a display-able cause.
    pub fn peer_unavailable(cause: impl fmt::Display) -> Self {
        Error::PeerUnavailable(cause.to_string())
    }
}
