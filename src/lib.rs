//! Core engine for a distributed, read-through cache cluster.
//!
//! `ringcache` gives you the pieces groupcache-style clusters are built
//! from, without committing to a transport, a discovery mechanism, or a
//! wire format:
//!
//! - [`cache`] — a bounded, thread-safe LRU with per-entry expiration.
//! - [`ring`] — a consistent-hash ring for routing keys to peers.
//! - [`singleflight`] — call coalescing so a cache stampede turns into one
//!   loader call instead of N.
//! - [`group`] — ties a loader, a cache, and an optional peer picker
//!   together into one `get` with hit → peer → local-load resolution.
//! - [`registry`] — a process-wide (or dependency-injected) directory of
//!   groups, so a server handling requests for many groups can look one
//!   up by name.
//!
//! Everything above the cache itself (how peers are discovered, how a
//! fetch reaches another process, how requests are framed on the wire) is
//! left to the caller, expressed here only as traits in [`peer`].

pub mod cache;
pub mod entry;
pub mod error;
pub mod group;
mod list;
pub mod lru;
pub mod peer;
pub mod registry;
pub mod ring;
pub mod singleflight;

pub use cache::Cache;
pub use error::Error;
pub use group::Group;
pub use lru::LruCore;
pub use peer::{Fetcher, Loader, PeerEvent, Picker};
pub use ring::HashRing;
pub use singleflight::SingleFlight;
