//! Consistent-hash ring for routing keys to peers.
//!
//! Each peer is replicated onto the ring `replicas` times so that adding or
//! removing one peer only reshuffles ownership for the keys that mapped
//! onto its virtual nodes, not the whole keyspace. Ownership of a key is
//! the peer owning the first virtual node at or after the key's hash,
//! wrapping around to the lowest position if the key hashes past the last
//! node on the ring.

use parking_lot::RwLock;

/// A hash function from arbitrary bytes to a 32-bit ring position.
pub type HashFn = dyn Fn(&[u8]) -> u32 + Send + Sync;

fn default_hash(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

struct Ring<P> {
    /// `(position, peer)` pairs sorted by position. A `Vec` rather than a
    /// `HashMap<u32, P>` because distinct peers are allowed to collide on
    /// the same position — a `Vec` can hold both entries and `Remove`
    /// deletes only the exact pair that was added, never a colliding
    /// peer's mapping.
    positions: Vec<(u32, P)>,
    replicas: usize,
}

/// A consistent-hash ring mapping keys to peers.
pub struct HashRing<P> {
    hash: Box<HashFn>,
    ring: RwLock<Ring<P>>,
}

impl<P> HashRing<P>
where
    P: Eq + Clone,
{
    /// Creates a ring with `replicas` virtual nodes per peer and the
    /// default CRC32 hash.
    pub fn new(replicas: usize) -> Self {
        Self::with_hasher(replicas, default_hash)
    }

    /// Creates a ring with `replicas` virtual nodes per peer and a custom
    /// hash function.
    pub fn with_hasher<H>(replicas: usize, hash: H) -> Self
    where
        H: Fn(&[u8]) -> u32 + Send + Sync + 'static,
    {
        HashRing {
            hash: Box::new(hash),
            ring: RwLock::new(Ring {
                positions: Vec::new(),
                replicas,
            }),
        }
    }

    /// Adds peers to the ring, each replicated `replicas` times.
    pub fn add<I>(&self, peers: I)
    where
        I: IntoIterator<Item = P>,
        P: std::fmt::Display,
    {
        let mut ring = self.ring.write();
        let replicas = ring.replicas;
        for peer in peers {
            for i in 0..replicas {
                let pos = (self.hash)(format!("{i}{peer}").as_bytes());
                ring.positions.push((pos, peer.clone()));
            }
        }
        ring.positions.sort_by_key(|(pos, _)| *pos);
    }

    /// Removes peers from the ring. Only the exact virtual-node positions
    /// that `add` would have produced for these peers are removed; any
    /// colliding position still held by a different peer is left intact.
    pub fn remove<I>(&self, peers: I)
    where
        I: IntoIterator<Item = P>,
        P: std::fmt::Display,
    {
        let mut ring = self.ring.write();
        let replicas = ring.replicas;
        for peer in peers {
            for i in 0..replicas {
                let pos = (self.hash)(format!("{i}{peer}").as_bytes());
                if let Some(idx) = ring
                    .positions
                    .iter()
                    .position(|(p, owner)| *p == pos && *owner == peer)
                {
                    ring.positions.remove(idx);
                }
            }
        }
    }

    /// Returns the peer owning `key`, or `None` if the ring is empty.
    pub fn get(&self, key: &[u8]) -> Option<P> {
        let ring = self.ring.read();
        if ring.positions.is_empty() {
            return None;
        }
        let hash = (self.hash)(key);
        let idx = match ring.positions.binary_search_by_key(&hash, |(pos, _)| *pos) {
            Ok(i) => i,
            Err(i) => i,
        };
        let idx = if idx == ring.positions.len() { 0 } else { idx };
        Some(ring.positions[idx].1.clone())
    }

    /// Number of distinct virtual-node entries currently on the ring
    /// (`replicas * number of peers`, minus any collisions removed).
    pub fn len(&self) -> usize {
        self.ring.read().positions.len()
    }

    /// Whether the ring has no peers on it.
    pub fn is_empty(&self) -> bool {
        self.ring.read().positions.is_empty()
    }
}

impl<P> std::fmt::Debug for HashRing<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashRing")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ring_returns_none() {
        let ring: HashRing<String> = HashRing::new(3);
        assert_eq!(ring.get(b"anything"), None);
    }

    #[test]
    fn get_is_stable_for_the_same_key() {
        let ring = HashRing::new(50);
        ring.add(vec!["peer-a".to_string(), "peer-b".to_string(), "peer-c".to_string()]);
        let first = ring.get(b"some-key");
        for _ in 0..10 {
            assert_eq!(ring.get(b"some-key"), first);
        }
    }

    #[test]
    fn distribution_is_roughly_uniform_across_peers() {
        let ring = HashRing::new(150);
        let peers = vec!["p0".to_string(), "p1".to_string(), "p2".to_string()];
        ring.add(peers.clone());

        let mut counts = std::collections::HashMap::new();
        for i in 0..10_000 {
            let key = format!("key-{i}");
            let owner = ring.get(key.as_bytes()).unwrap();
            *counts.entry(owner).or_insert(0usize) += 1;
        }

        let expected = 10_000 / peers.len();
        for peer in &peers {
            let count = counts.get(peer).copied().unwrap_or(0);
            let delta = (count as isize - expected as isize).unsigned_abs();
            assert!(
                delta <= expected / 10,
                "peer {peer} got {count}, expected ~{expected}"
            );
        }
    }

    #[test]
    fn removing_a_peer_only_moves_a_subset_of_keys() {
        let ring = HashRing::new(50);
        let peers = vec!["p0".to_string(), "p1".to_string(), "p2".to_string()];
        ring.add(peers.clone());

        let keys: Vec<String> = (0..2_000).map(|i| format!("key-{i}")).collect();
        let before: Vec<_> = keys.iter().map(|k| ring.get(k.as_bytes())).collect();

        ring.remove(vec!["p1".to_string()]);
        let after: Vec<_> = keys.iter().map(|k| ring.get(k.as_bytes())).collect();

        let moved = before.iter().zip(after.iter()).filter(|(a, b)| a != b).count();
        assert!(moved > 0, "removing a peer should move some keys");
        assert!(
            after.iter().all(|p| p.as_deref() != Some("p1")),
            "no key should still map to the removed peer"
        );
        for (b, a) in before.iter().zip(after.iter()) {
            if b.as_deref() != Some("p1") {
                assert_eq!(b, a, "keys not owned by the removed peer must not move");
            }
        }
    }

    #[test]
    fn custom_hasher_is_used_instead_of_default() {
        let ring = HashRing::with_hasher(1, |data: &[u8]| data.len() as u32);
        ring.add(vec!["a".to_string()]);
        assert_eq!(ring.get(b"x"), Some("a".to_string()));
    }
}
