//! Consistent-hash ring router
//!
//! Every server is placed on a 32-bit ring at `vnodes` positions. A shard key
//! is owned by the first virtual node at or after the key's ring position,
//! wrapping past the end back to the start.

use crate::hash::{hash_key, hash_vnode};
use crate::router::ShardRouter;
use shardmap_common::{Error, ReplicaMode, Result, RouterKind, ServerId, ShardKey};
use std::collections::HashMap;
use tracing::debug;

/// Consistent-hash ring with virtual nodes
#[derive(Clone, Debug)]
pub struct RingRouter {
    /// Replication factor
    replicas: usize,
    /// Virtual nodes per server
    vnodes: usize,
    /// Replica selection mode
    replica_mode: ReplicaMode,
    /// Servers in insertion order; ring entries index into this
    servers: Vec<ServerId>,
    /// Ring position -> server index. A later insertion at the same
    /// position replaces the earlier one.
    owners: HashMap<u32, usize>,
    /// `(position, server index)` sorted ascending by position
    ring: Vec<(u32, usize)>,
}

impl RingRouter {
    /// Create an empty ring using `replicas` both as replication factor and
    /// as virtual nodes per server
    #[must_use]
    pub fn new(replicas: usize) -> Self {
        Self::with_vnodes(replicas, replicas)
    }

    /// Create an empty ring with an independent virtual node count
    #[must_use]
    pub fn with_vnodes(replicas: usize, vnodes: usize) -> Self {
        Self {
            replicas,
            vnodes,
            replica_mode: ReplicaMode::Offset,
            servers: Vec::new(),
            owners: HashMap::new(),
            ring: Vec::new(),
        }
    }

    /// Set the replica mode
    #[must_use]
    pub fn with_replica_mode(mut self, replica_mode: ReplicaMode) -> Self {
        self.replica_mode = replica_mode;
        self
    }

    /// Number of occupied ring positions
    #[must_use]
    pub fn ring_len(&self) -> usize {
        self.ring.len()
    }

    /// Virtual nodes per server
    #[must_use]
    pub const fn vnodes(&self) -> usize {
        self.vnodes
    }

    /// Occupy `position` with server `index`, replacing any previous owner
    fn place(&mut self, position: u32, index: usize) {
        self.owners.insert(position, index);
    }

    fn rebuild(&mut self) {
        self.ring = self.owners.iter().map(|(&pos, &idx)| (pos, idx)).collect();
        self.ring.sort_unstable_by_key(|&(pos, _)| pos);
    }

    /// Index of the first ring entry at or after `probe`, wrapping to 0
    fn successor(&self, probe: u32) -> usize {
        let idx = self.ring.partition_point(|&(pos, _)| pos < probe);
        if idx == self.ring.len() { 0 } else { idx }
    }

    /// Walk clockwise from the primary and return the `replica`-th distinct
    /// server index
    fn walk_distinct(&self, key: ShardKey, replica: usize) -> usize {
        let start = self.successor(hash_key(key.get()));
        let mut seen: Vec<usize> = Vec::with_capacity(replica + 1);

        for step in 0..self.ring.len() {
            let (_, owner) = self.ring[(start + step) % self.ring.len()];
            if seen.contains(&owner) {
                continue;
            }
            if seen.len() == replica {
                return owner;
            }
            seen.push(owner);
        }

        // Fewer distinct servers than replicas: repeat the walk order
        seen[replica % seen.len()]
    }
}

impl ShardRouter for RingRouter {
    fn kind(&self) -> RouterKind {
        RouterKind::Ring
    }

    fn replicas(&self) -> usize {
        self.replicas
    }

    fn server_count(&self) -> usize {
        self.servers.len()
    }

    fn add(&mut self, servers: &[ServerId]) {
        for server in servers {
            let index = match self.servers.iter().position(|s| s == server) {
                Some(index) => index,
                None => {
                    self.servers.push(server.clone());
                    self.servers.len() - 1
                }
            };

            for vnode in 0..self.vnodes {
                self.place(hash_vnode(vnode, server.as_str()), index);
            }
        }

        self.rebuild();
        debug!(
            servers = self.servers.len(),
            positions = self.ring.len(),
            vnodes = self.vnodes,
            "rebuilt hash ring"
        );
    }

    fn resolve(&self, key: ShardKey, replica: usize) -> Result<&ServerId> {
        if self.ring.is_empty() {
            return Err(Error::EmptyRouter);
        }

        let index = match self.replica_mode {
            ReplicaMode::Offset => {
                let (_, owner) = self.ring[self.successor(hash_key(key.offset(replica)))];
                owner
            }
            ReplicaMode::Distinct => self.walk_distinct(key, replica),
        };

        Ok(&self.servers[index])
    }
}
