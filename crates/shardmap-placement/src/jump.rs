//! Jump consistent hash router
//!
//! No ring is stored: the owner of a key is computed from the key and the
//! number of servers. The server list is positional, so servers must only
//! ever be appended.

use crate::hash::jump_hash;
use crate::router::ShardRouter;
use shardmap_common::{Error, ReplicaMode, Result, RouterKind, ServerId, ShardKey};
use tracing::debug;

/// Router backed by jump consistent hashing
#[derive(Clone, Debug)]
pub struct JumpRouter {
    replicas: usize,
    replica_mode: ReplicaMode,
    /// Bucket `i` is served by `servers[i]`
    servers: Vec<ServerId>,
}

impl JumpRouter {
    /// Create an empty router
    #[must_use]
    pub const fn new(replicas: usize) -> Self {
        Self {
            replicas,
            replica_mode: ReplicaMode::Offset,
            servers: Vec::new(),
        }
    }

    /// Set the replica mode
    #[must_use]
    pub fn with_replica_mode(mut self, replica_mode: ReplicaMode) -> Self {
        self.replica_mode = replica_mode;
        self
    }

    /// Servers in bucket order
    #[must_use]
    pub fn servers(&self) -> &[ServerId] {
        &self.servers
    }

    #[allow(clippy::cast_sign_loss)]
    fn bucket(&self, key: ShardKey, replica: usize) -> Result<usize> {
        let count = self.servers.len();
        let buckets = i32::try_from(count).map_err(|_| {
            Error::invalid_argument(format!("{count} servers exceed the jump hash bucket range"))
        })?;

        // jump_hash never returns a negative bucket for a positive count
        let bucket = match self.replica_mode {
            ReplicaMode::Offset => jump_hash(key.offset(replica), buckets) as usize,
            ReplicaMode::Distinct => (jump_hash(key.get(), buckets) as usize + replica) % count,
        };
        Ok(bucket)
    }
}

impl ShardRouter for JumpRouter {
    fn kind(&self) -> RouterKind {
        RouterKind::Jump
    }

    fn replicas(&self) -> usize {
        self.replicas
    }

    fn server_count(&self) -> usize {
        self.servers.len()
    }

    fn add(&mut self, servers: &[ServerId]) {
        self.servers.extend_from_slice(servers);
        debug!(servers = self.servers.len(), "extended jump server list");
    }

    fn resolve(&self, key: ShardKey, replica: usize) -> Result<&ServerId> {
        if self.servers.is_empty() {
            return Err(Error::EmptyRouter);
        }
        let bucket = self.bucket(key, replica)?;
        Ok(&self.servers[bucket])
    }
}
