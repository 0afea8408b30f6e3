//! Router abstraction and factory
//!
//! Both routing strategies expose the same capability set so the migration
//! analysis can drive either one from configuration alone.

use crate::jump::JumpRouter;
use crate::ring::RingRouter;
use shardmap_common::{PlacementConfig, Result, RouterKind, ServerId, ShardKey};
use tracing::debug;

/// Resolves shard keys to servers
///
/// Implementations are read-only during `resolve`, so a built router can be
/// shared across threads. `add` needs exclusive access.
pub trait ShardRouter: Send + Sync {
    /// Strategy implemented by this router
    fn kind(&self) -> RouterKind;

    /// Replication factor
    fn replicas(&self) -> usize;

    /// Number of servers added so far
    fn server_count(&self) -> usize;

    /// Add servers, in order
    fn add(&mut self, servers: &[ServerId]);

    /// Server holding replica `replica` of `key`
    ///
    /// Returns `Error::EmptyRouter` if no server was added.
    fn resolve(&self, key: ShardKey, replica: usize) -> Result<&ServerId>;

    /// Full replica set of `key`, primary first
    fn replica_set(&self, key: ShardKey) -> Result<Vec<ServerId>> {
        (0..self.replicas())
            .map(|replica| self.resolve(key, replica).cloned())
            .collect()
    }
}

/// Factory for building routers from configuration
pub struct RouterFactory;

impl RouterFactory {
    /// Build a router of the configured kind over `servers`
    pub fn create(config: &PlacementConfig, servers: &[ServerId]) -> Result<Box<dyn ShardRouter>> {
        config.validate()?;

        let mut router: Box<dyn ShardRouter> = match config.router {
            RouterKind::Ring => Box::new(
                RingRouter::with_vnodes(config.replicas, config.vnodes_per_server())
                    .with_replica_mode(config.replica_mode),
            ),
            RouterKind::Jump => Box::new(
                JumpRouter::new(config.replicas).with_replica_mode(config.replica_mode),
            ),
        };
        router.add(servers);

        debug!(
            kind = %config.router,
            replicas = config.replicas,
            mode = %config.replica_mode,
            servers = servers.len(),
            "built router"
        );
        Ok(router)
    }
}
