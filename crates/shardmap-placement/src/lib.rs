//! Shardmap Placement - shard-to-server resolution
//!
//! This crate maps every key of a fixed shard space onto a set of servers
//! and measures how much of that mapping changes when a server is added.
//!
//! # Routers
//!
//! ## Ring
//! Consistent-hash ring with virtual nodes. A key belongs to the first
//! virtual node clockwise from its hash.
//!
//! ## Jump
//! Jump consistent hash over a positional server list. Nothing is stored
//! beyond the list itself.
//!
//! # Example
//! ```ignore
//! use shardmap_common::{PlacementConfig, RouterKind, ServerId, ShardKey};
//! use shardmap_placement::RouterFactory;
//!
//! let servers = ServerId::synthetic_set(32);
//! let router = RouterFactory::create(&PlacementConfig::new(RouterKind::Jump, 3), &servers)?;
//! let replicas = router.replica_set(ShardKey::new(42)?)?;
//! ```

pub mod hash;
pub mod jump;
pub mod migration;
pub mod ring;
pub mod router;

pub use hash::{hash32, jump_hash};
pub use jump::JumpRouter;
pub use migration::{
    Mapping, MigrationAnalyzer, MigrationReport, REPORT_HEADER, StrategyReport, moved,
};
pub use ring::RingRouter;
pub use router::{RouterFactory, ShardRouter};
