//! Core type definitions for shardmap
//!
//! Servers are opaque identifiers and shard keys are small integers drawn
//! from a fixed shard space.

use crate::error::{Error, Result};
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of the addressable shard space
pub const SHARD_SPACE: u64 = 4096;

/// Identifier for a server that can own shards
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From)]
#[display("{_0}")]
pub struct ServerId(String);

impl ServerId {
    /// Deterministic synthetic name (`server00`, `server01`, ...)
    #[must_use]
    pub fn synthetic(index: usize) -> Self {
        Self(format!("server{index:02}"))
    }

    /// The first `count` synthetic servers, in index order
    ///
    /// A set of `n + 1` always extends the set of `n` by appending, which is
    /// what the migration analysis relies on.
    #[must_use]
    pub fn synthetic_set(count: usize) -> Vec<Self> {
        (0..count).map(Self::synthetic).collect()
    }

    /// Get the server name as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ServerId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl fmt::Debug for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServerId({:?})", self.0)
    }
}

/// A key in `[0, SHARD_SPACE)`
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
#[serde(try_from = "u64")]
#[display("{_0}")]
pub struct ShardKey(u64);

impl ShardKey {
    /// Create a shard key, rejecting values outside the shard space
    pub fn new(key: u64) -> Result<Self> {
        if key >= SHARD_SPACE {
            return Err(Error::InvalidShardKey {
                key,
                shard_space: SHARD_SPACE,
            });
        }
        Ok(Self(key))
    }

    /// Reduce an externally computed hash into the shard space
    #[must_use]
    pub const fn from_hash(hash: u64) -> Self {
        Self(hash % SHARD_SPACE)
    }

    /// Raw key value
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Key shifted by a replica index
    ///
    /// Not reduced modulo the shard space: the result is only used as hash
    /// input, never as a shard key.
    #[must_use]
    pub const fn offset(self, replica: usize) -> u64 {
        self.0 + replica as u64
    }

    /// Every key in the shard space, ascending
    pub fn all() -> impl Iterator<Item = Self> {
        (0..SHARD_SPACE).map(Self)
    }
}

impl TryFrom<u64> for ShardKey {
    type Error = Error;

    fn try_from(key: u64) -> Result<Self> {
        Self::new(key)
    }
}

impl fmt::Debug for ShardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShardKey({})", self.0)
    }
}
