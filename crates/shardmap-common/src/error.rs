//! Error types for shardmap
//!
//! Routing itself is total over well-formed input. The variants below cover
//! caller contract violations and configuration problems.

use thiserror::Error;

/// Common result type for shardmap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for shardmap
#[derive(Debug, Error)]
pub enum Error {
    // Routing errors
    #[error("router has no servers")]
    EmptyRouter,

    #[error("shard key {key} outside shard space [0, {shard_space})")]
    InvalidShardKey { key: u64, shard_space: u64 },

    // Input errors
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
