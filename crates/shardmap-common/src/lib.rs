//! Shardmap Common - Shared types and utilities
//!
//! This crate provides the identifiers, configuration structures and error
//! definitions shared by the placement engine and the CLI.

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, PlacementConfig, ReplicaMode, RouterKind, SweepConfig};
pub use error::{Error, Result};
pub use types::*;
