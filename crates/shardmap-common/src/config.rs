//! Configuration types for shardmap
//!
//! This module defines the router selection and sweep settings shared by
//! the placement engine and the CLI.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Root configuration for shardmap
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Router selection and replica settings
    #[serde(default)]
    pub placement: PlacementConfig,
    /// Migration sweep range
    #[serde(default)]
    pub sweep: SweepConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse a TOML document, falling back to defaults for missing fields
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(input).map_err(|e| Error::configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        self.placement.validate()?;
        self.sweep.validate()
    }
}

/// Router strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouterKind {
    /// Consistent-hash ring with virtual nodes
    #[default]
    Ring,
    /// Jump consistent hash over a positional server list
    Jump,
}

impl RouterKind {
    /// All router kinds, in report order
    pub const ALL: [Self; 2] = [Self::Ring, Self::Jump];

    /// Get the router kind name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ring => "hashringmap",
            Self::Jump => "hashjump",
        }
    }
}

impl fmt::Display for RouterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for RouterKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ring" | "hashring" | "hashringmap" => Ok(Self::Ring),
            "jump" | "hashjump" => Ok(Self::Jump),
            _ => Err(Error::configuration(format!("unknown router kind: {s}"))),
        }
    }
}

/// How replicas beyond the primary are chosen
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicaMode {
    /// Hash `key + replica` independently; replicas may collide
    #[default]
    Offset,
    /// Derive replicas from the primary so they are pairwise distinct
    /// whenever there are enough servers
    Distinct,
}

impl fmt::Display for ReplicaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offset => write!(f, "offset"),
            Self::Distinct => write!(f, "distinct"),
        }
    }
}

impl FromStr for ReplicaMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "offset" => Ok(Self::Offset),
            "distinct" => Ok(Self::Distinct),
            _ => Err(Error::configuration(format!("unknown replica mode: {s}"))),
        }
    }
}

/// Router construction settings
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Router strategy
    pub router: RouterKind,
    /// Replication factor (servers per shard)
    pub replicas: usize,
    /// Replica selection mode
    pub replica_mode: ReplicaMode,
    /// Virtual nodes per server on the ring (defaults to `replicas`)
    pub vnodes: Option<usize>,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            router: RouterKind::Ring,
            replicas: 3,
            replica_mode: ReplicaMode::Offset,
            vnodes: None,
        }
    }
}

impl PlacementConfig {
    /// Create a configuration for the given router and replication factor
    #[must_use]
    pub fn new(router: RouterKind, replicas: usize) -> Self {
        Self {
            router,
            replicas,
            ..Self::default()
        }
    }

    /// Set the replica mode
    #[must_use]
    pub const fn with_replica_mode(mut self, replica_mode: ReplicaMode) -> Self {
        self.replica_mode = replica_mode;
        self
    }

    /// Override the ring's virtual node count
    #[must_use]
    pub const fn with_vnodes(mut self, vnodes: usize) -> Self {
        self.vnodes = Some(vnodes);
        self
    }

    /// Virtual nodes each server places on the ring
    #[must_use]
    pub fn vnodes_per_server(&self) -> usize {
        self.vnodes.unwrap_or(self.replicas)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.replicas == 0 {
            return Err(Error::invalid_argument("replicas must be at least 1"));
        }
        if self.vnodes == Some(0) {
            return Err(Error::invalid_argument("vnodes must be at least 1"));
        }
        Ok(())
    }
}

/// Range of cluster sizes and replica counts to analyze
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// First server count (inclusive)
    pub start: usize,
    /// Last server count (exclusive)
    pub end: usize,
    /// Lowest replica count (inclusive)
    pub replicas_low: usize,
    /// Highest replica count (inclusive)
    pub replicas_high: usize,
    /// Router strategies to report, in order
    pub strategies: Vec<RouterKind>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            start: 32,
            end: 40,
            replicas_low: 3,
            replicas_high: 3,
            strategies: RouterKind::ALL.to_vec(),
        }
    }
}

impl SweepConfig {
    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.start == 0 {
            return Err(Error::invalid_argument("sweep start must be at least 1"));
        }
        if self.end <= self.start {
            return Err(Error::invalid_argument(format!(
                "empty sweep range {}..{}",
                self.start, self.end
            )));
        }
        if self.replicas_low == 0 || self.replicas_high < self.replicas_low {
            return Err(Error::invalid_argument(format!(
                "invalid replica range {}..={}",
                self.replicas_low, self.replicas_high
            )));
        }
        Ok(())
    }

    /// Every `(num_servers, replicas)` pair, server count major
    pub fn points(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.start..self.end)
            .flat_map(move |n| (self.replicas_low..=self.replicas_high).map(move |r| (n, r)))
    }
}

/// Logging configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level / filter directive
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}
