//! Shardmap CLI - shard placement explorer
//!
//! Runs the migration sweep that compares ring and jump routing, and
//! inspects individual placements.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use shardmap_common::{
    Config, PlacementConfig, ReplicaMode, RouterKind, SHARD_SPACE, ServerId, ShardKey,
    SweepConfig,
};
use shardmap_placement::{Mapping, MigrationAnalyzer, RouterFactory};
use std::path::Path;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "shardmap-cli")]
#[command(about = "Shard-to-server placement explorer")]
#[command(version)]
struct Args {
    /// Configuration file path (ignored if missing)
    #[arg(short, long, default_value = "shardmap.toml")]
    config: String,

    /// Log level (overrides the config file)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Measure shard movement when growing the cluster by one server
    Sweep {
        /// First server count (inclusive)
        #[arg(long)]
        start: Option<usize>,
        /// Last server count (exclusive)
        #[arg(long)]
        end: Option<usize>,
        /// Lowest replica count
        #[arg(long)]
        replicas_low: Option<usize>,
        /// Highest replica count
        #[arg(long)]
        replicas_high: Option<usize>,
        #[command(flatten)]
        router: RouterArgs,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Show the replica set of one shard key
    Resolve {
        /// Number of synthetic servers
        #[arg(short, long)]
        servers: usize,
        /// Shard key
        #[arg(short, long)]
        key: u64,
        /// Replicas per shard
        #[arg(short, long)]
        replicas: Option<usize>,
        #[command(flatten)]
        router: RouterArgs,
    },
    /// Show how many shards each server owns as primary
    Load {
        /// Number of synthetic servers
        #[arg(short, long)]
        servers: usize,
        #[command(flatten)]
        router: RouterArgs,
    },
}

/// Router selection flags shared by all commands
#[derive(clap::Args, Debug, Default)]
struct RouterArgs {
    /// Router strategy
    #[arg(long, value_enum)]
    strategy: Option<Strategy>,
    /// Replica selection mode (offset, distinct)
    #[arg(long)]
    replica_mode: Option<ReplicaMode>,
    /// Virtual nodes per server on the ring
    #[arg(long)]
    vnodes: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Strategy {
    Ring,
    Jump,
    All,
}

impl Strategy {
    fn kinds(self) -> Vec<RouterKind> {
        match self {
            Self::Ring => vec![RouterKind::Ring],
            Self::Jump => vec![RouterKind::Jump],
            Self::All => RouterKind::ALL.to_vec(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

/// Load the config file if present, otherwise defaults
fn load_config(path: &str) -> Result<Config> {
    if !Path::new(path).exists() {
        return Ok(Config::default());
    }
    let input =
        std::fs::read_to_string(path).with_context(|| format!("failed to read config {path}"))?;
    Config::from_toml_str(&input).with_context(|| format!("invalid config {path}"))
}

/// Apply router flags on top of the configured placement
fn merge_placement(base: PlacementConfig, args: &RouterArgs) -> PlacementConfig {
    let mut placement = base;
    if let Some(mode) = args.replica_mode {
        placement.replica_mode = mode;
    }
    if let Some(vnodes) = args.vnodes {
        placement.vnodes = Some(vnodes);
    }
    placement
}

/// Strategies selected by flags, falling back to `fallback`
fn strategies(args: &RouterArgs, fallback: Vec<RouterKind>) -> Vec<RouterKind> {
    args.strategy.map_or(fallback, Strategy::kinds)
}

fn run_sweep(
    config: &Config,
    start: Option<usize>,
    end: Option<usize>,
    replicas_low: Option<usize>,
    replicas_high: Option<usize>,
    router: &RouterArgs,
    format: OutputFormat,
) -> Result<()> {
    let sweep = SweepConfig {
        start: start.unwrap_or(config.sweep.start),
        end: end.unwrap_or(config.sweep.end),
        replicas_low: replicas_low.unwrap_or(config.sweep.replicas_low),
        replicas_high: replicas_high.unwrap_or(config.sweep.replicas_high),
        strategies: strategies(router, config.sweep.strategies.clone()),
    };
    let placement = merge_placement(config.placement, router);
    debug!(?sweep, ?placement, "running sweep");

    let reports = MigrationAnalyzer::new(placement).sweep(&sweep)?;

    match format {
        OutputFormat::Table => {
            for report in &reports {
                print!("{report}");
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }
    Ok(())
}

fn run_resolve(
    config: &Config,
    servers: usize,
    key: u64,
    replicas: Option<usize>,
    router: &RouterArgs,
) -> Result<()> {
    let key = ShardKey::new(key)?;
    let names = ServerId::synthetic_set(servers);
    let mut placement = merge_placement(config.placement, router);
    if let Some(replicas) = replicas {
        placement.replicas = replicas;
    }

    println!(
        "Shard {key} over {servers} servers ({} replicas, {})",
        placement.replicas, placement.replica_mode
    );
    println!("{}", "=".repeat(40));
    for kind in strategies(router, vec![placement.router]) {
        let placement = PlacementConfig {
            router: kind,
            ..placement
        };
        let set = RouterFactory::create(&placement, &names)?.replica_set(key)?;
        let set: Vec<&str> = set.iter().map(ServerId::as_str).collect();
        println!("{:<14}{}", kind.name(), set.join(", "));
    }
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn run_load(config: &Config, servers: usize, router: &RouterArgs) -> Result<()> {
    let names = ServerId::synthetic_set(servers);
    let placement = merge_placement(config.placement, router);

    for kind in strategies(router, vec![placement.router]) {
        let placement = PlacementConfig {
            router: kind,
            ..placement
        };
        let mapping = Mapping::capture(RouterFactory::create(&placement, &names)?.as_ref())?;
        let load = mapping.primary_load();

        println!("{kind}");
        println!("--");
        println!("{:<12} {:>8} {:>8}", "SERVER", "PRIMARY", "SHARE");
        for name in &names {
            let count = load.get(name).copied().unwrap_or(0);
            println!(
                "{:<12} {:>8} {:>8.4}",
                name.as_str(),
                count,
                count as f64 / SHARD_SPACE as f64
            );
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    let config = load_config(&args.config)?;

    // Initialize logging
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match args.command {
        Commands::Sweep {
            start,
            end,
            replicas_low,
            replicas_high,
            router,
            format,
        } => run_sweep(
            &config,
            start,
            end,
            replicas_low,
            replicas_high,
            &router,
            format,
        ),
        Commands::Resolve {
            servers,
            key,
            replicas,
            router,
        } => run_resolve(&config, servers, key, replicas, &router),
        Commands::Load { servers, router } => run_load(&config, servers, &router),
    }
}
