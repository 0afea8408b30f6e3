//! Migration analysis
//!
//! Measures how many shard replicas change owner when a cluster of `n`
//! servers grows to `n + 1`, and compares that against the theoretical
//! minimum of `1 / (n + 1)`.

use crate::router::{RouterFactory, ShardRouter};
use serde::Serialize;
use shardmap_common::{
    Error, PlacementConfig, Result, RouterKind, SHARD_SPACE, ServerId, ShardKey, SweepConfig,
};
use std::collections::BTreeMap;
use std::fmt;
use tracing::info;

/// Column header matching the `Display` layout of [`MigrationReport`]
pub const REPORT_HEADER: &str = "start  end  replicas  numMoved  moved % ideal %  diff %";

/// Snapshot of every shard key's replica set under one router
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mapping {
    kind: RouterKind,
    /// Indexed by shard key
    sets: Vec<Vec<ServerId>>,
}

impl Mapping {
    /// Resolve the full replica set of every key in the shard space
    pub fn capture(router: &dyn ShardRouter) -> Result<Self> {
        let sets = ShardKey::all()
            .map(|key| router.replica_set(key))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            kind: router.kind(),
            sets,
        })
    }

    /// Router strategy the snapshot was taken from
    #[must_use]
    pub const fn kind(&self) -> RouterKind {
        self.kind
    }

    /// Replica set of `key`, primary first
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn get(&self, key: ShardKey) -> &[ServerId] {
        &self.sets[key.get() as usize]
    }

    /// All `(key, replica set)` pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (ShardKey, &[ServerId])> {
        ShardKey::all().zip(self.sets.iter().map(Vec::as_slice))
    }

    /// Number of keys in the snapshot
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// True if the snapshot holds no keys
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Number of keys each server holds as primary
    #[must_use]
    pub fn primary_load(&self) -> BTreeMap<ServerId, usize> {
        let mut load = BTreeMap::new();
        for set in &self.sets {
            if let Some(primary) = set.first() {
                *load.entry(primary.clone()).or_default() += 1;
            }
        }
        load
    }

    /// Replica slots whose server is absent from the same key's replica set
    /// in `after`
    #[must_use]
    pub fn moved_to(&self, after: &Self) -> usize {
        self.sets
            .iter()
            .zip(&after.sets)
            .map(|(before, after)| missing(before, after))
            .sum()
    }
}

/// Count entries of `before` that appear nowhere in `after`
fn missing(before: &[ServerId], after: &[ServerId]) -> usize {
    before.iter().filter(|server| !after.contains(server)).count()
}

/// Disruption caused by adding one server
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MigrationReport {
    /// Router strategy
    pub strategy: RouterKind,
    /// Server count before growth
    pub start: usize,
    /// Server count after growth
    pub end: usize,
    /// Replicas per shard
    pub replicas: usize,
    /// Replica slots whose server left the replica set
    pub moved: usize,
    /// `moved / (SHARD_SPACE * replicas)`
    pub moved_pct: f64,
    /// `1 / end`, the minimum possible movement
    pub ideal_pct: f64,
    /// `moved_pct - ideal_pct`
    pub diff_pct: f64,
}

impl MigrationReport {
    #[allow(clippy::cast_precision_loss)]
    fn new(strategy: RouterKind, start: usize, replicas: usize, moved: usize) -> Self {
        let end = start + 1;
        let moved_pct = moved as f64 / (SHARD_SPACE as f64 * replicas as f64);
        let ideal_pct = 1.0 / end as f64;
        Self {
            strategy,
            start,
            end,
            replicas,
            moved,
            moved_pct,
            ideal_pct,
            diff_pct: moved_pct - ideal_pct,
        }
    }

    /// Movement a naive full reshuffle would cause, `start / end`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn reshuffle_pct(&self) -> f64 {
        self.start as f64 / self.end as f64
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<8}{:<8}{:<8}{:<8}{:<8.4}{:<8.4}{:<8.4}",
            self.start,
            self.end,
            self.replicas,
            self.moved,
            self.moved_pct,
            self.ideal_pct,
            self.diff_pct
        )
    }
}

/// Reports for one strategy across a sweep
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StrategyReport {
    /// Router strategy
    pub strategy: RouterKind,
    /// One row per `(servers, replicas)` point
    pub rows: Vec<MigrationReport>,
}

impl fmt::Display for StrategyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.strategy)?;
        writeln!(f, "--")?;
        writeln!(f, "{REPORT_HEADER}")?;
        for row in &self.rows {
            writeln!(f, "{row}")?;
        }
        Ok(())
    }
}

/// Measure movement when growing from `num_servers` to `num_servers + 1`
///
/// `factory` builds a router over the given servers with the given replica
/// count. The larger server set extends the smaller one by appending.
pub fn moved<F>(num_servers: usize, replicas: usize, factory: F) -> Result<MigrationReport>
where
    F: Fn(&[ServerId], usize) -> Result<Box<dyn ShardRouter>>,
{
    if num_servers == 0 {
        return Err(Error::invalid_argument("num_servers must be at least 1"));
    }
    if replicas == 0 {
        return Err(Error::invalid_argument("replicas must be at least 1"));
    }

    let servers = ServerId::synthetic_set(num_servers + 1);

    let before_router = factory(&servers[..num_servers], replicas)?;
    let before = Mapping::capture(before_router.as_ref())?;

    let after_router = factory(&servers, replicas)?;
    let after = Mapping::capture(after_router.as_ref())?;

    Ok(MigrationReport::new(
        before.kind(),
        num_servers,
        replicas,
        before.moved_to(&after),
    ))
}

/// Runs migration analysis for a placement configuration
#[derive(Clone, Debug, Default)]
pub struct MigrationAnalyzer {
    placement: PlacementConfig,
}

impl MigrationAnalyzer {
    /// Create an analyzer; the router kind and replica count in `placement`
    /// are overridden per run
    #[must_use]
    pub const fn new(placement: PlacementConfig) -> Self {
        Self { placement }
    }

    /// Measure movement for one strategy and cluster size
    pub fn moved(
        &self,
        strategy: RouterKind,
        num_servers: usize,
        replicas: usize,
    ) -> Result<MigrationReport> {
        let config = PlacementConfig {
            router: strategy,
            replicas,
            ..self.placement
        };
        moved(num_servers, replicas, |servers, _| {
            RouterFactory::create(&config, servers)
        })
    }

    /// Measure every point of `sweep` for every configured strategy
    pub fn sweep(&self, sweep: &SweepConfig) -> Result<Vec<StrategyReport>> {
        sweep.validate()?;

        sweep
            .strategies
            .iter()
            .map(|&strategy| -> Result<StrategyReport> {
                let rows = sweep
                    .points()
                    .map(|(num_servers, replicas)| -> Result<MigrationReport> {
                        let report = self.moved(strategy, num_servers, replicas)?;
                        info!(
                            %strategy,
                            start = report.start,
                            replicas,
                            moved = report.moved,
                            diff = report.diff_pct,
                            "measured migration"
                        );
                        Ok(report)
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(StrategyReport { strategy, rows })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jump::JumpRouter;
    use crate::ring::RingRouter;
    use shardmap_common::ReplicaMode;

    fn jump_factory(servers: &[ServerId], replicas: usize) -> Result<Box<dyn ShardRouter>> {
        let mut router = JumpRouter::new(replicas);
        router.add(servers);
        Ok(Box::new(router))
    }

    fn ring_factory(servers: &[ServerId], replicas: usize) -> Result<Box<dyn ShardRouter>> {
        let mut router = RingRouter::new(replicas);
        router.add(servers);
        Ok(Box::new(router))
    }

    #[test]
    fn test_missing_is_set_based() {
        let s = |name: &str| ServerId::from(name);
        assert_eq!(missing(&[s("a"), s("b"), s("c")], &[s("b"), s("c"), s("d")]), 1);
        assert_eq!(missing(&[s("a"), s("b"), s("c")], &[s("c"), s("a"), s("b")]), 0);
        assert_eq!(missing(&[s("a"), s("a")], &[s("b")]), 2);
        assert_eq!(missing(&[], &[s("a")]), 0);
    }

    #[test]
    fn test_mapping_capture() {
        let router = jump_factory(&ServerId::synthetic_set(8), 3).unwrap();
        let mapping = Mapping::capture(router.as_ref()).unwrap();

        assert_eq!(mapping.len() as u64, SHARD_SPACE);
        assert_eq!(mapping.kind(), RouterKind::Jump);
        for (key, set) in mapping.iter() {
            assert_eq!(set, router.replica_set(key).unwrap().as_slice());
            assert_eq!(mapping.get(key), set);
        }
        assert_eq!(mapping.moved_to(&mapping), 0);
    }

    #[test]
    fn test_mapping_empty_router() {
        let router = JumpRouter::new(3);
        assert!(Mapping::capture(&router).is_err());
    }

    #[test]
    fn test_primary_load_covers_shard_space() {
        let router = ring_factory(&ServerId::synthetic_set(10), 3).unwrap();
        let mapping = Mapping::capture(router.as_ref()).unwrap();
        let load = mapping.primary_load();

        assert!(load.len() <= 10);
        assert_eq!(load.values().sum::<usize>() as u64, SHARD_SPACE);
    }

    #[test]
    fn test_jump_close_to_ideal() {
        let report = moved(32, 3, jump_factory).unwrap();

        assert_eq!(report.strategy, RouterKind::Jump);
        assert_eq!(report.start, 32);
        assert_eq!(report.end, 33);
        assert!(report.moved > 0);
        assert!((report.ideal_pct - 1.0 / 33.0).abs() < 1e-12);
        assert!(
            report.diff_pct.abs() < 0.01,
            "jump diff {:.4} too far from ideal",
            report.diff_pct
        );
    }

    #[test]
    fn test_below_reshuffle_bound() {
        for num_servers in [4, 16, 32] {
            for report in [
                moved(num_servers, 3, jump_factory).unwrap(),
                moved(num_servers, 3, ring_factory).unwrap(),
            ] {
                assert!(
                    report.moved_pct < report.reshuffle_pct(),
                    "{} moved {:.4} with {} servers",
                    report.strategy,
                    report.moved_pct,
                    num_servers
                );
            }
        }
    }

    #[test]
    fn test_single_replica_ring_moves_only_new_segments() {
        let servers = ServerId::synthetic_set(21);
        let before = Mapping::capture(ring_factory(&servers[..20], 1).unwrap().as_ref()).unwrap();
        let after = Mapping::capture(ring_factory(&servers, 1).unwrap().as_ref()).unwrap();

        let moved_to_new = before
            .iter()
            .zip(after.iter())
            .filter(|((_, b), (_, a))| b != a)
            .inspect(|(_, (_, a))| assert_eq!(a[0], servers[20]))
            .count();
        assert_eq!(moved_to_new, before.moved_to(&after));
    }

    #[test]
    fn test_moved_rejects_degenerate_input() {
        assert!(matches!(
            moved(0, 3, jump_factory),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            moved(4, 0, jump_factory),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_moved_is_repeatable() {
        let analyzer = MigrationAnalyzer::default();
        for strategy in RouterKind::ALL {
            let a = analyzer.moved(strategy, 12, 3).unwrap();
            let b = analyzer.moved(strategy, 12, 3).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_analyzer_uses_placement_settings() {
        let analyzer = MigrationAnalyzer::new(
            PlacementConfig::new(RouterKind::Ring, 3).with_replica_mode(ReplicaMode::Distinct),
        );
        let report = analyzer.moved(RouterKind::Jump, 10, 2).unwrap();
        assert_eq!(report.strategy, RouterKind::Jump);
        assert_eq!(report.replicas, 2);

        let direct = moved(10, 2, |servers, replicas| {
            let mut router = JumpRouter::new(replicas).with_replica_mode(ReplicaMode::Distinct);
            router.add(servers);
            Ok(Box::new(router) as Box<dyn ShardRouter>)
        })
        .unwrap();
        assert_eq!(report, direct);
    }

    #[test]
    fn test_sweep_shape() {
        let sweep = SweepConfig {
            start: 6,
            end: 9,
            replicas_low: 1,
            replicas_high: 2,
            strategies: vec![RouterKind::Jump, RouterKind::Ring],
        };
        let reports = MigrationAnalyzer::default().sweep(&sweep).unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].strategy, RouterKind::Jump);
        assert_eq!(reports[1].strategy, RouterKind::Ring);
        for report in &reports {
            assert_eq!(report.rows.len(), 6);
            assert!(report.rows.iter().all(|row| row.strategy == report.strategy));
            assert_eq!(report.rows[0].start, 6);
            assert_eq!(report.rows[0].replicas, 1);
            assert_eq!(report.rows[5].start, 8);
            assert_eq!(report.rows[5].replicas, 2);
        }
    }

    #[test]
    fn test_sweep_rejects_empty_range() {
        let sweep = SweepConfig {
            start: 10,
            end: 10,
            ..SweepConfig::default()
        };
        assert!(MigrationAnalyzer::default().sweep(&sweep).is_err());
    }

    #[test]
    fn test_report_format() {
        let report = MigrationReport::new(RouterKind::Jump, 32, 3, 366);
        assert_eq!(
            report.to_string(),
            "32      33      3       366     0.0298  0.0303  -0.0005 "
        );

        let section = StrategyReport {
            strategy: RouterKind::Jump,
            rows: vec![report],
        }
        .to_string();
        let lines: Vec<&str> = section.lines().collect();
        assert_eq!(lines[0], "hashjump");
        assert_eq!(lines[1], "--");
        assert_eq!(lines[2], REPORT_HEADER);
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_report_json_fields() {
        let reports = vec![StrategyReport {
            strategy: RouterKind::Ring,
            rows: vec![MigrationReport::new(RouterKind::Ring, 32, 3, 400)],
        }];
        let json = serde_json::to_value(&reports).unwrap();

        assert_eq!(json[0]["strategy"], "ring");
        let row = &json[0]["rows"][0];
        assert_eq!(row["strategy"], "ring");
        assert_eq!(row["start"], 32);
        assert_eq!(row["end"], 33);
        assert_eq!(row["replicas"], 3);
        assert_eq!(row["moved"], 400);
        for field in ["moved_pct", "ideal_pct", "diff_pct"] {
            assert!(row[field].is_f64(), "missing {field}");
        }
        assert_eq!(row.as_object().unwrap().len(), 8);
    }
}
