//! Path analysis: enumerate, score and classify paths between two devices
//!
//! Cost per hop comes from the link speed:
//! - 10G, 25G, 40G, 100G = 1
//! - 1G (or no speed) = 5
//! - 100M = 10
//! - anything else = 20

use crate::error::{Entity, TopologyError, TopologyResult};
use crate::graph::{PathLimits, RawPath, TopologyStore};
use crate::models::{DeviceSummary, LinkSpeed};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Alternatives reported besides the shortest and cheapest path
pub const MAX_ALTERNATIVES: usize = 5;

/// One hop of a reported path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathLink {
    pub key: String,
    pub from: String,
    pub to: String,
    pub from_hostname: String,
    pub to_hostname: String,
    pub src_port: String,
    pub dst_port: String,
    pub speed: String,
    pub cable_type: String,
}

/// A scored path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathReport {
    pub hops: usize,
    pub cost: u32,
    /// `cost / hops`; 0 for a zero-hop path
    pub avg_cost: f64,
    pub devices: Vec<DeviceSummary>,
    pub connections: Vec<PathLink>,
}

impl PathReport {
    fn from_raw(path: &RawPath) -> Self {
        let hops = path.hop_count();
        let cost: u32 = path.connections.iter().map(|c| c.cost()).sum();
        let avg_cost = if hops == 0 {
            0.0
        } else {
            f64::from(cost) / hops as f64
        };

        // Endpoint names come from the path's own vertices
        let hostnames: HashMap<&str, &str> = path
            .devices
            .iter()
            .map(|d| (d.key.as_str(), d.hostname.as_str()))
            .collect();
        let hostname_of = |key: &str| {
            hostnames
                .get(key)
                .map_or_else(|| "Unknown".to_string(), |h| h.to_string())
        };

        let connections = path
            .connections
            .iter()
            .map(|c| PathLink {
                key: c.key.clone(),
                from: c.from_device.clone(),
                to: c.to_device.clone(),
                from_hostname: hostname_of(&c.from_device),
                to_hostname: hostname_of(&c.to_device),
                src_port: c.src_port.clone(),
                dst_port: c.dst_port.clone(),
                speed: c
                    .speed
                    .as_ref()
                    .map_or_else(|| LinkSpeed::G1.to_string(), LinkSpeed::to_string),
                cable_type: c.cable_type.clone().unwrap_or_else(|| "unknown".to_string()),
            })
            .collect();

        Self {
            hops,
            cost,
            avg_cost,
            devices: path.devices.iter().map(|d| d.summary()).collect(),
            connections,
        }
    }
}

/// Result of analyzing paths between two devices
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathAnalysis {
    pub source: DeviceSummary,
    pub target: DeviceSummary,
    /// Fewest hops, then lowest cost
    pub shortest_path: Option<PathReport>,
    /// Lowest cost, then fewest hops
    pub cheapest_path: Option<PathReport>,
    pub alternative_paths: Vec<PathReport>,
    pub total_paths_found: usize,
    /// More paths may exist than were enumerated
    pub path_limit_reached: bool,
    /// Paths longer than the hop ceiling were not explored
    pub depth_limit_reached: bool,
}

/// Indices into the enumerated paths
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub shortest: Option<usize>,
    pub cheapest: Option<usize>,
    pub alternatives: Vec<usize>,
}

/// Pick shortest, cheapest and alternatives from `(hops, cost)` pairs in
/// enumeration order. Ties go to the earlier path. Alternatives exclude the
/// two picks by position, so identical-looking paths are still kept.
pub fn classify(scores: &[(usize, u32)]) -> Classification {
    let shortest = scores
        .iter()
        .enumerate()
        .min_by_key(|&(_, score)| (score.0, score.1))
        .map(|(i, _)| i);
    let cheapest = scores
        .iter()
        .enumerate()
        .min_by_key(|&(_, score)| (score.1, score.0))
        .map(|(i, _)| i);

    let mut alternatives: Vec<usize> = (0..scores.len())
        .filter(|&i| Some(i) != shortest && Some(i) != cheapest)
        .collect();
    // Stable: equal scores stay in enumeration order
    alternatives.sort_by_key(|&i| scores[i]);
    alternatives.truncate(MAX_ALTERNATIVES);

    Classification {
        shortest,
        cheapest,
        alternatives,
    }
}

/// Path queries against a topology store
pub struct PathAnalyzer<'a> {
    store: &'a dyn TopologyStore,
    limits: PathLimits,
}

impl<'a> PathAnalyzer<'a> {
    pub fn new(store: &'a dyn TopologyStore) -> Self {
        Self {
            store,
            limits: PathLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: PathLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Find and classify paths from `source` to `target`. No path at all is
    /// a normal result; an unknown device key is `NotFound`.
    pub fn analyze(&self, source: &str, target: &str) -> TopologyResult<PathAnalysis> {
        let source_device = self
            .store
            .fetch_device(source)
            .map_err(|e| rename_missing(e, Entity::SourceDevice))?;
        let target_device = self
            .store
            .fetch_device(target)
            .map_err(|e| rename_missing(e, Entity::TargetDevice))?;

        let found = self.store.enumerate_paths(source, target, self.limits)?;
        let reports: Vec<PathReport> = found.paths.iter().map(PathReport::from_raw).collect();
        let scores: Vec<(usize, u32)> = reports.iter().map(|r| (r.hops, r.cost)).collect();
        let picks = classify(&scores);

        debug!(
            "Path analysis {} -> {}: {} paths, shortest {:?}, cheapest {:?}",
            source,
            target,
            reports.len(),
            picks.shortest.map(|i| scores[i]),
            picks.cheapest.map(|i| scores[i])
        );

        let pick = |i: Option<usize>| i.map(|i| reports[i].clone());
        Ok(PathAnalysis {
            source: source_device.summary(),
            target: target_device.summary(),
            shortest_path: pick(picks.shortest),
            cheapest_path: pick(picks.cheapest),
            alternative_paths: picks.alternatives.iter().map(|&i| reports[i].clone()).collect(),
            total_paths_found: reports.len(),
            path_limit_reached: found.path_limit_reached,
            depth_limit_reached: found.depth_limit_reached,
        })
    }
}

fn rename_missing(err: TopologyError, entity: Entity) -> TopologyError {
    match err {
        TopologyError::NotFound { key, .. } => TopologyError::NotFound { entity, key },
        other => other,
    }
}
