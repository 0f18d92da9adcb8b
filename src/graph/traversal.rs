//! Bounded simple-path enumeration over the topology graph
//!
//! Depth-first, treating every connection as usable in both directions.
//! A path never revisits a device and never continues past the target.
//! Discovery order is deterministic: neighbors are tried in connection order.
//!
//! Before each descent a breadth-first pass from the target, avoiding the
//! vertices already on the partial path, gives the hop distance left from
//! every neighbor. Neighbors that cannot reach the target within the
//! remaining hop budget are never entered, so every expanded vertex leads
//! to at least one reported path and the caps bound the total work.

use super::store_models::TopologyGraph;
use super::traits::{PathEnumeration, PathLimits, RawPath};
use petgraph::stable_graph::{EdgeIndex, NodeIndex};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use tracing::debug;

type Incidence = Vec<Vec<(EdgeIndex, NodeIndex)>>;

/// Enumerate simple paths from `source` to `target` within `limits`.
///
/// `source == target` yields the single zero-hop path.
pub fn enumerate_paths(
    topology: &TopologyGraph,
    source: NodeIndex,
    target: NodeIndex,
    limits: PathLimits,
) -> PathEnumeration {
    if source == target {
        return PathEnumeration {
            paths: vec![materialize(topology, &[source], &[])],
            ..Default::default()
        };
    }

    let search = run_search(topology, source, target, limits);
    debug!(
        "Path search expanded {} vertices, found {}",
        search.expanded,
        search.found.len()
    );

    PathEnumeration {
        paths: search
            .found
            .iter()
            .map(|(nodes, edges)| materialize(topology, nodes, edges))
            .collect(),
        path_limit_reached: search.path_limit_reached,
        depth_limit_reached: search.depth_limit_reached,
    }
}

fn run_search(
    topology: &TopologyGraph,
    source: NodeIndex,
    target: NodeIndex,
    limits: PathLimits,
) -> PathSearch {
    let mut search = PathSearch {
        incidence: topology.incidence_table(),
        target,
        limits,
        on_path: FxHashSet::default(),
        nodes: vec![source],
        edges: Vec::new(),
        found: Vec::new(),
        expanded: 0,
        path_limit_reached: false,
        depth_limit_reached: false,
    };
    search.on_path.insert(source);
    search.extend(source);
    search
}

struct PathSearch {
    incidence: Incidence,
    target: NodeIndex,
    limits: PathLimits,
    /// Vertices on the current partial path
    on_path: FxHashSet<NodeIndex>,
    nodes: Vec<NodeIndex>,
    edges: Vec<EdgeIndex>,
    found: Vec<(Vec<NodeIndex>, Vec<EdgeIndex>)>,
    /// Vertices expanded so far
    expanded: usize,
    path_limit_reached: bool,
    depth_limit_reached: bool,
}

impl PathSearch {
    fn neighbors(&self, node: NodeIndex) -> &[(EdgeIndex, NodeIndex)] {
        self.incidence
            .get(node.index())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Hop distance to the target from every vertex reachable without
    /// touching the partial path
    fn distances_to_target(&self) -> Vec<Option<usize>> {
        let mut dist = vec![None; self.incidence.len()];
        let mut queue = VecDeque::new();
        dist[self.target.index()] = Some(0);
        queue.push_back(self.target);

        while let Some(node) = queue.pop_front() {
            let next_dist = dist[node.index()].map_or(0, |d| d + 1);
            for &(_, next) in self.neighbors(node) {
                if self.on_path.contains(&next) || dist[next.index()].is_some() {
                    continue;
                }
                dist[next.index()] = Some(next_dist);
                queue.push_back(next);
            }
        }
        dist
    }

    fn extend(&mut self, node: NodeIndex) {
        self.expanded += 1;
        if self.edges.len() >= self.limits.max_hops {
            self.depth_limit_reached = true;
            return;
        }
        // Hops still allowed after taking one more edge
        let remaining = self.limits.max_hops.saturating_sub(self.edges.len() + 1);
        let dist = self.distances_to_target();
        let candidates = self.neighbors(node).to_vec();

        for (edge, next) in candidates {
            if self.path_limit_reached {
                return;
            }
            if self.on_path.contains(&next) {
                continue;
            }

            if next == self.target {
                if self.found.len() >= self.limits.max_paths {
                    self.path_limit_reached = true;
                    return;
                }
                let mut nodes = self.nodes.clone();
                nodes.push(next);
                let mut edges = self.edges.clone();
                edges.push(edge);
                self.found.push((nodes, edges));
                continue;
            }

            match dist[next.index()] {
                None => continue,
                Some(d) if d > remaining => {
                    // Reachable, but only by a path longer than the ceiling
                    self.depth_limit_reached = true;
                    continue;
                }
                Some(_) => {}
            }

            self.on_path.insert(next);
            self.nodes.push(next);
            self.edges.push(edge);

            self.extend(next);

            self.edges.pop();
            self.nodes.pop();
            self.on_path.remove(&next);
        }
    }
}

fn materialize(topology: &TopologyGraph, nodes: &[NodeIndex], edges: &[EdgeIndex]) -> RawPath {
    RawPath {
        devices: nodes
            .iter()
            .filter_map(|&idx| topology.device_at(idx).cloned())
            .collect(),
        connections: edges
            .iter()
            .filter_map(|&idx| topology.connection_at(idx).cloned())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Connection, Device};

    fn chain(len: usize) -> TopologyGraph {
        let devices = (0..=len)
            .map(|i| Device::new(&format!("d{}", i), &format!("D{}", i), "router"))
            .collect();
        let connections = (0..len)
            .map(|i| {
                Connection::new(
                    &format!("c{}", i),
                    &format!("d{}", i),
                    "east",
                    &format!("d{}", i + 1),
                    "west",
                )
            })
            .collect();
        TopologyGraph::build(devices, connections).unwrap()
    }

    fn run(topo: &TopologyGraph, from: &str, to: &str, limits: PathLimits) -> PathEnumeration {
        enumerate_paths(
            topo,
            topo.device_index(from).unwrap(),
            topo.device_index(to).unwrap(),
            limits,
        )
    }

    /// Full mesh k0..k{n-1}, plus `t` hanging off k0
    fn clique_with_tail(n: usize) -> TopologyGraph {
        let mut devices: Vec<Device> = (0..n)
            .map(|i| Device::new(&format!("k{}", i), &format!("K{}", i), "switch"))
            .collect();
        devices.push(Device::new("t", "T", "server"));
        let mut connections = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                connections.push(Connection::new(
                    &format!("k{}-k{}", i, j),
                    &format!("k{}", i),
                    &format!("p{}", j),
                    &format!("k{}", j),
                    &format!("p{}", i),
                ));
            }
        }
        connections.push(Connection::new("tail", "k0", "uplink", "t", "eth0"));
        TopologyGraph::build(devices, connections).unwrap()
    }

    fn search(topo: &TopologyGraph, from: &str, to: &str) -> PathSearch {
        run_search(
            topo,
            topo.device_index(from).unwrap(),
            topo.device_index(to).unwrap(),
            PathLimits::default(),
        )
    }

    #[test]
    fn test_dense_mesh_dead_ends_are_not_entered() {
        let topo = clique_with_tail(12);
        let started = std::time::Instant::now();
        let result = search(&topo, "k0", "t");

        assert_eq!(result.found.len(), 1);
        assert_eq!(result.found[0].1.len(), 1);
        // Only the source is expanded: no mesh vertex can reach `t` without k0
        assert_eq!(result.expanded, 1);
        assert!(!result.depth_limit_reached);
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[test]
    fn test_dense_mesh_work_is_bounded_by_caps() {
        let topo = clique_with_tail(12);
        let limits = PathLimits::default();
        let result = search(&topo, "t", "k5");

        assert_eq!(result.found.len(), limits.max_paths);
        assert!(result.path_limit_reached);
        assert!(result.expanded <= (limits.max_paths + 1) * limits.max_hops);
        for (nodes, edges) in &result.found {
            assert!(edges.len() <= limits.max_hops);
            assert_eq!(nodes.len(), edges.len() + 1);
        }
    }

    #[test]
    fn test_unreachable_side_branch_does_not_flag_depth() {
        // a - b - c plus a long spur off a that never reaches c
        let mut devices: Vec<Device> = ["a", "b", "c"]
            .iter()
            .map(|k| Device::new(k, k, "router"))
            .collect();
        let mut connections = vec![
            Connection::new("ab", "a", "1", "b", "1"),
            Connection::new("bc", "b", "2", "c", "1"),
        ];
        let mut prev = "a".to_string();
        for i in 0..15 {
            let key = format!("s{}", i);
            devices.push(Device::new(&key, &key, "switch"));
            connections.push(Connection::new(&format!("spur{}", i), &prev, "up", &key, "down"));
            prev = key;
        }
        let topo = TopologyGraph::build(devices, connections).unwrap();

        let result = run(&topo, "a", "c", PathLimits::default());
        assert_eq!(result.paths.len(), 1);
        assert!(!result.depth_limit_reached);
    }

    #[test]
    fn test_reverse_orientation_is_traversable() {
        let topo = chain(3);
        let result = run(&topo, "d3", "d0", PathLimits::default());
        assert_eq!(result.paths.len(), 1);
        let keys: Vec<&str> = result.paths[0].devices.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["d3", "d2", "d1", "d0"]);
        assert_eq!(result.paths[0].hop_count(), 3);
    }

    #[test]
    fn test_exactly_max_hops_is_found() {
        let topo = chain(10);
        let result = run(&topo, "d0", "d10", PathLimits::default());
        assert_eq!(result.paths.len(), 1);
        assert_eq!(result.paths[0].hop_count(), 10);
    }

    #[test]
    fn test_beyond_max_hops_reports_depth_limit() {
        let topo = chain(11);
        let result = run(&topo, "d0", "d11", PathLimits::default());
        assert!(result.paths.is_empty());
        assert!(result.depth_limit_reached);
        assert!(!result.path_limit_reached);
    }

    #[test]
    fn test_parallel_links_are_distinct_paths() {
        let topo = TopologyGraph::build(
            vec![Device::new("a", "A", "router"), Device::new("b", "B", "router")],
            vec![
                Connection::new("l1", "a", "g0", "b", "g0"),
                Connection::new("l2", "b", "g1", "a", "g1"),
            ],
        )
        .unwrap();
        let result = run(&topo, "a", "b", PathLimits::default());
        assert_eq!(result.paths.len(), 2);
        assert_eq!(result.paths[0].connections[0].key, "l1");
        assert_eq!(result.paths[1].connections[0].key, "l2");
    }

    #[test]
    fn test_path_cap() {
        // 25 parallel links between two devices
        let connections = (0..25)
            .map(|i| Connection::new(&format!("l{}", i), "a", &format!("p{}", i), "b", &format!("p{}", i)))
            .collect();
        let topo = TopologyGraph::build(
            vec![Device::new("a", "A", "switch"), Device::new("b", "B", "switch")],
            connections,
        )
        .unwrap();
        let result = run(&topo, "a", "b", PathLimits::default());
        assert_eq!(result.paths.len(), 20);
        assert!(result.path_limit_reached);
    }

    #[test]
    fn test_cycles_do_not_revisit() {
        // square a-b-c-d-a: two simple paths from a to c
        let topo = TopologyGraph::build(
            ["a", "b", "c", "d"]
                .iter()
                .map(|k| Device::new(k, k, "router"))
                .collect(),
            vec![
                Connection::new("ab", "a", "1", "b", "1"),
                Connection::new("bc", "b", "2", "c", "1"),
                Connection::new("cd", "c", "2", "d", "1"),
                Connection::new("da", "d", "2", "a", "2"),
            ],
        )
        .unwrap();
        let result = run(&topo, "a", "c", PathLimits::default());
        assert_eq!(result.paths.len(), 2);
        for path in &result.paths {
            assert_eq!(path.hop_count(), 2);
            assert_eq!(path.devices.len(), 3);
        }
    }

    #[test]
    fn test_same_source_and_target() {
        let topo = chain(2);
        let result = run(&topo, "d1", "d1", PathLimits::default());
        assert_eq!(result.paths.len(), 1);
        assert_eq!(result.paths[0].hop_count(), 0);
        assert_eq!(result.paths[0].devices[0].key, "d1");
    }

    #[test]
    fn test_disconnected() {
        let topo = TopologyGraph::build(
            vec![Device::new("a", "A", "server"), Device::new("b", "B", "server")],
            vec![],
        )
        .unwrap();
        let result = run(&topo, "a", "b", PathLimits::default());
        assert!(result.paths.is_empty());
        assert!(!result.depth_limit_reached);
    }
}
