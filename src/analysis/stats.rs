//! Connectivity statistics over one topology snapshot

use crate::error::TopologyResult;
use crate::graph::{TopologySnapshot, TopologyStore};
use crate::models::{Device, DeviceKind, DeviceSummary};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Devices listed in `most_connected`
pub const TOP_CONNECTED: usize = 5;

const UNKNOWN_CABLE: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub total_devices: usize,
    pub total_connections: usize,
    pub average_connections_per_device: f64,
    pub isolated_device_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeCount {
    pub device_type: DeviceKind,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CableCount {
    pub cable_type: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceDegree {
    pub key: String,
    pub hostname: String,
    pub device_type: DeviceKind,
    /// Connections with this device as `from` plus those with it as `to`
    pub connection_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortStats {
    pub device_type: DeviceKind,
    pub device_count: usize,
    pub total_ports: usize,
    pub average_ports_per_device: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VlanStats {
    pub device_type: DeviceKind,
    pub devices_with_vlans: usize,
    pub total_vlans: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteStats {
    pub device_type: DeviceKind,
    pub devices_with_routes: usize,
    pub total_routes: usize,
}

/// Full statistics snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkStatistics {
    pub overview: Overview,
    pub devices_by_type: Vec<TypeCount>,
    pub connections_by_cable_type: Vec<CableCount>,
    pub most_connected_devices: Vec<DeviceDegree>,
    pub isolated_devices: Vec<DeviceSummary>,
    pub port_statistics: Vec<PortStats>,
    pub vlan_statistics: Vec<VlanStats>,
    pub route_statistics: Vec<RouteStats>,
}

/// Computes [`NetworkStatistics`] from a store
pub struct ConnectivityAggregator<'a> {
    store: &'a dyn TopologyStore,
}

impl<'a> ConnectivityAggregator<'a> {
    pub fn new(store: &'a dyn TopologyStore) -> Self {
        Self { store }
    }

    pub fn compute(&self) -> TopologyResult<NetworkStatistics> {
        let snapshot = self.store.snapshot()?;
        let stats = aggregate(&snapshot);
        debug!(
            "Statistics: {} devices, {} connections, {} isolated",
            stats.overview.total_devices,
            stats.overview.total_connections,
            stats.overview.isolated_device_count
        );
        Ok(stats)
    }
}

/// Pure aggregation over a snapshot
pub fn aggregate(snapshot: &TopologySnapshot) -> NetworkStatistics {
    let devices = &snapshot.devices;
    let connections = &snapshot.connections;

    // Degree: each endpoint counted separately, so a self-loop counts twice
    let mut degree: HashMap<&str, usize> = HashMap::with_capacity(devices.len());
    for conn in connections {
        *degree.entry(conn.from_device.as_str()).or_default() += 1;
        *degree.entry(conn.to_device.as_str()).or_default() += 1;
    }

    let degrees: Vec<DeviceDegree> = devices
        .iter()
        .map(|d| DeviceDegree {
            key: d.key.clone(),
            hostname: d.hostname.clone(),
            device_type: d.device_type.clone(),
            connection_count: degree.get(d.key.as_str()).copied().unwrap_or(0),
        })
        .collect();

    let isolated_devices: Vec<DeviceSummary> = devices
        .iter()
        .zip(&degrees)
        .filter(|(_, d)| d.connection_count == 0)
        .map(|(device, _)| device.summary())
        .collect();

    let average_connections_per_device = if degrees.is_empty() {
        0.0
    } else {
        degrees.iter().map(|d| d.connection_count).sum::<usize>() as f64 / degrees.len() as f64
    };

    let mut most_connected = degrees;
    // Stable sort: ties keep enumeration order
    most_connected.sort_by(|a, b| b.connection_count.cmp(&a.connection_count));
    most_connected.truncate(TOP_CONNECTED);

    NetworkStatistics {
        overview: Overview {
            total_devices: devices.len(),
            total_connections: connections.len(),
            average_connections_per_device,
            isolated_device_count: isolated_devices.len(),
        },
        devices_by_type: count_desc(devices.iter().map(|d| d.device_type.clone()))
            .into_iter()
            .map(|(device_type, count)| TypeCount { device_type, count })
            .collect(),
        connections_by_cable_type: count_desc(connections.iter().map(|c| {
            c.cable_type
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| UNKNOWN_CABLE.to_string())
        }))
        .into_iter()
        .map(|(cable_type, count)| CableCount { cable_type, count })
        .collect(),
        most_connected_devices: most_connected,
        isolated_devices,
        port_statistics: per_type(devices, |d| d.ports.len())
            .into_iter()
            .map(|(device_type, (device_count, total_ports))| PortStats {
                device_type,
                device_count,
                total_ports,
                average_ports_per_device: total_ports as f64 / device_count as f64,
            })
            .collect(),
        vlan_statistics: per_type(devices, |d| d.vlans.len())
            .into_iter()
            .map(|(device_type, (devices_with_vlans, total_vlans))| VlanStats {
                device_type,
                devices_with_vlans,
                total_vlans,
            })
            .collect(),
        route_statistics: per_type(devices, |d| d.static_routes.len())
            .into_iter()
            .map(|(device_type, (devices_with_routes, total_routes))| RouteStats {
                device_type,
                devices_with_routes,
                total_routes,
            })
            .collect(),
    }
}

/// Count occurrences, most frequent first; ties keep first-seen order
fn count_desc<K, I>(items: I) -> Vec<(K, usize)>
where
    K: std::hash::Hash + Eq,
    I: IntoIterator<Item = K>,
{
    let mut counts: IndexMap<K, usize> = IndexMap::new();
    for item in items {
        *counts.entry(item).or_default() += 1;
    }
    let mut counts: Vec<(K, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// (devices with a non-zero count, summed count) per device type, by type name
fn per_type<F>(devices: &[Device], count: F) -> Vec<(DeviceKind, (usize, usize))>
where
    F: Fn(&Device) -> usize,
{
    let mut groups: BTreeMap<&str, (DeviceKind, usize, usize)> = BTreeMap::new();
    for device in devices {
        let n = count(device);
        if n == 0 {
            continue;
        }
        let group = groups
            .entry(device.device_type.as_str())
            .or_insert_with(|| (device.device_type.clone(), 0, 0));
        group.1 += 1;
        group.2 += n;
    }
    groups
        .into_values()
        .map(|(kind, with, total)| (kind, (with, total)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphStore;
    use crate::models::{Connection, Port, StaticRoute, Vlan};
    use std::net::Ipv4Addr;

    fn sample() -> TopologySnapshot {
        let route = StaticRoute::new(Ipv4Addr::new(0, 0, 0, 0), Ipv4Addr::new(0, 0, 0, 0))
            .via(Ipv4Addr::new(10, 0, 0, 1));
        TopologySnapshot {
            devices: vec![
                Device::new("r1", "core-1", "router")
                    .with_port(Port::new("g0"))
                    .with_port(Port::new("g1"))
                    .with_static_route(route.clone()),
                Device::new("s1", "access-1", "switch")
                    .with_port(Port::new("f0"))
                    .with_vlan(Vlan::new(10, "users"))
                    .with_vlan(Vlan::new(20, "voice")),
                Device::new("s2", "access-2", "switch").with_port(Port::new("f0")),
                Device::new("h1", "host-1", "server"),
                Device::new("r2", "core-2", "router"),
            ],
            connections: vec![
                Connection::new("a", "r1", "g0", "s1", "f0").with_cable("cat6"),
                Connection::new("b", "r1", "g1", "s2", "f0").with_cable("fiber"),
                Connection::new("c", "s2", "f1", "s1", "f1").with_cable("cat6"),
                Connection::new("d", "r1", "g2", "s1", "f2"),
            ],
        }
    }

    #[test]
    fn test_overview_and_groups() {
        let stats = aggregate(&sample());
        assert_eq!(stats.overview.total_devices, 5);
        assert_eq!(stats.overview.total_connections, 4);
        // 8 endpoint incidences over 5 devices
        assert_eq!(stats.overview.average_connections_per_device, 1.6);

        let types: Vec<(&str, usize)> = stats
            .devices_by_type
            .iter()
            .map(|t| (t.device_type.as_str(), t.count))
            .collect();
        assert_eq!(types, vec![("router", 2), ("switch", 2), ("server", 1)]);
        let total: usize = stats.devices_by_type.iter().map(|t| t.count).sum();
        assert_eq!(total, stats.overview.total_devices);

        let cables: Vec<(&str, usize)> = stats
            .connections_by_cable_type
            .iter()
            .map(|c| (c.cable_type.as_str(), c.count))
            .collect();
        assert_eq!(cables, vec![("cat6", 2), ("fiber", 1), ("unknown", 1)]);
    }

    #[test]
    fn test_degree_and_isolation() {
        let stats = aggregate(&sample());
        let top: Vec<(&str, usize)> = stats
            .most_connected_devices
            .iter()
            .map(|d| (d.key.as_str(), d.connection_count))
            .collect();
        assert_eq!(
            top,
            vec![("r1", 3), ("s1", 3), ("s2", 2), ("h1", 0), ("r2", 0)]
        );

        let isolated: Vec<&str> = stats.isolated_devices.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(isolated, vec!["h1", "r2"]);
        assert_eq!(stats.overview.isolated_device_count, 2);
    }

    #[test]
    fn test_per_type_restricted_to_devices_having_items() {
        let stats = aggregate(&sample());

        assert_eq!(stats.port_statistics.len(), 2);
        assert_eq!(stats.port_statistics[0].device_type.as_str(), "router");
        assert_eq!(stats.port_statistics[0].device_count, 1);
        assert_eq!(stats.port_statistics[0].total_ports, 2);
        assert_eq!(stats.port_statistics[1].device_type.as_str(), "switch");
        assert_eq!(stats.port_statistics[1].device_count, 2);
        assert_eq!(stats.port_statistics[1].average_ports_per_device, 1.0);

        assert_eq!(
            stats.vlan_statistics,
            vec![VlanStats {
                device_type: DeviceKind::Switch,
                devices_with_vlans: 1,
                total_vlans: 2,
            }]
        );
        assert_eq!(stats.route_statistics.len(), 1);
        assert_eq!(stats.route_statistics[0].total_routes, 1);
    }

    #[test]
    fn test_empty_topology() {
        let stats = aggregate(&TopologySnapshot::default());
        assert_eq!(stats.overview.total_devices, 0);
        assert_eq!(stats.overview.average_connections_per_device, 0.0);
        assert!(stats.devices_by_type.is_empty());
        assert!(stats.most_connected_devices.is_empty());
        assert!(stats.port_statistics.is_empty());
    }

    #[test]
    fn test_self_loop_counts_both_ends() {
        let snapshot = TopologySnapshot {
            devices: vec![Device::new("s", "sw", "switch")],
            connections: vec![Connection::new("loop", "s", "1", "s", "2")],
        };
        let stats = aggregate(&snapshot);
        assert_eq!(stats.most_connected_devices[0].connection_count, 2);
        assert!(stats.isolated_devices.is_empty());
    }

    #[test]
    fn test_compute_reads_store() {
        let store = GraphStore::in_memory();
        let snapshot = sample();
        store
            .replace_all(snapshot.devices.clone(), snapshot.connections.clone())
            .unwrap();
        let stats = ConnectivityAggregator::new(&store).compute().unwrap();
        assert_eq!(stats, aggregate(&snapshot));
    }
}
