//! Per-device view of neighbors and port bindings, the input for config export

use crate::error::TopologyResult;
use crate::graph::{TopologySnapshot, TopologyStore};
use crate::models::{Connection, Device, DeviceKind, LinkSpeed, Port, StaticRoute, Subnet, Vlan};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::net::Ipv4Addr;
use tracing::debug;

/// One live connection seen from a device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborLink {
    pub connection_key: String,
    pub neighbor_key: String,
    pub neighbor_hostname: String,
    pub neighbor_ip: Option<Ipv4Addr>,
    pub neighbor_type: DeviceKind,
    /// Port on this device
    pub my_port: String,
    pub neighbor_port: String,
    pub cable_type: Option<String>,
    pub speed: Option<LinkSpeed>,
    pub duplex: String,
    pub vlan_tags: Option<Vec<u16>>,
}

/// A device's stored attributes plus its resolved connections
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceProjection {
    pub key: String,
    pub hostname: String,
    pub device_type: DeviceKind,
    pub ip_address: Option<Ipv4Addr>,
    pub mac_address: Option<String>,
    pub subnet_mask: Option<Ipv4Addr>,
    pub gateway: Option<Ipv4Addr>,
    pub router_id: Option<Ipv4Addr>,
    pub ports: Vec<Port>,
    pub vlans: Vec<Vlan>,
    pub subnets: Vec<Subnet>,
    pub static_routes: Vec<StaticRoute>,
    /// Always present, empty for an unconnected device
    pub connections: Vec<NeighborLink>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

pub struct PortConnectionProjector<'a> {
    store: &'a dyn TopologyStore,
}

impl<'a> PortConnectionProjector<'a> {
    pub fn new(store: &'a dyn TopologyStore) -> Self {
        Self { store }
    }

    pub fn project(&self) -> TopologyResult<Vec<DeviceProjection>> {
        let snapshot = self.store.snapshot()?;
        let projections = project(&snapshot);
        debug!("Projected {} devices", projections.len());
        Ok(projections)
    }
}

/// Project every device of a snapshot, in device order
pub fn project(snapshot: &TopologySnapshot) -> Vec<DeviceProjection> {
    let by_key: HashMap<&str, &Device> = snapshot
        .devices
        .iter()
        .map(|d| (d.key.as_str(), d))
        .collect();

    let mut incident: HashMap<&str, Vec<&Connection>> = HashMap::new();
    for conn in &snapshot.connections {
        incident.entry(conn.from_device.as_str()).or_default().push(conn);
        if conn.to_device != conn.from_device {
            incident.entry(conn.to_device.as_str()).or_default().push(conn);
        }
    }

    snapshot
        .devices
        .iter()
        .map(|device| {
            let connections = incident
                .get(device.key.as_str())
                .map(|conns| {
                    conns
                        .iter()
                        .filter_map(|conn| neighbor_link(device, conn, &by_key))
                        .collect()
                })
                .unwrap_or_default();

            DeviceProjection {
                key: device.key.clone(),
                hostname: device.hostname.clone(),
                device_type: device.device_type.clone(),
                ip_address: device.ip_address,
                mac_address: device.mac_address.clone(),
                subnet_mask: device.subnet_mask,
                gateway: device.gateway,
                router_id: device.router_id,
                ports: device.ports.clone(),
                vlans: device.vlans.clone(),
                subnets: device.subnets.clone(),
                static_routes: device.static_routes.clone(),
                connections,
                metadata: device.metadata.clone(),
            }
        })
        .collect()
}

fn neighbor_link(
    device: &Device,
    conn: &Connection,
    by_key: &HashMap<&str, &Device>,
) -> Option<NeighborLink> {
    let (neighbor_key, neighbor_port, my_port) = conn.peer_of(&device.key)?;
    // Live connections only: the far end must exist
    let neighbor = by_key.get(neighbor_key)?;

    Some(NeighborLink {
        connection_key: conn.key.clone(),
        neighbor_key: neighbor.key.clone(),
        neighbor_hostname: neighbor.hostname.clone(),
        neighbor_ip: neighbor.ip_address,
        neighbor_type: neighbor.device_type.clone(),
        my_port: my_port.to_string(),
        neighbor_port: neighbor_port.to_string(),
        cable_type: conn.cable_type.clone(),
        speed: conn.speed.clone(),
        duplex: conn.duplex.clone(),
        vlan_tags: conn.vlan_tags.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphStore;

    fn snapshot() -> TopologySnapshot {
        TopologySnapshot {
            devices: vec![
                Device::new("r1", "core-1", "router")
                    .with_address(Ipv4Addr::new(192, 168, 0, 1), Ipv4Addr::new(255, 255, 255, 0))
                    .with_router_id(Ipv4Addr::new(1, 1, 1, 1))
                    .with_subnet(Subnet::new(
                        Ipv4Addr::new(192, 168, 10, 0),
                        Ipv4Addr::new(255, 255, 255, 0),
                        Ipv4Addr::new(192, 168, 10, 1),
                    ))
                    .with_static_route(
                        StaticRoute::new(Ipv4Addr::UNSPECIFIED, Ipv4Addr::UNSPECIFIED)
                            .via(Ipv4Addr::new(203, 0, 113, 1)),
                    ),
                Device::new("s1", "access-1", "switch").with_vlan(Vlan::new(10, "users")),
                Device::new("h1", "host-1", "server"),
            ],
            connections: vec![
                Connection::new("up", "s1", "gi0/1", "r1", "gi0/0")
                    .with_speed("10G")
                    .with_cable("fiber")
                    .with_vlan_tags(vec![10, 20]),
            ],
        }
    }

    #[test]
    fn test_both_ends_see_the_link() {
        let projections = project(&snapshot());
        assert_eq!(projections.len(), 3);

        let r1 = &projections[0];
        assert_eq!(r1.connections.len(), 1);
        let link = &r1.connections[0];
        assert_eq!(link.neighbor_key, "s1");
        assert_eq!(link.my_port, "gi0/0");
        assert_eq!(link.neighbor_port, "gi0/1");
        assert_eq!(link.vlan_tags, Some(vec![10, 20]));
        assert_eq!(r1.router_id, Some(Ipv4Addr::new(1, 1, 1, 1)));
        assert_eq!(r1.subnets.len(), 1);
        assert_eq!(r1.subnets[0].gateway, Ipv4Addr::new(192, 168, 10, 1));
        assert_eq!(r1.static_routes.len(), 1);
        assert_eq!(r1.static_routes[0].next_hop, Some(Ipv4Addr::new(203, 0, 113, 1)));
        assert!(r1.vlans.is_empty());

        let s1 = &projections[1];
        assert_eq!(s1.vlans, vec![Vlan::new(10, "users")]);
        assert!(s1.router_id.is_none());
        let link = &s1.connections[0];
        assert_eq!(link.neighbor_key, "r1");
        assert_eq!(link.neighbor_ip, Some(Ipv4Addr::new(192, 168, 0, 1)));
        assert_eq!(link.neighbor_type, DeviceKind::Router);
        assert_eq!(link.my_port, "gi0/1");
        assert_eq!(link.speed, Some(LinkSpeed::G10));
    }

    #[test]
    fn test_unconnected_device_has_empty_list() {
        let projections = project(&snapshot());
        let h1 = &projections[2];
        assert!(h1.connections.is_empty());

        let json = serde_json::to_value(h1).unwrap();
        assert_eq!(json["connections"], serde_json::json!([]));
    }

    #[test]
    fn test_project_from_store() {
        let store = GraphStore::in_memory();
        let snap = snapshot();
        store
            .replace_all(snap.devices.clone(), snap.connections.clone())
            .unwrap();
        let projections = PortConnectionProjector::new(&store).project().unwrap();
        assert_eq!(projections, project(&snap));
    }
}
