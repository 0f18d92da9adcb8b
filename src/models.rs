//! Topology data model
//!
//! Devices are graph vertices, connections are edges between device ports.
//! Field names accept the `_key`/`_from`/`_to` spelling used by exported
//! topology documents. Ports written in the flat layout (`ip_address`,
//! `mode`, `vlan`, `is_svi`, ...) are read into a [`PortRole`], and blank
//! address strings read as unset.

use crate::addressing;
use crate::error::{TopologyError, TopologyResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::net::Ipv4Addr;

/// Prefix some clients put in front of device keys on connection endpoints
const DEVICE_ID_PREFIX: &str = "devices/";

// ==================== Device kind ====================

/// Device role. Unknown strings are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceKind {
    Router,
    Switch,
    L3Switch,
    Server,
    Other(String),
}

impl DeviceKind {
    pub fn as_str(&self) -> &str {
        match self {
            DeviceKind::Router => "router",
            DeviceKind::Switch => "switch",
            DeviceKind::L3Switch => "l3_switch",
            DeviceKind::Server => "server",
            DeviceKind::Other(s) => s,
        }
    }
}

impl From<String> for DeviceKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "router" => DeviceKind::Router,
            "switch" => DeviceKind::Switch,
            "l3_switch" => DeviceKind::L3Switch,
            "server" => DeviceKind::Server,
            _ => DeviceKind::Other(s),
        }
    }
}

impl From<&str> for DeviceKind {
    fn from(s: &str) -> Self {
        DeviceKind::from(s.to_string())
    }
}

impl From<DeviceKind> for String {
    fn from(kind: DeviceKind) -> Self {
        match kind {
            DeviceKind::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// ==================== Link speed ====================

/// Negotiated link speed of a connection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LinkSpeed {
    M10,
    M100,
    G1,
    G10,
    G25,
    G40,
    G100,
    Other(String),
}

impl LinkSpeed {
    pub fn as_str(&self) -> &str {
        match self {
            LinkSpeed::M10 => "10M",
            LinkSpeed::M100 => "100M",
            LinkSpeed::G1 => "1G",
            LinkSpeed::G10 => "10G",
            LinkSpeed::G25 => "25G",
            LinkSpeed::G40 => "40G",
            LinkSpeed::G100 => "100G",
            LinkSpeed::Other(s) => s,
        }
    }

    /// Path-ranking weight of one hop over a link of this speed
    pub fn cost(&self) -> u32 {
        match self {
            LinkSpeed::G10 | LinkSpeed::G25 | LinkSpeed::G40 | LinkSpeed::G100 => 1,
            LinkSpeed::G1 => 5,
            LinkSpeed::M100 => 10,
            LinkSpeed::M10 | LinkSpeed::Other(_) => 20,
        }
    }
}

impl From<String> for LinkSpeed {
    fn from(s: String) -> Self {
        match s.as_str() {
            "10M" => LinkSpeed::M10,
            "100M" => LinkSpeed::M100,
            "1G" => LinkSpeed::G1,
            "10G" => LinkSpeed::G10,
            "25G" => LinkSpeed::G25,
            "40G" => LinkSpeed::G40,
            "100G" => LinkSpeed::G100,
            _ => LinkSpeed::Other(s),
        }
    }
}

impl From<&str> for LinkSpeed {
    fn from(s: &str) -> Self {
        LinkSpeed::from(s.to_string())
    }
}

impl From<LinkSpeed> for String {
    fn from(speed: LinkSpeed) -> Self {
        match speed {
            LinkSpeed::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for LinkSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

fn blank_speed_as_none<'de, D>(deserializer: D) -> Result<Option<LinkSpeed>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()).map(LinkSpeed::from))
}

/// Addresses may arrive as `""` in older documents; treat those as unset.
fn blank_addr_as_none<'de, D>(deserializer: D) -> Result<Option<Ipv4Addr>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

// ==================== Ports ====================

/// Layer-3 address bound to an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct L3Address {
    pub ip: Ipv4Addr,
    pub mask: Ipv4Addr,
}

impl L3Address {
    pub fn new(ip: Ipv4Addr, mask: Ipv4Addr) -> Self {
        Self { ip, mask }
    }

    pub fn network(&self) -> Ipv4Addr {
        addressing::network_of(self.ip, self.mask)
    }

    pub fn prefix_len(&self) -> Option<u8> {
        addressing::prefix_len(self.mask)
    }
}

/// What an interface is configured as. Only the fields meaningful for
/// that role are carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PortRole {
    #[default]
    Plain,
    Routed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        address: Option<L3Address>,
    },
    Access {
        vlan: u16,
    },
    Trunk {
        /// VLAN list or ranges, e.g. "10,20,30-40"
        #[serde(default, skip_serializing_if = "Option::is_none")]
        allowed_vlans: Option<String>,
    },
    Svi {
        vlan_id: u16,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        address: Option<L3Address>,
    },
    Subinterface {
        #[serde(default = "default_encapsulation")]
        encapsulation: String,
        vlan_id: u16,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        address: Option<L3Address>,
    },
    Loopback {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        address: Option<L3Address>,
    },
}

fn default_encapsulation() -> String {
    "dot1q".to_string()
}

fn default_port_type() -> String {
    "ethernet".to_string()
}

fn default_port_speed() -> String {
    "1Gbps".to_string()
}

fn default_port_status() -> String {
    "up".to_string()
}

/// A physical or logical interface on a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PortDoc")]
pub struct Port {
    pub name: String,
    #[serde(rename = "type", default = "default_port_type")]
    pub port_type: String,
    #[serde(default = "default_port_speed")]
    pub speed: String,
    #[serde(default = "default_port_status")]
    pub status: String,
    #[serde(default)]
    pub role: PortRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Port {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            port_type: default_port_type(),
            speed: default_port_speed(),
            status: default_port_status(),
            role: PortRole::Plain,
            description: None,
        }
    }

    /// A routed interface with an address
    pub fn routed(name: &str, ip: Ipv4Addr, mask: Ipv4Addr) -> Self {
        Self::new(name).with_role(PortRole::Routed {
            address: Some(L3Address::new(ip, mask)),
        })
    }

    pub fn with_role(mut self, role: PortRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Layer-3 address, if the role carries one and it is set
    pub fn address(&self) -> Option<&L3Address> {
        match &self.role {
            PortRole::Routed { address }
            | PortRole::Svi { address, .. }
            | PortRole::Subinterface { address, .. }
            | PortRole::Loopback { address } => address.as_ref(),
            PortRole::Plain | PortRole::Access { .. } | PortRole::Trunk { .. } => None,
        }
    }

    /// Drop the layer-3 address. Returns whether anything was cleared.
    pub fn clear_address(&mut self) -> bool {
        match &mut self.role {
            PortRole::Routed { address }
            | PortRole::Svi { address, .. }
            | PortRole::Subinterface { address, .. }
            | PortRole::Loopback { address } => address.take().is_some(),
            PortRole::Plain | PortRole::Access { .. } | PortRole::Trunk { .. } => false,
        }
    }
}

/// Wire shape of a port. Either a `role` object or the flat fields.
#[derive(Deserialize)]
struct PortDoc {
    name: String,
    #[serde(rename = "type", default = "default_port_type")]
    port_type: String,
    #[serde(default = "default_port_speed")]
    speed: String,
    #[serde(default = "default_port_status")]
    status: String,
    #[serde(default)]
    role: Option<PortRole>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, deserialize_with = "blank_addr_as_none")]
    ip_address: Option<Ipv4Addr>,
    #[serde(default, deserialize_with = "blank_addr_as_none")]
    subnet_mask: Option<Ipv4Addr>,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    vlan: Option<serde_json::Value>,
    #[serde(default)]
    encapsulation: Option<String>,
    #[serde(default)]
    vlan_id: Option<serde_json::Value>,
    #[serde(default)]
    is_svi: bool,
    #[serde(default)]
    is_routed: bool,
}

/// `10`, `"10"` and `" 10 "` all read as VLAN 10
fn loose_u16(value: Option<&serde_json::Value>) -> Option<u16> {
    match value? {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn loose_string(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

impl PortDoc {
    fn flat_role(&self) -> PortRole {
        let address = match (self.ip_address, self.subnet_mask) {
            (Some(ip), Some(mask)) => Some(L3Address::new(ip, mask)),
            _ => None,
        };
        let name = self.name.to_ascii_lowercase();
        let explicit_vlan_id = loose_u16(self.vlan_id.as_ref());

        if self.is_svi {
            let from_name = name.strip_prefix("vlan").and_then(|n| n.trim().parse().ok());
            if let Some(vlan_id) = explicit_vlan_id.or(from_name) {
                return PortRole::Svi { vlan_id, address };
            }
            return PortRole::Routed { address };
        }
        if self.port_type.eq_ignore_ascii_case("loopback") || name.starts_with("loopback") {
            return PortRole::Loopback { address };
        }
        let from_suffix = name
            .rsplit_once('.')
            .and_then(|(_, tag)| tag.parse().ok());
        if let Some(vlan_id) = explicit_vlan_id.or(from_suffix) {
            return PortRole::Subinterface {
                encapsulation: self
                    .encapsulation
                    .clone()
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(default_encapsulation),
                vlan_id,
                address,
            };
        }
        if self.is_routed || address.is_some() {
            return PortRole::Routed { address };
        }
        match self.mode.as_deref().map(str::trim) {
            Some("trunk") => PortRole::Trunk {
                allowed_vlans: loose_string(self.vlan.as_ref()),
            },
            Some("access") => PortRole::Access {
                vlan: loose_u16(self.vlan.as_ref()).unwrap_or(1),
            },
            _ => PortRole::Plain,
        }
    }
}

impl From<PortDoc> for Port {
    fn from(mut doc: PortDoc) -> Self {
        let role = doc.role.take().unwrap_or_else(|| doc.flat_role());
        Self {
            name: doc.name,
            port_type: doc.port_type,
            speed: doc.speed,
            status: doc.status,
            role,
            description: doc.description.filter(|d| !d.is_empty()),
        }
    }
}

// ==================== Device sub-records ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subnet {
    pub network: Ipv4Addr,
    pub mask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan_id: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Subnet {
    pub fn new(network: Ipv4Addr, mask: Ipv4Addr, gateway: Ipv4Addr) -> Self {
        Self {
            network,
            mask,
            gateway,
            vlan_id: None,
            description: None,
        }
    }
}

fn default_metric() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticRoute {
    pub destination_network: Ipv4Addr,
    pub subnet_mask: Ipv4Addr,
    #[serde(
        default,
        deserialize_with = "blank_addr_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub next_hop: Option<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_interface: Option<String>,
    #[serde(default = "default_metric")]
    pub metric: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl StaticRoute {
    pub fn new(destination_network: Ipv4Addr, subnet_mask: Ipv4Addr) -> Self {
        Self {
            destination_network,
            subnet_mask,
            next_hop: None,
            exit_interface: None,
            metric: default_metric(),
            description: None,
        }
    }

    pub fn via(mut self, next_hop: Ipv4Addr) -> Self {
        self.next_hop = Some(next_hop);
        self
    }
}

fn default_vlan_status() -> String {
    "active".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vlan {
    pub vlan_id: u16,
    pub name: String,
    #[serde(default = "default_vlan_status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Vlan {
    pub fn new(vlan_id: u16, name: &str) -> Self {
        Self {
            vlan_id,
            name: name.to_string(),
            status: default_vlan_status(),
            description: None,
        }
    }
}

/// Canvas position kept for the topology editor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UiPosition {
    pub x: f64,
    pub y: f64,
}

// ==================== Device ====================

/// A vertex in the topology graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    #[serde(alias = "_key")]
    pub key: String,
    pub hostname: String,
    pub device_type: DeviceKind,
    #[serde(
        default,
        deserialize_with = "blank_addr_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub ip_address: Option<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(
        default,
        deserialize_with = "blank_addr_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub subnet_mask: Option<Ipv4Addr>,
    #[serde(
        default,
        deserialize_with = "blank_addr_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub gateway: Option<Ipv4Addr>,
    /// Router ID for routing protocols
    #[serde(
        default,
        deserialize_with = "blank_addr_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub router_id: Option<Ipv4Addr>,
    #[serde(default)]
    pub ports: Vec<Port>,
    #[serde(default)]
    pub subnets: Vec<Subnet>,
    #[serde(default)]
    pub static_routes: Vec<StaticRoute>,
    #[serde(default)]
    pub vlans: Vec<Vlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_position: Option<UiPosition>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Device {
    pub fn new(key: &str, hostname: &str, device_type: impl Into<DeviceKind>) -> Self {
        Self {
            key: key.to_string(),
            hostname: hostname.to_string(),
            device_type: device_type.into(),
            ip_address: None,
            mac_address: None,
            subnet_mask: None,
            gateway: None,
            router_id: None,
            ports: Vec::new(),
            subnets: Vec::new(),
            static_routes: Vec::new(),
            vlans: Vec::new(),
            ui_position: None,
            metadata: BTreeMap::new(),
            created_at: None,
        }
    }

    pub fn with_port(mut self, port: Port) -> Self {
        self.ports.push(port);
        self
    }

    pub fn with_address(mut self, ip: Ipv4Addr, mask: Ipv4Addr) -> Self {
        self.ip_address = Some(ip);
        self.subnet_mask = Some(mask);
        self
    }

    pub fn with_router_id(mut self, router_id: Ipv4Addr) -> Self {
        self.router_id = Some(router_id);
        self
    }

    pub fn with_subnet(mut self, subnet: Subnet) -> Self {
        self.subnets.push(subnet);
        self
    }

    pub fn with_vlan(mut self, vlan: Vlan) -> Self {
        self.vlans.push(vlan);
        self
    }

    pub fn with_static_route(mut self, route: StaticRoute) -> Self {
        self.static_routes.push(route);
        self
    }

    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }

    pub fn port_mut(&mut self, name: &str) -> Option<&mut Port> {
        self.ports.iter_mut().find(|p| p.name == name)
    }

    pub fn summary(&self) -> DeviceSummary {
        DeviceSummary {
            key: self.key.clone(),
            hostname: self.hostname.clone(),
            device_type: self.device_type.clone(),
        }
    }
}

/// Key, hostname and type of a device, as reported by analyses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub key: String,
    pub hostname: String,
    pub device_type: DeviceKind,
}

// ==================== Connection ====================

fn default_duplex() -> String {
    "auto".to_string()
}

fn default_connection_status() -> String {
    "active".to_string()
}

/// An edge between a port on `from_device` and a port on `to_device`.
/// Direction is structural only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    #[serde(alias = "_key")]
    pub key: String,
    #[serde(alias = "_from")]
    pub from_device: String,
    #[serde(alias = "_to")]
    pub to_device: String,
    pub src_port: String,
    pub dst_port: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cable_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "blank_speed_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub speed: Option<LinkSpeed>,
    #[serde(default = "default_duplex")]
    pub duplex: String,
    #[serde(default = "default_connection_status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan_tags: Option<Vec<u16>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet: Option<String>,
    #[serde(
        default,
        deserialize_with = "blank_addr_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub src_ip: Option<Ipv4Addr>,
    #[serde(
        default,
        deserialize_with = "blank_addr_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub dst_ip: Option<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Connection {
    pub fn new(key: &str, from_device: &str, src_port: &str, to_device: &str, dst_port: &str) -> Self {
        Self {
            key: key.to_string(),
            from_device: from_device.to_string(),
            to_device: to_device.to_string(),
            src_port: src_port.to_string(),
            dst_port: dst_port.to_string(),
            cable_type: None,
            speed: None,
            duplex: default_duplex(),
            status: default_connection_status(),
            vlan_tags: None,
            subnet: None,
            src_ip: None,
            dst_ip: None,
            created_at: None,
        }
    }

    pub fn with_speed(mut self, speed: &str) -> Self {
        self.speed = Some(LinkSpeed::from(speed));
        self
    }

    pub fn with_cable(mut self, cable_type: &str) -> Self {
        self.cable_type = Some(cable_type.to_string());
        self
    }

    pub fn with_vlan_tags(mut self, tags: Vec<u16>) -> Self {
        self.vlan_tags = Some(tags);
        self
    }

    /// Hop cost; a connection without a speed is priced as 1G
    pub fn cost(&self) -> u32 {
        self.speed.as_ref().map_or(LinkSpeed::G1.cost(), LinkSpeed::cost)
    }

    pub fn touches(&self, device_key: &str) -> bool {
        self.from_device == device_key || self.to_device == device_key
    }

    /// The far side of this connection as seen from `device_key`:
    /// (neighbor key, neighbor port, local port).
    pub fn peer_of(&self, device_key: &str) -> Option<(&str, &str, &str)> {
        if self.from_device == device_key {
            Some((self.to_device.as_str(), self.dst_port.as_str(), self.src_port.as_str()))
        } else if self.to_device == device_key {
            Some((self.from_device.as_str(), self.src_port.as_str(), self.dst_port.as_str()))
        } else {
            None
        }
    }

    /// Strip a `devices/` collection prefix from both endpoints
    pub fn normalize_endpoints(&mut self) {
        for endpoint in [&mut self.from_device, &mut self.to_device] {
            if let Some(stripped) = endpoint.strip_prefix(DEVICE_ID_PREFIX) {
                *endpoint = stripped.to_string();
            }
        }
    }
}

// ==================== Topology document ====================

/// A full topology as saved and loaded in one piece
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl Topology {
    pub fn new(devices: Vec<Device>, connections: Vec<Connection>) -> Self {
        Self {
            devices,
            connections,
        }
    }

    /// Reject malformed input before it reaches the store
    pub fn validate(&self) -> TopologyResult<()> {
        let mut device_keys = HashSet::new();
        for device in &self.devices {
            if device.key.trim().is_empty() {
                return Err(invalid(format!(
                    "device '{}' has an empty key",
                    device.hostname
                )));
            }
            if !device_keys.insert(device.key.as_str()) {
                return Err(invalid(format!("duplicate device key '{}'", device.key)));
            }

            let mut port_names = HashSet::new();
            for port in &device.ports {
                if !port_names.insert(port.name.as_str()) {
                    return Err(invalid(format!(
                        "device '{}' has duplicate port '{}'",
                        device.key, port.name
                    )));
                }
                if let Some(addr) = port.address() {
                    check_mask(&device.key, &port.name, addr.mask)?;
                }
                match &port.role {
                    PortRole::Access { vlan: id }
                    | PortRole::Svi { vlan_id: id, .. }
                    | PortRole::Subinterface { vlan_id: id, .. } => {
                        check_vlan_id(&device.key, *id)?;
                    }
                    _ => {}
                }
            }

            if let Some(mask) = device.subnet_mask {
                check_mask(&device.key, "device", mask)?;
            }
            for vlan in &device.vlans {
                check_vlan_id(&device.key, vlan.vlan_id)?;
            }
        }

        let mut connection_keys = HashSet::new();
        for conn in &self.connections {
            if conn.key.trim().is_empty() {
                return Err(invalid(format!(
                    "connection {} -> {} has an empty key",
                    conn.from_device, conn.to_device
                )));
            }
            if !connection_keys.insert(conn.key.as_str()) {
                return Err(invalid(format!("duplicate connection key '{}'", conn.key)));
            }
            if let Some(tags) = &conn.vlan_tags {
                for tag in tags {
                    check_vlan_id(&conn.key, *tag)?;
                }
            }
        }

        Ok(())
    }

    pub fn normalize_endpoints(&mut self) {
        for conn in &mut self.connections {
            conn.normalize_endpoints();
        }
    }
}

fn invalid(message: String) -> TopologyError {
    TopologyError::Validation(message)
}

fn check_vlan_id(owner: &str, id: u16) -> TopologyResult<()> {
    if (1..=4094).contains(&id) {
        Ok(())
    } else {
        Err(invalid(format!("{}: VLAN id {} outside 1-4094", owner, id)))
    }
}

fn check_mask(device: &str, port: &str, mask: Ipv4Addr) -> TopologyResult<()> {
    match addressing::prefix_len(mask) {
        Some(_) => Ok(()),
        None => Err(invalid(format!(
            "{}/{}: {} is not a contiguous netmask",
            device, port, mask
        ))),
    }
}
