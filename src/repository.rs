//! Topology repository: whole-topology replace and cascading deletes
//!
//! Deletes repair the neighbors first. A port facing a removed peer has
//! its layer-3 address cleared before the connection goes, and every
//! connection goes before the device itself. The steps are sequential
//! store calls, not one transaction: a failure part way through leaves
//! the steps already taken in place.

use crate::audit::{AuditAction, AuditEntity, AuditEntry, AuditSink};
use crate::error::{Entity, TopologyError, TopologyResult};
use crate::graph::TopologyStore;
use crate::models::{L3Address, Topology};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Keys present before a replace, used to tell new entities from re-saved ones
#[derive(Debug, Clone, Default)]
pub struct KeySnapshot {
    pub devices: HashSet<String>,
    pub connections: HashSet<String>,
}

impl KeySnapshot {
    /// Incoming device keys not in the snapshot, in input order
    pub fn new_device_keys(&self, topology: &Topology) -> Vec<String> {
        topology
            .devices
            .iter()
            .filter(|d| !self.devices.contains(&d.key))
            .map(|d| d.key.clone())
            .collect()
    }

    /// Incoming connection keys not in the snapshot, in input order
    pub fn new_connection_keys(&self, topology: &Topology) -> Vec<String> {
        topology
            .connections
            .iter()
            .filter(|c| !self.connections.contains(&c.key))
            .map(|c| c.key.clone())
            .collect()
    }
}

/// Outcome of a successful replace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveSummary {
    pub devices_created: usize,
    pub connections_created: usize,
    /// Keys that did not exist before this save
    pub new_device_keys: Vec<String>,
    pub new_connection_keys: Vec<String>,
}

/// A port whose address was cleared because its peer went away
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepairedPort {
    pub device: String,
    pub port: String,
    pub cleared: L3Address,
}

/// What a cascading delete removed and repaired
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CascadeReport {
    pub entity: String,
    pub key: String,
    pub removed_connections: Vec<String>,
    pub repaired_ports: Vec<RepairedPort>,
}

/// Mutations of the device and connection sets
pub struct TopologyRepository<'a> {
    store: &'a dyn TopologyStore,
    audit: &'a dyn AuditSink,
    actor: &'a str,
    database: &'a str,
}

impl<'a> TopologyRepository<'a> {
    pub fn new(store: &'a dyn TopologyStore, audit: &'a dyn AuditSink) -> Self {
        Self {
            store,
            audit,
            actor: "system",
            database: "",
        }
    }

    /// Name recorded as `user` on audit entries
    pub fn with_actor(mut self, actor: &'a str) -> Self {
        self.actor = actor;
        self
    }

    /// Database name recorded on audit entries
    pub fn with_database(mut self, database: &'a str) -> Self {
        self.database = database;
        self
    }

    /// Current device and connection keys
    pub fn prior_keys(&self) -> TopologyResult<KeySnapshot> {
        let snapshot = self.store.snapshot()?;
        Ok(KeySnapshot {
            devices: snapshot.devices.into_iter().map(|d| d.key).collect(),
            connections: snapshot.connections.into_iter().map(|c| c.key).collect(),
        })
    }

    /// Discard the current topology and install `topology` in its place.
    /// All or nothing: on error the previous topology is still there.
    pub fn replace_topology(&self, mut topology: Topology) -> TopologyResult<SaveSummary> {
        topology.normalize_endpoints();
        topology.validate()?;

        // Only feeds the audit diff; a failed read means "everything is new"
        let prior = self.prior_keys().unwrap_or_else(|e| {
            warn!("Could not read existing keys before save: {}", e);
            KeySnapshot::default()
        });
        let new_device_keys = prior.new_device_keys(&topology);
        let new_connection_keys = prior.new_connection_keys(&topology);

        let now = Utc::now();
        for device in &mut topology.devices {
            device.created_at = Some(now);
        }
        for conn in &mut topology.connections {
            conn.created_at = Some(now);
        }

        let summary = SaveSummary {
            devices_created: topology.devices.len(),
            connections_created: topology.connections.len(),
            new_device_keys,
            new_connection_keys,
        };
        let audit_batch = self.creation_entries(&topology, &summary);
        let bulk_entry = self.entry(
            AuditAction::BulkSave,
            AuditEntity::Topology,
            "full_topology",
            json!({
                "device_count": summary.devices_created,
                "connection_count": summary.connections_created,
                "device_keys": topology.devices.iter().map(|d| d.key.as_str()).collect::<Vec<_>>(),
                "connection_keys": topology.connections.iter().map(|c| c.key.as_str()).collect::<Vec<_>>(),
            }),
        );

        self.store
            .replace_all(topology.devices, topology.connections)?;
        info!(
            "Saved topology: {} devices ({} new), {} connections ({} new)",
            summary.devices_created,
            summary.new_device_keys.len(),
            summary.connections_created,
            summary.new_connection_keys.len()
        );

        self.audit(audit_batch);
        self.audit(vec![bulk_entry]);
        Ok(summary)
    }

    fn creation_entries(&self, topology: &Topology, summary: &SaveSummary) -> Vec<AuditEntry> {
        let new_devices: HashSet<&str> = summary.new_device_keys.iter().map(String::as_str).collect();
        let new_connections: HashSet<&str> =
            summary.new_connection_keys.iter().map(String::as_str).collect();

        let devices = topology
            .devices
            .iter()
            .filter(|d| new_devices.contains(d.key.as_str()))
            .map(|d| {
                self.entry(
                    AuditAction::Create,
                    AuditEntity::Device,
                    &d.key,
                    json!({
                        "hostname": d.hostname,
                        "type": d.device_type,
                        "ip": d.ip_address,
                    }),
                )
            });
        let connections = topology
            .connections
            .iter()
            .filter(|c| new_connections.contains(c.key.as_str()))
            .map(|c| {
                self.entry(
                    AuditAction::Create,
                    AuditEntity::Connection,
                    &c.key,
                    json!({
                        "from_device": c.from_device,
                        "to_device": c.to_device,
                        "src_port": c.src_port,
                        "dst_port": c.dst_port,
                        "cable_type": c.cable_type,
                    }),
                )
            });
        devices.chain(connections).collect()
    }

    /// Remove a device, every connection touching it, and the addresses
    /// on neighbor ports that faced it.
    pub fn delete_device(&self, key: &str) -> TopologyResult<CascadeReport> {
        let device = self.store.fetch_device(key)?;
        let attached = self.store.incident_connections(key)?;

        let mut report = CascadeReport {
            entity: Entity::Device.to_string(),
            key: key.to_string(),
            removed_connections: Vec::with_capacity(attached.len()),
            repaired_ports: Vec::new(),
        };

        for conn in &attached {
            if let Some((neighbor, neighbor_port, _)) = conn.peer_of(key) {
                // Self-loop ports disappear with the device
                if neighbor != key {
                    report
                        .repaired_ports
                        .extend(self.clear_port_address(neighbor, neighbor_port)?);
                }
            }
            self.store.delete_connection(&conn.key)?;
            report.removed_connections.push(conn.key.clone());
        }

        self.store.delete_device(key)?;
        info!(
            "Deleted device {}: {} connections removed, {} neighbor ports repaired",
            key,
            report.removed_connections.len(),
            report.repaired_ports.len()
        );

        self.audit(vec![self.entry(
            AuditAction::Delete,
            AuditEntity::Device,
            key,
            snapshot_of(&device),
        )]);
        Ok(report)
    }

    /// Remove a connection, clearing the addresses on the ports at both ends
    pub fn delete_connection(&self, key: &str) -> TopologyResult<CascadeReport> {
        let conn = self.store.fetch_connection(key)?;

        let mut report = CascadeReport {
            entity: Entity::Connection.to_string(),
            key: key.to_string(),
            removed_connections: vec![key.to_string()],
            repaired_ports: Vec::new(),
        };
        report
            .repaired_ports
            .extend(self.clear_port_address(&conn.from_device, &conn.src_port)?);
        report
            .repaired_ports
            .extend(self.clear_port_address(&conn.to_device, &conn.dst_port)?);

        self.store.delete_connection(key)?;
        info!(
            "Deleted connection {}: {} ports repaired",
            key,
            report.repaired_ports.len()
        );

        self.audit(vec![self.entry(
            AuditAction::Delete,
            AuditEntity::Connection,
            key,
            snapshot_of(&conn),
        )]);
        Ok(report)
    }

    /// Clear the address on one port and persist the device. Missing
    /// devices, missing ports and ports without an address are no-ops.
    fn clear_port_address(
        &self,
        device_key: &str,
        port_name: &str,
    ) -> TopologyResult<Option<RepairedPort>> {
        let mut device = match self.store.fetch_device(device_key) {
            Ok(d) => d,
            Err(TopologyError::NotFound { .. }) => {
                debug!("Endpoint {} already gone, nothing to repair", device_key);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let Some(port) = device.port_mut(port_name) else {
            return Ok(None);
        };
        let Some(cleared) = port.address().copied() else {
            return Ok(None);
        };
        port.clear_address();

        self.store.update_device(device)?;
        debug!("Cleared {} on {}/{}", cleared.ip, device_key, port_name);
        self.audit(vec![self.entry(
            AuditAction::Update,
            AuditEntity::Device,
            device_key,
            json!({
                "port": port_name,
                "cleared_ip": cleared.ip,
                "cleared_mask": cleared.mask,
            }),
        )]);
        Ok(Some(RepairedPort {
            device: device_key.to_string(),
            port: port_name.to_string(),
            cleared,
        }))
    }

    fn entry(
        &self,
        action: AuditAction,
        entity: AuditEntity,
        id: &str,
        data: serde_json::Value,
    ) -> AuditEntry {
        AuditEntry::new(action, entity, id, data)
            .by(self.actor)
            .in_database(self.database)
    }

    /// Hand entries to the audit sink. Failures are logged, never returned.
    fn audit(&self, entries: Vec<AuditEntry>) {
        if entries.is_empty() {
            return;
        }
        let count = entries.len();
        if let Err(e) = self.audit.record_batch(entries) {
            warn!("Failed to record {} audit entries: {}", count, e);
        }
    }
}

fn snapshot_of<T: Serialize>(entity: &T) -> serde_json::Value {
    serde_json::to_value(entity).unwrap_or_default()
}
