use crate::error::{TopologyError, TopologyResult};
use crate::models::{Connection, Device};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, NodeIndexable};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// A stored entity plus its position in enumeration order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record<T> {
    pub seq: u64,
    pub record: T,
}

impl<T> Record<T> {
    pub fn new(seq: u64, record: T) -> Self {
        Self { seq, record }
    }
}

/// Devices as vertices, connections as edges, indexed by key.
///
/// Nodes and edges are only ever added while building, so index order
/// matches `seq` order for the lifetime of the graph.
#[derive(Debug, Default)]
pub struct TopologyGraph {
    graph: StableDiGraph<Record<Device>, Record<Connection>>,
    devices: HashMap<String, NodeIndex>,
    connections: HashMap<String, EdgeIndex>,
}

impl TopologyGraph {
    /// Build from fresh entity lists; positions become `seq`. Duplicate keys
    /// and connections to unknown devices fail the whole build.
    pub fn build(devices: Vec<Device>, connections: Vec<Connection>) -> TopologyResult<Self> {
        let mut topology = Self::default();
        for (seq, device) in devices.into_iter().enumerate() {
            topology.insert_device(Record::new(seq as u64, device))?;
        }
        for (seq, conn) in connections.into_iter().enumerate() {
            topology.insert_connection(Record::new(seq as u64, conn))?;
        }
        Ok(topology)
    }

    /// Rebuild from persisted records. Unusable records are skipped.
    pub fn restore(
        mut devices: Vec<Record<Device>>,
        mut connections: Vec<Record<Connection>>,
    ) -> Self {
        devices.sort_by_key(|r| r.seq);
        connections.sort_by_key(|r| r.seq);

        let mut topology = Self::default();
        for record in devices {
            if let Err(e) = topology.insert_device(record) {
                warn!("Skipping stored device: {}", e);
            }
        }
        for record in connections {
            if let Err(e) = topology.insert_connection(record) {
                warn!("Skipping stored connection: {}", e);
            }
        }
        topology
    }

    fn insert_device(&mut self, record: Record<Device>) -> TopologyResult<()> {
        if self.devices.contains_key(&record.record.key) {
            return Err(TopologyError::transaction(format!(
                "device '{}' appears twice",
                record.record.key
            )));
        }
        let key = record.record.key.clone();
        let idx = self.graph.add_node(record);
        self.devices.insert(key, idx);
        Ok(())
    }

    fn insert_connection(&mut self, record: Record<Connection>) -> TopologyResult<()> {
        let conn = &record.record;
        if self.connections.contains_key(&conn.key) {
            return Err(TopologyError::transaction(format!(
                "connection '{}' appears twice",
                conn.key
            )));
        }
        let endpoint = |key: &str| {
            self.devices.get(key).copied().ok_or_else(|| {
                TopologyError::transaction(format!(
                    "connection '{}' references unknown device '{}'",
                    conn.key, key
                ))
            })
        };
        let from = endpoint(&conn.from_device)?;
        let to = endpoint(&conn.to_device)?;

        let key = conn.key.clone();
        let idx = self.graph.add_edge(from, to, record);
        self.connections.insert(key, idx);
        Ok(())
    }

    // ==================== Lookups ====================

    pub fn device_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn connection_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn device_index(&self, key: &str) -> Option<NodeIndex> {
        self.devices.get(key).copied()
    }

    pub fn device(&self, key: &str) -> Option<&Device> {
        self.device_record(key).map(|r| &r.record)
    }

    pub fn device_record(&self, key: &str) -> Option<&Record<Device>> {
        self.device_index(key)
            .and_then(|idx| self.graph.node_weight(idx))
    }

    pub fn device_at(&self, idx: NodeIndex) -> Option<&Device> {
        self.graph.node_weight(idx).map(|r| &r.record)
    }

    pub fn connection(&self, key: &str) -> Option<&Connection> {
        self.connections
            .get(key)
            .and_then(|&idx| self.graph.edge_weight(idx))
            .map(|r| &r.record)
    }

    pub fn connection_at(&self, idx: EdgeIndex) -> Option<&Connection> {
        self.graph.edge_weight(idx).map(|r| &r.record)
    }

    pub fn device_records(&self) -> impl Iterator<Item = &Record<Device>> {
        self.graph
            .node_indices()
            .filter_map(move |idx| self.graph.node_weight(idx))
    }

    pub fn connection_records(&self) -> impl Iterator<Item = &Record<Connection>> {
        self.graph
            .edge_indices()
            .filter_map(move |idx| self.graph.edge_weight(idx))
    }

    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.device_records().map(|r| &r.record)
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connection_records().map(|r| &r.record)
    }

    /// Every edge touching `node` regardless of orientation, paired with the
    /// vertex on the other end, in connection order. Self-loops appear once.
    pub fn incident(&self, node: NodeIndex) -> Vec<(EdgeIndex, NodeIndex)> {
        let mut edges: Vec<(u64, EdgeIndex, NodeIndex)> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .chain(self.graph.edges_directed(node, Direction::Incoming))
            .map(|e| {
                let other = if e.source() == node { e.target() } else { e.source() };
                (e.weight().seq, e.id(), other)
            })
            .collect();

        edges.sort_by_key(|(seq, _, _)| *seq);
        edges.dedup_by_key(|(_, id, _)| *id);
        edges.into_iter().map(|(_, id, other)| (id, other)).collect()
    }

    /// [`incident`](Self::incident) for every device, indexed by
    /// `NodeIndex::index()`. Vacant slots stay empty.
    pub fn incidence_table(&self) -> Vec<Vec<(EdgeIndex, NodeIndex)>> {
        let mut table = vec![Vec::new(); self.graph.node_bound()];
        for idx in self.graph.node_indices() {
            table[idx.index()] = self.incident(idx);
        }
        table
    }

    /// Keys of the connections touching a device
    pub fn incident_keys(&self, device_key: &str) -> Vec<String> {
        match self.device_index(device_key) {
            Some(idx) => self
                .incident(idx)
                .into_iter()
                .filter_map(|(edge, _)| self.connection_at(edge))
                .map(|c| c.key.clone())
                .collect(),
            None => Vec::new(),
        }
    }

    // ==================== Mutation ====================

    /// Overwrite a device in place, keeping its position. Returns false if
    /// the key is unknown.
    pub fn replace_device(&mut self, device: Device) -> bool {
        let Some(idx) = self.device_index(&device.key) else {
            return false;
        };
        match self.graph.node_weight_mut(idx) {
            Some(slot) => {
                slot.record = device;
                true
            }
            None => false,
        }
    }

    /// Remove a device and every edge attached to it
    pub fn remove_device(&mut self, key: &str) -> Option<Device> {
        let idx = self.device_index(key)?;
        for edge_key in self.incident_keys(key) {
            self.connections.remove(&edge_key);
        }
        self.devices.remove(key);
        self.graph.remove_node(idx).map(|r| r.record)
    }

    pub fn remove_connection(&mut self, key: &str) -> Option<Connection> {
        let idx = self.connections.remove(key)?;
        self.graph.remove_edge(idx).map(|r| r.record)
    }
}
