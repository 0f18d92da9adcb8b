//! Topology graph storage using petgraph + redb
//!
//! The whole graph lives in memory behind one lock; redb is the durable
//! copy. Every mutation commits to redb first and only then touches the
//! in-memory graph, so a failed write leaves both sides as they were.

use super::store_models::{Record, TopologyGraph};
use super::traits::{PathEnumeration, PathLimits, TopologySnapshot, TopologyStore};
use super::traversal;
use crate::error::{Entity, TopologyError, TopologyResult};
use crate::models::{Connection, Device};
use redb::{ReadableTable, TableDefinition, WriteTransaction};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

// redb table definitions: entity key -> JSON Record<T>
const DEVICES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("devices");
const CONNECTIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("connections");

/// File name of the graph database inside a database directory
pub const GRAPH_FILE: &str = "graph.redb";

/// Topology store: petgraph in memory, redb on disk
pub struct GraphStore {
    state: RwLock<TopologyGraph>,
    /// Persistence layer (optional)
    db: Option<redb::Database>,
    db_path: Option<PathBuf>,
    /// Fail `replace_all` between the two table rewrites
    #[cfg(test)]
    fail_between_tables: AtomicBool,
}

impl GraphStore {
    /// Create or open a graph store in the given directory
    pub fn open(dir: &Path) -> TopologyResult<Self> {
        std::fs::create_dir_all(dir)?;
        let db_file = dir.join(GRAPH_FILE);
        let db = redb::Database::create(&db_file)?;

        let store = Self {
            state: RwLock::new(TopologyGraph::default()),
            db: Some(db),
            db_path: Some(db_file),
            #[cfg(test)]
            fail_between_tables: AtomicBool::new(false),
        };
        store.load()?;
        Ok(store)
    }

    /// Create an in-memory only store (no persistence)
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(TopologyGraph::default()),
            db: None,
            db_path: None,
            #[cfg(test)]
            fail_between_tables: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    // A panic while holding the lock cannot leave the graph half-updated:
    // every mutation is a single assignment or removal after the redb commit.
    fn read_state(&self) -> RwLockReadGuard<'_, TopologyGraph> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, TopologyGraph> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn device_count(&self) -> usize {
        self.read_state().device_count()
    }

    pub fn connection_count(&self) -> usize {
        self.read_state().connection_count()
    }

    // ==================== Persistence ====================

    /// Load graph from redb
    fn load(&self) -> TopologyResult<()> {
        let Some(db) = &self.db else {
            return Ok(());
        };

        let read_txn = db.begin_read()?;
        let devices: Vec<Record<Device>> = read_records(&read_txn, DEVICES_TABLE)?;
        let connections: Vec<Record<Connection>> = read_records(&read_txn, CONNECTIONS_TABLE)?;

        let restored = TopologyGraph::restore(devices, connections);
        info!(
            "Loaded topology: {} devices, {} connections",
            restored.device_count(),
            restored.connection_count()
        );
        *self.write_state() = restored;
        Ok(())
    }

    /// Run `apply` inside one redb write transaction. Anything that fails
    /// aborts the transaction. Without persistence this is a no-op.
    fn write_txn<F>(&self, apply: F) -> TopologyResult<()>
    where
        F: FnOnce(&WriteTransaction) -> TopologyResult<()>,
    {
        let Some(db) = &self.db else {
            return Ok(());
        };

        let txn = db.begin_write()?;
        if let Err(e) = apply(&txn) {
            txn.abort()?;
            return Err(e);
        }
        txn.commit()?;
        Ok(())
    }
}

fn read_records<T: DeserializeOwned>(
    txn: &redb::ReadTransaction,
    table: TableDefinition<&str, &[u8]>,
) -> TopologyResult<Vec<Record<T>>> {
    // Missing table means a fresh database
    let table = match txn.open_table(table) {
        Ok(t) => t,
        Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut records = Vec::new();
    for item in table.iter()? {
        let (_, value) = item?;
        records.push(serde_json::from_slice(value.value())?);
    }
    Ok(records)
}

fn put_device(txn: &WriteTransaction, record: &Record<Device>) -> TopologyResult<()> {
    let bytes = serde_json::to_vec(record)?;
    let mut table = txn.open_table(DEVICES_TABLE)?;
    table.insert(record.record.key.as_str(), bytes.as_slice())?;
    Ok(())
}

/// Rewrite the devices table from scratch. Connections are dropped too,
/// so the pair is only consistent once [`write_connections`] has run.
fn write_devices(txn: &WriteTransaction, topology: &TopologyGraph) -> TopologyResult<()> {
    txn.delete_table(DEVICES_TABLE)?;
    txn.delete_table(CONNECTIONS_TABLE)?;

    let mut table = txn.open_table(DEVICES_TABLE)?;
    for record in topology.device_records() {
        let bytes = serde_json::to_vec(record)?;
        table.insert(record.record.key.as_str(), bytes.as_slice())?;
    }
    Ok(())
}

fn write_connections(txn: &WriteTransaction, topology: &TopologyGraph) -> TopologyResult<()> {
    let mut table = txn.open_table(CONNECTIONS_TABLE)?;
    for record in topology.connection_records() {
        let bytes = serde_json::to_vec(record)?;
        table.insert(record.record.key.as_str(), bytes.as_slice())?;
    }
    Ok(())
}

impl GraphStore {
    #[cfg(test)]
    fn between_tables(&self) -> TopologyResult<()> {
        if self.fail_between_tables.load(Ordering::SeqCst) {
            return Err(TopologyError::Io(std::io::Error::other(
                "connections table write failed",
            )));
        }
        Ok(())
    }

    #[cfg(not(test))]
    fn between_tables(&self) -> TopologyResult<()> {
        Ok(())
    }
}

impl TopologyStore for GraphStore {
    fn fetch_device(&self, key: &str) -> TopologyResult<Device> {
        self.read_state()
            .device(key)
            .cloned()
            .ok_or_else(|| TopologyError::not_found(Entity::Device, key))
    }

    fn fetch_connection(&self, key: &str) -> TopologyResult<Connection> {
        self.read_state()
            .connection(key)
            .cloned()
            .ok_or_else(|| TopologyError::not_found(Entity::Connection, key))
    }

    fn list_devices(&self) -> TopologyResult<Vec<Device>> {
        Ok(self.read_state().devices().cloned().collect())
    }

    fn list_connections(&self) -> TopologyResult<Vec<Connection>> {
        Ok(self.read_state().connections().cloned().collect())
    }

    fn snapshot(&self) -> TopologyResult<TopologySnapshot> {
        let state = self.read_state();
        Ok(TopologySnapshot {
            devices: state.devices().cloned().collect(),
            connections: state.connections().cloned().collect(),
        })
    }

    fn incident_connections(&self, device_key: &str) -> TopologyResult<Vec<Connection>> {
        let state = self.read_state();
        Ok(state
            .incident_keys(device_key)
            .iter()
            .filter_map(|key| state.connection(key).cloned())
            .collect())
    }

    fn enumerate_paths(
        &self,
        source: &str,
        target: &str,
        limits: PathLimits,
    ) -> TopologyResult<PathEnumeration> {
        let state = self.read_state();
        let from = state
            .device_index(source)
            .ok_or_else(|| TopologyError::not_found(Entity::Device, source))?;
        let to = state
            .device_index(target)
            .ok_or_else(|| TopologyError::not_found(Entity::Device, target))?;

        let result = traversal::enumerate_paths(&state, from, to, limits);
        debug!(
            "Enumerated {} paths {} -> {} (path cap hit: {}, depth cap hit: {})",
            result.paths.len(),
            source,
            target,
            result.path_limit_reached,
            result.depth_limit_reached
        );
        Ok(result)
    }

    fn replace_all(&self, devices: Vec<Device>, connections: Vec<Connection>) -> TopologyResult<()> {
        // Build off to the side; readers keep the old graph meanwhile
        let next = TopologyGraph::build(devices, connections)?;

        // Held across the commit: one replace at a time, and no reader sees
        // the new graph before it is durable
        let mut state = self.write_state();
        self.write_txn(|txn| {
            write_devices(txn, &next)?;
            self.between_tables()?;
            write_connections(txn, &next)
        })
            .map_err(|e| match e {
                TopologyError::TransactionFailure { .. } => e,
                other => TopologyError::transaction(other),
            })?;

        info!(
            "Replaced topology: {} devices, {} connections",
            next.device_count(),
            next.connection_count()
        );
        *state = next;
        Ok(())
    }

    fn update_device(&self, device: Device) -> TopologyResult<()> {
        let mut state = self.write_state();
        let seq = state
            .device_record(&device.key)
            .map(|r| r.seq)
            .ok_or_else(|| TopologyError::not_found(Entity::Device, &device.key))?;

        let record = Record::new(seq, device);
        self.write_txn(|txn| put_device(txn, &record))?;

        debug!("Updated device {}", record.record.key);
        state.replace_device(record.record);
        Ok(())
    }

    fn delete_device(&self, key: &str) -> TopologyResult<()> {
        let mut state = self.write_state();
        if state.device(key).is_none() {
            return Err(TopologyError::not_found(Entity::Device, key));
        }
        let attached = state.incident_keys(key);

        self.write_txn(|txn| {
            let mut devices = txn.open_table(DEVICES_TABLE)?;
            devices.remove(key)?;
            let mut connections = txn.open_table(CONNECTIONS_TABLE)?;
            for edge_key in &attached {
                connections.remove(edge_key.as_str())?;
            }
            Ok(())
        })?;

        state.remove_device(key);
        info!("Deleted device {} ({} attached connections)", key, attached.len());
        Ok(())
    }

    fn delete_connection(&self, key: &str) -> TopologyResult<()> {
        let mut state = self.write_state();
        if state.connection(key).is_none() {
            return Err(TopologyError::not_found(Entity::Connection, key));
        }

        self.write_txn(|txn| {
            let mut connections = txn.open_table(CONNECTIONS_TABLE)?;
            connections.remove(key)?;
            Ok(())
        })?;

        state.remove_connection(key);
        info!("Deleted connection {}", key);
        Ok(())
    }
}
