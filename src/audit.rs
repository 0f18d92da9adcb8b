//! Append-only audit trail of topology changes
//!
//! The repository reports every save and delete here. Recording is
//! fire-and-forget from the repository's point of view: a failing sink is
//! logged and ignored, never rolled back into the topology operation.

use crate::error::{TopologyError, TopologyResult};
use chrono::{DateTime, Utc};
use redb::{ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

// sequence number -> JSON AuditEntry
const AUDIT_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("audit_log");

/// File name of the audit database inside a database directory
pub const AUDIT_FILE: &str = "audit.redb";

/// Default number of entries returned by a query
pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// Hard ceiling on entries returned by a query
pub const MAX_QUERY_LIMIT: usize = 1000;

const RECENT_ENTRIES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    BulkSave,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
            AuditAction::BulkSave => "bulk_save",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "create" => Ok(AuditAction::Create),
            "update" => Ok(AuditAction::Update),
            "delete" => Ok(AuditAction::Delete),
            "bulk_save" | "bulk-save" => Ok(AuditAction::BulkSave),
            _ => Err(format!(
                "Unknown audit action: {}. Valid: create, update, delete, bulk_save",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntity {
    Device,
    Connection,
    Topology,
}

impl AuditEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEntity::Device => "device",
            AuditEntity::Connection => "connection",
            AuditEntity::Topology => "topology",
        }
    }
}

impl fmt::Display for AuditEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for AuditEntity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "device" => Ok(AuditEntity::Device),
            "connection" => Ok(AuditEntity::Connection),
            "topology" => Ok(AuditEntity::Topology),
            _ => Err(format!(
                "Unknown entity type: {}. Valid: device, connection, topology",
                s
            )),
        }
    }
}

/// One audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub action: AuditAction,
    pub entity_type: AuditEntity,
    pub entity_id: String,
    /// Snapshot of the entity at the time of the change
    pub entity_data: serde_json::Value,
    pub user: String,
    pub timestamp: DateTime<Utc>,
    pub database: String,
}

impl AuditEntry {
    pub fn new(
        action: AuditAction,
        entity_type: AuditEntity,
        entity_id: impl Into<String>,
        entity_data: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            action,
            entity_type,
            entity_id: entity_id.into(),
            entity_data,
            user: String::new(),
            timestamp: Utc::now(),
            database: String::new(),
        }
    }

    pub fn by(mut self, user: &str) -> Self {
        self.user = user.to_string();
        self
    }

    pub fn in_database(mut self, database: &str) -> Self {
        self.database = database.to_string();
        self
    }
}

/// Where audit entries go
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry) -> TopologyResult<()>;

    fn record_batch(&self, entries: Vec<AuditEntry>) -> TopologyResult<()> {
        for entry in entries {
            self.record(entry)?;
        }
        Ok(())
    }
}

/// Query filter for [`AuditLog::entries`]
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// Defaults to 100, clamped to 1000
    pub limit: Option<usize>,
    pub action: Option<AuditAction>,
    pub entity_type: Option<AuditEntity>,
}

impl AuditFilter {
    fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_QUERY_LIMIT)
            .min(MAX_QUERY_LIMIT)
    }

    fn matches(&self, entry: &AuditEntry) -> bool {
        self.action.map_or(true, |a| a == entry.action)
            && self.entity_type.map_or(true, |t| t == entry.entity_type)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditStats {
    pub total: u64,
    pub by_action: BTreeMap<AuditAction, u64>,
    pub by_entity_type: BTreeMap<AuditEntity, u64>,
    pub recent: Vec<AuditEntry>,
}

/// redb-backed audit log
pub struct AuditLog {
    db: redb::Database,
}

impl AuditLog {
    /// Open or create `dir/audit.redb`
    pub fn open(dir: &Path) -> TopologyResult<Self> {
        std::fs::create_dir_all(dir)?;
        let db = redb::Database::create(dir.join(AUDIT_FILE))?;
        Ok(Self { db })
    }

    /// Audit log that lives only as long as the value
    pub fn in_memory() -> TopologyResult<Self> {
        let db = redb::Builder::new()
            .create_with_backend(redb::backends::InMemoryBackend::new())?;
        Ok(Self { db })
    }

    fn append(&self, entries: &[AuditEntry]) -> TopologyResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(AUDIT_TABLE)?;
            let mut next = table.last()?.map_or(0, |(k, _)| k.value() + 1);
            for entry in entries {
                let bytes = serde_json::to_vec(entry)?;
                table.insert(next, bytes.as_slice())?;
                next += 1;
            }
        }
        txn.commit()?;
        debug!("Recorded {} audit entries", entries.len());
        Ok(())
    }

    /// Visit entries newest first until `visit` returns false
    fn scan_newest_first<F>(&self, mut visit: F) -> TopologyResult<()>
    where
        F: FnMut(AuditEntry) -> bool,
    {
        let txn = self.db.begin_read()?;
        let table = match txn.open_table(AUDIT_TABLE) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        for item in table.iter()?.rev() {
            let (_, value) = item?;
            let entry: AuditEntry = serde_json::from_slice(value.value())?;
            if !visit(entry) {
                break;
            }
        }
        Ok(())
    }

    /// Matching entries, newest first
    pub fn entries(&self, filter: &AuditFilter) -> TopologyResult<Vec<AuditEntry>> {
        let limit = filter.effective_limit();
        let mut found = Vec::new();
        if limit == 0 {
            return Ok(found);
        }
        self.scan_newest_first(|entry| {
            if filter.matches(&entry) {
                found.push(entry);
            }
            found.len() < limit
        })?;
        Ok(found)
    }

    /// Totals by action and entity type, plus the most recent entries
    pub fn stats(&self) -> TopologyResult<AuditStats> {
        let mut stats = AuditStats::default();
        self.scan_newest_first(|entry| {
            stats.total += 1;
            *stats.by_action.entry(entry.action).or_default() += 1;
            *stats.by_entity_type.entry(entry.entity_type).or_default() += 1;
            if stats.recent.len() < RECENT_ENTRIES {
                stats.recent.push(entry);
            }
            true
        })?;
        Ok(stats)
    }

    pub fn len(&self) -> TopologyResult<u64> {
        let txn = self.db.begin_read()?;
        match txn.open_table(AUDIT_TABLE) {
            Ok(table) => Ok(table.len()?),
            Err(redb::TableError::TableDoesNotExist(_)) => Ok(0),
            Err(e) => Err(TopologyError::from(e)),
        }
    }

    pub fn is_empty(&self) -> TopologyResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl AuditSink for AuditLog {
    fn record(&self, entry: AuditEntry) -> TopologyResult<()> {
        self.append(std::slice::from_ref(&entry))
    }

    fn record_batch(&self, entries: Vec<AuditEntry>) -> TopologyResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        self.append(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn entry(action: AuditAction, entity: AuditEntity, id: &str) -> AuditEntry {
        AuditEntry::new(action, entity, id, json!({ "key": id }))
            .by("tester")
            .in_database("netgraph_lab")
    }

    #[test]
    fn test_entries_newest_first() {
        let log = AuditLog::in_memory().unwrap();
        log.record(entry(AuditAction::Create, AuditEntity::Device, "r1")).unwrap();
        log.record(entry(AuditAction::Delete, AuditEntity::Device, "r1")).unwrap();

        let entries = log.entries(&AuditFilter::default()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, AuditAction::Delete);
        assert_eq!(entries[1].action, AuditAction::Create);
        assert_eq!(entries[0].user, "tester");
        assert_eq!(entries[0].database, "netgraph_lab");
    }

    #[test]
    fn test_filters_and_limit() {
        let log = AuditLog::in_memory().unwrap();
        log.record_batch(vec![
            entry(AuditAction::Create, AuditEntity::Device, "a"),
            entry(AuditAction::Create, AuditEntity::Connection, "c"),
            entry(AuditAction::Create, AuditEntity::Device, "b"),
            entry(AuditAction::BulkSave, AuditEntity::Topology, "full_topology"),
        ])
        .unwrap();

        let devices = log
            .entries(&AuditFilter {
                entity_type: Some(AuditEntity::Device),
                ..Default::default()
            })
            .unwrap();
        let ids: Vec<&str> = devices.iter().map(|e| e.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);

        let limited = log
            .entries(&AuditFilter {
                limit: Some(1),
                action: Some(AuditAction::Create),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].entity_id, "b");
    }

    #[test]
    fn test_limit_is_clamped() {
        let filter = AuditFilter {
            limit: Some(50_000),
            ..Default::default()
        };
        assert_eq!(filter.effective_limit(), MAX_QUERY_LIMIT);
        assert_eq!(AuditFilter::default().effective_limit(), DEFAULT_QUERY_LIMIT);
    }

    #[test]
    fn test_stats() {
        let log = AuditLog::in_memory().unwrap();
        for i in 0..12 {
            log.record(entry(AuditAction::Create, AuditEntity::Device, &format!("d{}", i)))
                .unwrap();
        }
        log.record(entry(AuditAction::Delete, AuditEntity::Connection, "c1"))
            .unwrap();

        let stats = log.stats().unwrap();
        assert_eq!(stats.total, 13);
        assert_eq!(stats.by_action[&AuditAction::Create], 12);
        assert_eq!(stats.by_action[&AuditAction::Delete], 1);
        assert_eq!(stats.by_entity_type[&AuditEntity::Connection], 1);
        assert_eq!(stats.recent.len(), 10);
        assert_eq!(stats.recent[0].entity_id, "c1");
    }

    #[test]
    fn test_empty_log() {
        let log = AuditLog::in_memory().unwrap();
        assert!(log.is_empty().unwrap());
        assert!(log.entries(&AuditFilter::default()).unwrap().is_empty());
        assert_eq!(log.stats().unwrap().total, 0);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().expect("create temp dir");
        {
            let log = AuditLog::open(dir.path()).unwrap();
            log.record(entry(AuditAction::BulkSave, AuditEntity::Topology, "full_topology"))
                .unwrap();
        }
        let log = AuditLog::open(dir.path()).unwrap();
        assert_eq!(log.len().unwrap(), 1);
        log.record(entry(AuditAction::Delete, AuditEntity::Device, "r1")).unwrap();
        let entries = log.entries(&AuditFilter::default()).unwrap();
        assert_eq!(entries[0].entity_id, "r1");
    }

    #[test]
    fn test_parse_filters() {
        assert_eq!("bulk_save".parse::<AuditAction>().unwrap(), AuditAction::BulkSave);
        assert_eq!("DEVICE".parse::<AuditEntity>().unwrap(), AuditEntity::Device);
        assert!("rename".parse::<AuditAction>().is_err());
    }
}
