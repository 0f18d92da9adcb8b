//! Named databases on disk and explicit per-database sessions
//!
//! A [`Workspace`] is a directory with one subdirectory per database. A
//! [`Session`] holds the open stores for one of them and hands out the
//! repository and analyses bound to those stores. Nothing is global: two
//! sessions on different databases never share state.

use crate::analysis::{ConnectivityAggregator, PathAnalyzer, PortConnectionProjector};
use crate::audit::AuditLog;
use crate::error::{Entity, TopologyError, TopologyResult};
use crate::graph::GraphStore;
use crate::repository::TopologyRepository;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Prefix every database name carries
pub const DATABASE_PREFIX: &str = "netgraph_";

/// Lowercase, spaces and dashes to `_`, drop anything else that is not
/// alphanumeric, then prefix with `netgraph_` unless already there.
pub fn normalize_database_name(name: &str) -> TopologyResult<String> {
    let cleaned: String = name
        .trim()
        .to_lowercase()
        .replace([' ', '-'], "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();

    let full = if cleaned.starts_with(DATABASE_PREFIX) {
        cleaned
    } else {
        format!("{}{}", DATABASE_PREFIX, cleaned)
    };

    if full.len() == DATABASE_PREFIX.len() {
        return Err(TopologyError::Validation(format!(
            "database name '{}' has no usable characters",
            name
        )));
    }
    Ok(full)
}

/// Directory of named databases
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn database_dir(&self, name: &str) -> TopologyResult<(String, PathBuf)> {
        let name = normalize_database_name(name)?;
        let dir = self.root.join(&name);
        Ok((name, dir))
    }

    /// Database names, sorted
    pub fn list_databases(&self) -> TopologyResult<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with(DATABASE_PREFIX) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Create a database, or open it if it already exists
    pub fn create_database(&self, name: &str) -> TopologyResult<Session> {
        let (name, dir) = self.database_dir(name)?;
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
            info!("Created database {}", name);
        }
        Session::open(name, &dir)
    }

    /// Open an existing database
    pub fn connect(&self, name: &str) -> TopologyResult<Session> {
        let (name, dir) = self.database_dir(name)?;
        if !dir.is_dir() {
            return Err(TopologyError::not_found(Entity::Database, name));
        }
        Session::open(name, &dir)
    }

    /// Remove a database and everything in it
    pub fn delete_database(&self, name: &str) -> TopologyResult<String> {
        let (name, dir) = self.database_dir(name)?;
        if !dir.is_dir() {
            return Err(TopologyError::not_found(Entity::Database, name));
        }
        std::fs::remove_dir_all(&dir)?;
        info!("Deleted database {}", name);
        Ok(name)
    }
}

/// Open stores for one database
pub struct Session {
    name: String,
    store: Arc<GraphStore>,
    audit: Arc<AuditLog>,
    actor: String,
}

impl Session {
    fn open(name: String, dir: &Path) -> TopologyResult<Self> {
        let store = GraphStore::open(dir)?;
        let audit = AuditLog::open(dir)?;
        Ok(Self::from_parts(name, Arc::new(store), Arc::new(audit)))
    }

    /// Session over stores opened elsewhere, e.g. in-memory ones
    pub fn from_parts(name: impl Into<String>, store: Arc<GraphStore>, audit: Arc<AuditLog>) -> Self {
        Self {
            name: name.into(),
            store,
            audit,
            actor: "system".to_string(),
        }
    }

    /// Session with no persistence
    pub fn in_memory(name: &str) -> TopologyResult<Self> {
        Ok(Self::from_parts(
            name,
            Arc::new(GraphStore::in_memory()),
            Arc::new(AuditLog::in_memory()?),
        ))
    }

    pub fn with_actor(mut self, actor: &str) -> Self {
        self.actor = actor.to_string();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    pub fn repository(&self) -> TopologyRepository<'_> {
        TopologyRepository::new(self.store.as_ref(), self.audit.as_ref())
            .with_actor(&self.actor)
            .with_database(&self.name)
    }

    pub fn path_analyzer(&self) -> PathAnalyzer<'_> {
        PathAnalyzer::new(self.store.as_ref())
    }

    pub fn aggregator(&self) -> ConnectivityAggregator<'_> {
        ConnectivityAggregator::new(self.store.as_ref())
    }

    pub fn projector(&self) -> PortConnectionProjector<'_> {
        PortConnectionProjector::new(self.store.as_ref())
    }
}
