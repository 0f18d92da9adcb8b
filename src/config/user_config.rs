//! User-level configuration for netgraph
//!
//! Supports loading config from:
//! - Environment variables
//! - ~/.config/netgraph/config.toml

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

pub const ENV_DATA_DIR: &str = "NETGRAPH_DATA_DIR";
pub const ENV_DATABASE: &str = "NETGRAPH_DATABASE";
pub const ENV_ACTOR: &str = "NETGRAPH_ACTOR";

const DEFAULT_ACTOR: &str = "system";

#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct NetgraphConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding one subdirectory per database
    pub data_dir: Option<PathBuf>,

    /// Database to open when none is given on the command line
    pub database: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct AuditConfig {
    /// Name recorded as the user on audit entries (default: system)
    pub actor: Option<String>,
}

impl NetgraphConfig {
    /// Load config from all sources, with priority:
    /// 1. Environment variables (highest)
    /// 2. User config (~/.config/netgraph/config.toml)
    pub fn load() -> Result<Self> {
        let mut config = NetgraphConfig::default();

        if let Some(path) = Self::user_config_path().filter(|p| p.exists()) {
            match std::fs::read_to_string(&path) {
                Ok(content) => match toml::from_str::<NetgraphConfig>(&content) {
                    Ok(user_config) => config.merge(user_config),
                    Err(e) => warn!("Ignoring unparseable config {}: {}", path.display(), e),
                },
                Err(e) => warn!("Could not read config {}: {}", path.display(), e),
            }
        }

        // Environment variables override everything
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Get the user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("netgraph").join("config.toml"))
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(dir) = set(ENV_DATA_DIR) {
            self.storage.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(db) = set(ENV_DATABASE) {
            self.storage.database = Some(db);
        }
        if let Some(actor) = set(ENV_ACTOR) {
            self.audit.actor = Some(actor);
        }
    }

    /// Merge another config into this one (other takes priority)
    fn merge(&mut self, other: NetgraphConfig) {
        if other.storage.data_dir.is_some() {
            self.storage.data_dir = other.storage.data_dir;
        }
        if other.storage.database.is_some() {
            self.storage.database = other.storage.database;
        }
        if other.audit.actor.is_some() {
            self.audit.actor = other.audit.actor;
        }
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, data_dir: Option<PathBuf>, database: Option<String>) -> Self {
        self.merge(NetgraphConfig {
            storage: StorageConfig { data_dir, database },
            audit: AuditConfig::default(),
        });
        self
    }

    /// Root directory for databases
    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|p| p.join("netgraph")))
            .unwrap_or_else(|| PathBuf::from(".netgraph"))
    }

    pub fn database(&self) -> Option<&str> {
        self.storage.database.as_deref()
    }

    pub fn actor(&self) -> &str {
        self.audit.actor.as_deref().unwrap_or(DEFAULT_ACTOR)
    }

    /// Initialize user config directory and create example config
    pub fn init_user_config() -> Result<PathBuf> {
        let config_path = Self::user_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        if !config_path.exists() {
            let example = r#"# netgraph user configuration

[storage]
# Where databases live (default: platform data dir + /netgraph)
# data_dir = "/var/lib/netgraph"

# Database used when --database is not given
# database = "lab"

[audit]
# Recorded as the user on audit entries
# actor = "system"
"#;
            std::fs::write(&config_path, example)?;
        }

        Ok(config_path)
    }
}
