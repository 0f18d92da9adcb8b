//! Configuration module for netgraph
//!
//! User-level settings (data directory, default database, audit actor)
//! from ~/.config/netgraph/config.toml and the environment.

mod user_config;

pub use user_config::{
    AuditConfig, NetgraphConfig, StorageConfig, ENV_ACTOR, ENV_DATABASE, ENV_DATA_DIR,
};
