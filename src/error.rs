//! Error taxonomy shared by the store, repository and analysis layers

use std::fmt;
use thiserror::Error;

/// Which kind of entity a lookup failed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Device,
    Connection,
    SourceDevice,
    TargetDevice,
    Database,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Device => write!(f, "device"),
            Entity::Connection => write!(f, "connection"),
            Entity::SourceDevice => write!(f, "source device"),
            Entity::TargetDevice => write!(f, "target device"),
            Entity::Database => write!(f, "database"),
        }
    }
}

/// Errors raised by topology operations
#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("{entity} '{key}' not found")]
    NotFound { entity: Entity, key: String },

    #[error("invalid topology: {0}")]
    Validation(String),

    #[error("transaction aborted, topology unchanged: {reason}")]
    TransactionFailure { reason: String },

    #[error("graph store unavailable: {0}")]
    StoreUnavailable(#[from] redb::Error),

    #[error("stored record could not be decoded: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TopologyError {
    pub fn not_found(entity: Entity, key: impl Into<String>) -> Self {
        TopologyError::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn transaction(reason: impl fmt::Display) -> Self {
        TopologyError::TransactionFailure {
            reason: reason.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TopologyError::NotFound { .. })
    }
}

macro_rules! store_error_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for TopologyError {
                fn from(err: $ty) -> Self {
                    TopologyError::StoreUnavailable(redb::Error::from(err))
                }
            }
        )*
    };
}

store_error_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

pub type TopologyResult<T> = Result<T, TopologyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_the_missing_key() {
        let err = TopologyError::not_found(Entity::TargetDevice, "core-2");
        assert_eq!(err.to_string(), "target device 'core-2' not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_transaction_failure_message() {
        let err = TopologyError::transaction("connection 'c1' references unknown device 'x'");
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("topology unchanged"));
    }
}
