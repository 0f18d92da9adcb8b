//! Topology graph storage
//!
//! Pure Rust implementation using petgraph + redb.

pub mod store;
pub mod store_models;
pub mod traits;
pub mod traversal;

pub use store::GraphStore;
pub use store_models::{Record, TopologyGraph};
pub use traits::{
    PathEnumeration, PathLimits, RawPath, TopologySnapshot, TopologyStore, MAX_PATHS,
    MAX_PATH_HOPS,
};
