//! netgraph - network topology graph engine
//!
//! Keeps a topology of devices and connections in a petgraph graph backed
//! by redb, and answers questions about it: bounded path enumeration with
//! shortest/cheapest/alternative classification, connectivity statistics,
//! and a per-device projection of resolved port connections.

pub mod addressing;
pub mod analysis;
pub mod audit;
pub mod config;
pub mod error;
pub mod graph;
pub mod models;
pub mod reporters;
pub mod repository;
pub mod session;

pub use error::{Entity, TopologyError, TopologyResult};
pub use repository::TopologyRepository;
pub use session::{Session, Workspace};
