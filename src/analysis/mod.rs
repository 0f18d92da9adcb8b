//! Read-only analyses over the topology graph

pub mod paths;
pub mod projection;
pub mod stats;

pub use paths::{PathAnalysis, PathAnalyzer, PathLink, PathReport};
pub use projection::{DeviceProjection, NeighborLink, PortConnectionProjector};
pub use stats::{ConnectivityAggregator, NetworkStatistics};
