//! The contract the repository and analyses need from a graph store

use crate::error::{Entity, TopologyError, TopologyResult};
use crate::models::{Connection, Device};

/// Hop ceiling for path enumeration
pub const MAX_PATH_HOPS: usize = 10;

/// Ceiling on the number of enumerated paths
pub const MAX_PATHS: usize = 20;

/// Bounds for path enumeration. Full enumeration is exponential on dense
/// meshes, so both ceilings always apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathLimits {
    pub max_hops: usize,
    pub max_paths: usize,
}

impl Default for PathLimits {
    fn default() -> Self {
        Self {
            max_hops: MAX_PATH_HOPS,
            max_paths: MAX_PATHS,
        }
    }
}

/// One enumerated path: `devices.len() == connections.len() + 1`
#[derive(Debug, Clone, PartialEq)]
pub struct RawPath {
    pub devices: Vec<Device>,
    pub connections: Vec<Connection>,
}

impl RawPath {
    pub fn hop_count(&self) -> usize {
        self.connections.len()
    }
}

/// Paths in discovery order, plus whether either ceiling cut the search short
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathEnumeration {
    pub paths: Vec<RawPath>,
    /// Another path was found after `max_paths` were collected
    pub path_limit_reached: bool,
    /// A branch was pruned at `max_hops`, so longer paths may exist
    pub depth_limit_reached: bool,
}

/// Devices and connections read at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopologySnapshot {
    pub devices: Vec<Device>,
    pub connections: Vec<Connection>,
}

/// Common interface for topology graph stores
pub trait TopologyStore: Send + Sync {
    /// Get a device by key
    fn fetch_device(&self, key: &str) -> TopologyResult<Device>;

    /// Get a connection by key
    fn fetch_connection(&self, key: &str) -> TopologyResult<Connection>;

    /// All devices in enumeration order
    fn list_devices(&self) -> TopologyResult<Vec<Device>>;

    /// All connections in enumeration order
    fn list_connections(&self) -> TopologyResult<Vec<Connection>>;

    /// Simple paths between two devices, treating every connection as
    /// bidirectional
    fn enumerate_paths(
        &self,
        source: &str,
        target: &str,
        limits: PathLimits,
    ) -> TopologyResult<PathEnumeration>;

    /// Swap in a whole new device and connection set. Either everything is
    /// installed or nothing changes.
    fn replace_all(&self, devices: Vec<Device>, connections: Vec<Connection>) -> TopologyResult<()>;

    /// Overwrite an existing device
    fn update_device(&self, device: Device) -> TopologyResult<()>;

    /// Remove a device
    fn delete_device(&self, key: &str) -> TopologyResult<()>;

    /// Remove a connection
    fn delete_connection(&self, key: &str) -> TopologyResult<()>;

    /// Devices and connections together. Stores that can read both under
    /// one lock or transaction should override this.
    fn snapshot(&self) -> TopologyResult<TopologySnapshot> {
        Ok(TopologySnapshot {
            devices: self.list_devices()?,
            connections: self.list_connections()?,
        })
    }

    /// Connections with `device_key` on either end
    fn incident_connections(&self, device_key: &str) -> TopologyResult<Vec<Connection>> {
        Ok(self
            .list_connections()?
            .into_iter()
            .filter(|c| c.touches(device_key))
            .collect())
    }

    fn contains_device(&self, key: &str) -> TopologyResult<bool> {
        match self.fetch_device(key) {
            Ok(_) => Ok(true),
            Err(TopologyError::NotFound {
                entity: Entity::Device,
                ..
            }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
