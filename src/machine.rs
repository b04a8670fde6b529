//! Machine records tracked by the directory.

use crate::volume::VolumeInfo;
use serde::{Deserialize, Serialize};

/// A physical storage node and the volumes it hosts
///
/// Keyed uniquely by `server`. Owned exclusively by the directory once
/// registered; mutated only through registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    /// Address the directory and peers use, `<host>[:port]`; unique key
    pub server: String,
    /// Address published to external clients
    pub public_server: String,
    /// Hosted volumes, in allocation order
    pub volumes: Vec<VolumeInfo>,
    /// Maximum number of volumes this machine may host
    pub capacity: usize,
}

impl Machine {
    /// Create a machine record from a storage node announcement
    pub fn new(
        server: String,
        public_server: String,
        volumes: Vec<VolumeInfo>,
        capacity: usize,
    ) -> Self {
        Self {
            server,
            public_server,
            volumes,
            capacity,
        }
    }

    /// Number of additional volumes needed to reach capacity
    pub fn remaining_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.volumes.len())
    }

    /// Number of hosted volumes still accepting writes
    pub fn writable_volume_count(&self) -> usize {
        self.volumes.iter().filter(|v| v.is_writable()).count()
    }
}
