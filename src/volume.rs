//! Volume descriptors reported by storage nodes.
//!
//! The directory consumes these read-only: `size` is maintained by the
//! hosting storage node and only compared against the writable threshold
//! here, never interpreted or mutated.

use crate::types::VolumeId;
use serde::{Deserialize, Serialize};

/// Maximum occupied size (1 GiB) below which a volume still accepts writes.
pub const VOLUME_SIZE_LIMIT: u64 = 1024 * 1024 * 1024;

/// Descriptor of a single logical volume hosted on a machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeInfo {
    pub id: VolumeId,
    /// Bytes currently occupied, updated by the hosting storage node
    pub size: u64,
}

impl VolumeInfo {
    /// Create a descriptor for a freshly allocated, empty volume
    pub fn new(id: VolumeId) -> Self {
        Self { id, size: 0 }
    }

    /// Whether the volume still accepts writes
    pub fn is_writable(&self) -> bool {
        self.size < VOLUME_SIZE_LIMIT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_volume_is_empty_and_writable() {
        let volume = VolumeInfo::new(7);
        assert_eq!(volume.id, 7);
        assert_eq!(volume.size, 0);
        assert!(volume.is_writable());
    }

    #[test]
    fn test_writability_cuts_off_at_the_limit() {
        let mut volume = VolumeInfo::new(0);
        volume.size = VOLUME_SIZE_LIMIT - 1;
        assert!(volume.is_writable());
        volume.size = VOLUME_SIZE_LIMIT;
        assert!(!volume.is_writable());
        volume.size = VOLUME_SIZE_LIMIT + 1;
        assert!(!volume.is_writable());
    }
}
