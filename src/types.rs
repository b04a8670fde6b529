//! Core identifier types for the volume directory.

/// VolumeId: Globally unique identifier of a logical volume, assigned by the directory
pub type VolumeId = u64;

/// MachineId: Position of a machine in the directory's registration order
pub type MachineId = usize;
