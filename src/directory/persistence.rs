//! Durable snapshots of the directory state.
//!
//! The on-disk image is two sequential bincode records: the ordered machine
//! list, then the volume id sequence counter. List order is preserved because
//! machine position doubles as an identifier. The derived indices are never
//! written out; they are rebuilt from the machine list on load.

use crate::error::DirectoryError;
use crate::machine::Machine;
use crate::types::VolumeId;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Decode a snapshot: the machine list, then the sequence counter.
pub fn load(path: &Path) -> Result<(Vec<Machine>, VolumeId), DirectoryError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let machines: Vec<Machine> = bincode::deserialize_from(&mut reader)?;
    let next_volume_id: VolumeId = bincode::deserialize_from(&mut reader)?;
    Ok((machines, next_volume_id))
}

/// Encode a snapshot, overwriting any prior contents.
pub fn store(
    path: &Path,
    machines: &[Machine],
    next_volume_id: VolumeId,
) -> Result<(), DirectoryError> {
    let file = File::create(path).map_err(|e| DirectoryError::Persistence {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, machines)?;
    bincode::serialize_into(&mut writer, &next_volume_id)?;
    writer.flush().map_err(|e| DirectoryError::Persistence {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}
