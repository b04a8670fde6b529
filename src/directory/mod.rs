//! Volume Directory
//!
//! Maps logical volumes to the machines hosting them, allocates new volume
//! ids as machines register, and picks a machine to receive the next write.
//! All state lives behind a single lock; registration, index maintenance,
//! and persistence happen inside one critical section.

pub mod persistence;

use crate::error::DirectoryError;
use crate::machine::Machine;
use crate::types::{MachineId, VolumeId};
use crate::volume::VolumeInfo;
use parking_lot::RwLock;
use rand::Rng;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The volume directory
///
/// Owned by the embedding server and shared via `Arc`. Every instance is
/// independent, backed by its own snapshot file at `<dir>/<name>.map`.
pub struct Directory {
    path: PathBuf,
    default_capacity: usize,
    state: RwLock<DirectoryState>,
}

/// One unit of shared mutable state: the machine list and everything
/// derived from it.
#[derive(Default)]
struct DirectoryState {
    /// Registration order; index position is the machine id
    machines: Vec<Machine>,
    /// Volume id to owning machine index, the union of all hosted volumes
    volume_index: HashMap<VolumeId, MachineId>,
    /// One entry per writable volume; a machine with k writable volumes
    /// appears k times, weighting selection by free volume count
    write_candidates: Vec<MachineId>,
    /// Strictly greater than every volume id ever assigned
    next_volume_id: VolumeId,
}

impl DirectoryState {
    /// Rebuild both derived indices from the machine list, the only source
    /// of truth after a restore.
    fn rebuild_indexes(&mut self) {
        self.volume_index.clear();
        for (machine_id, machine) in self.machines.iter().enumerate() {
            for volume in &machine.volumes {
                self.volume_index.insert(volume.id, machine_id);
            }
        }
        self.rebuild_write_candidates();
    }

    /// Recompute the write-candidate list from scratch over all machines,
    /// so filled-up volumes drop out and fresh ones gain multiplicity.
    fn rebuild_write_candidates(&mut self) {
        self.write_candidates.clear();
        for (machine_id, machine) in self.machines.iter().enumerate() {
            for volume in &machine.volumes {
                if volume.is_writable() {
                    self.write_candidates.push(machine_id);
                }
            }
        }
    }
}

impl Directory {
    /// Open the directory backed by `<dir>/<name>.map`, restoring the
    /// persisted snapshot if one is readable and starting empty otherwise.
    ///
    /// A missing or unreadable snapshot is a normal bootstrap condition: it
    /// is logged and the directory fills up again as machines announce
    /// themselves. `default_capacity` applies to registering machines that
    /// do not state their own.
    pub fn open(dir: &Path, name: &str, default_capacity: usize) -> Self {
        let path = dir.join(format!("{}.map", name));
        let mut state = DirectoryState::default();
        match persistence::load(&path) {
            Ok((machines, next_volume_id)) => {
                state.machines = machines;
                state.next_volume_id = next_volume_id;
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "no usable volume snapshot, starting empty"
                );
            }
        }
        state.rebuild_indexes();

        info!(
            path = %path.display(),
            machines = state.machines.len(),
            volumes = state.volume_index.len(),
            writable = state.write_candidates.len(),
            "volume directory loaded"
        );

        Self {
            path,
            default_capacity,
            state: RwLock::new(state),
        }
    }

    /// Register a machine and top its volume list up to capacity.
    ///
    /// Re-registering an already-known server address updates the existing
    /// record in place; a record is never duplicated. New ids are drawn from
    /// the sequence counter with no gaps and no reuse, and a machine already
    /// at capacity allocates nothing. The updated state is persisted before
    /// returning; a persistence error is hard (see [`Directory::save`]).
    ///
    /// Returns the newly allocated volume ids, in allocation order.
    pub fn add(&self, candidate: Machine) -> Result<Vec<VolumeId>, DirectoryError> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        // Server address is the unique key; list position is the machine id.
        let machine_id = match state
            .machines
            .iter()
            .position(|m| m.server == candidate.server)
        {
            Some(machine_id) => {
                let record = &mut state.machines[machine_id];
                record.public_server = candidate.public_server;
                record.volumes = candidate.volumes;
                if candidate.capacity > 0 {
                    record.capacity = candidate.capacity;
                }
                machine_id
            }
            None => {
                let mut record = candidate;
                if record.capacity == 0 {
                    record.capacity = self.default_capacity;
                }
                state.machines.push(record);
                state.machines.len() - 1
            }
        };

        let record = &mut state.machines[machine_id];
        let mut new_ids = Vec::with_capacity(record.remaining_capacity());
        for _ in 0..record.remaining_capacity() {
            let id = state.next_volume_id;
            state.next_volume_id = id + 1;
            record.volumes.push(VolumeInfo::new(id));
            new_ids.push(id);
            debug!(volume = id, server = %record.server, "allocated volume");
        }

        for volume in &record.volumes {
            state.volume_index.insert(volume.id, machine_id);
        }
        state.rebuild_write_candidates();

        // Still inside the critical section: a concurrent pick must never
        // observe a candidate list inconsistent with the ownership map, and
        // the snapshot must match what callers were told.
        persistence::store(&self.path, &state.machines, state.next_volume_id)?;

        info!(
            server = %state.machines[machine_id].server,
            allocated = new_ids.len(),
            machines = state.machines.len(),
            volumes = state.volume_index.len(),
            writable = state.write_candidates.len(),
            "machine registered"
        );
        Ok(new_ids)
    }

    /// Pick a machine to receive the next write.
    ///
    /// Chooses uniformly among write candidates; because a machine appears
    /// once per writable volume, selection probability is proportional to
    /// its number of still-writable volumes.
    pub fn pick_for_write(&self) -> Result<Machine, DirectoryError> {
        let state = self.state.read();
        if state.write_candidates.is_empty() {
            return Err(DirectoryError::NoWritableVolume);
        }
        let slot = rand::thread_rng().gen_range(0..state.write_candidates.len());
        Ok(state.machines[state.write_candidates[slot]].clone())
    }

    /// Resolve a volume id to the machine hosting it.
    pub fn get(&self, id: VolumeId) -> Result<Machine, DirectoryError> {
        let state = self.state.read();
        let machine_id = state
            .volume_index
            .get(&id)
            .copied()
            .ok_or(DirectoryError::UnknownVolume(id))?;
        Ok(state.machines[machine_id].clone())
    }

    /// Write the current snapshot to the backing file.
    ///
    /// Registration persists on its own; this is for explicit flushes, e.g.
    /// at shutdown. The state is latched for the duration of the write so
    /// the on-disk image is self-consistent. On error the in-memory and
    /// on-disk state may have diverged: the caller must treat the failure as
    /// fatal and stop using this instance.
    pub fn save(&self) -> Result<(), DirectoryError> {
        let state = self.state.write();
        info!(
            path = %self.path.display(),
            machines = state.machines.len(),
            "saving volume directory"
        );
        persistence::store(&self.path, &state.machines, state.next_volume_id)
    }

    /// Number of registered machines
    pub fn machine_count(&self) -> usize {
        self.state.read().machines.len()
    }

    /// Number of volumes across all machines
    pub fn volume_count(&self) -> usize {
        self.state.read().volume_index.len()
    }

    /// Number of volumes still accepting writes
    pub fn writable_volume_count(&self) -> usize {
        self.state.read().write_candidates.len()
    }

    /// The next volume id the sequence counter will assign
    pub fn next_volume_id(&self) -> VolumeId {
        self.state.read().next_volume_id
    }

    /// Snapshot of the machine list, in registration order
    pub fn machines(&self) -> Vec<Machine> {
        self.state.read().machines.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::VOLUME_SIZE_LIMIT;

    fn machine(server: &str, capacity: usize) -> Machine {
        Machine::new(
            server.to_string(),
            format!("{}.public", server),
            Vec::new(),
            capacity,
        )
    }

    #[test]
    fn test_add_assigns_sequential_ids() {
        let dir = tempfile::tempdir().unwrap();
        let directory = Directory::open(dir.path(), "volumes", 4);

        let ids = directory.add(machine("node1:8080", 3)).unwrap();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(directory.next_volume_id(), 3);

        let ids = directory.add(machine("node2:8080", 2)).unwrap();
        assert_eq!(ids, vec![3, 4]);
        assert_eq!(directory.next_volume_id(), 5);
    }

    #[test]
    fn test_reregistration_updates_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let directory = Directory::open(dir.path(), "volumes", 4);

        directory.add(machine("node1:8080", 2)).unwrap();
        let registered = directory.machines().remove(0);

        // Same address, unchanged volume list: nothing new is allocated and
        // no second record appears.
        let ids = directory.add(registered.clone()).unwrap();
        assert!(ids.is_empty());
        assert_eq!(directory.machine_count(), 1);
        assert_eq!(directory.machines().remove(0), registered);
    }

    #[test]
    fn test_reregistration_grows_to_new_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let directory = Directory::open(dir.path(), "volumes", 4);

        directory.add(machine("node1:8080", 2)).unwrap();
        let mut grown = directory.machines().remove(0);
        grown.capacity = 4;

        let ids = directory.add(grown).unwrap();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(directory.machine_count(), 1);
        assert_eq!(directory.volume_count(), 4);
    }

    #[test]
    fn test_unstated_capacity_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let directory = Directory::open(dir.path(), "volumes", 3);

        let ids = directory.add(machine("node1:8080", 0)).unwrap();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(directory.machines().remove(0).capacity, 3);
    }

    #[test]
    fn test_get_resolves_through_the_index() {
        let dir = tempfile::tempdir().unwrap();
        let directory = Directory::open(dir.path(), "volumes", 4);

        directory.add(machine("node1:8080", 3)).unwrap();
        directory.add(machine("node2:8080", 2)).unwrap();

        // Volume ids and machine positions diverge as soon as a machine
        // hosts more than one volume.
        assert_eq!(directory.get(0).unwrap().server, "node1:8080");
        assert_eq!(directory.get(2).unwrap().server, "node1:8080");
        assert_eq!(directory.get(3).unwrap().server, "node2:8080");
        assert_eq!(directory.get(4).unwrap().server, "node2:8080");
    }

    #[test]
    fn test_get_unknown_volume() {
        let dir = tempfile::tempdir().unwrap();
        let directory = Directory::open(dir.path(), "volumes", 4);

        match directory.get(99) {
            Err(DirectoryError::UnknownVolume(99)) => {}
            other => panic!("expected unknown volume error, got {:?}", other),
        }
    }

    #[test]
    fn test_pick_for_write_on_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let directory = Directory::open(dir.path(), "volumes", 4);

        match directory.pick_for_write() {
            Err(DirectoryError::NoWritableVolume) => {}
            other => panic!("expected no writable volume error, got {:?}", other),
        }
    }

    #[test]
    fn test_filled_volumes_leave_the_candidate_list() {
        let dir = tempfile::tempdir().unwrap();
        let directory = Directory::open(dir.path(), "volumes", 4);

        directory.add(machine("node1:8080", 2)).unwrap();
        assert_eq!(directory.writable_volume_count(), 2);

        let mut full = directory.machines().remove(0);
        full.volumes[0].size = VOLUME_SIZE_LIMIT;
        directory.add(full).unwrap();
        assert_eq!(directory.writable_volume_count(), 1);
        assert_eq!(directory.volume_count(), 2);
    }
}
