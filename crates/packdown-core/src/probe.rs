//! Free-space probe.
//!
//! Resolves any path, existing or not, to the mount hosting it and reports
//! that mount's capacity. Resolution walks to the nearest ancestor mount
//! (longest mount-point prefix), so probing a not-yet-created directory
//! answers with the stats of the filesystem it would land on.

use std::path::{Path, PathBuf};

use sysinfo::Disks;

use crate::model::VolumeState;

/// Capacity numbers for one mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpaceInfo {
    pub total_bytes: u64,
    pub free_bytes: u64,
}

/// Snapshot of the mounted-disk table, answering capacity queries by longest
/// mount-point prefix. The table is captured once; instances are cheap to
/// query from many threads.
#[derive(Debug, Clone)]
pub struct SpaceProbe {
    mounts: Vec<(PathBuf, SpaceInfo)>,
}

impl SpaceProbe {
    /// Capture the current system mount table.
    pub fn new() -> Self {
        let disks = Disks::new_with_refreshed_list();
        let mounts = disks
            .iter()
            .map(|d| {
                (
                    d.mount_point().to_path_buf(),
                    SpaceInfo {
                        total_bytes: d.total_space(),
                        free_bytes: d.available_space(),
                    },
                )
            })
            .collect();
        Self { mounts }
    }

    /// Build a probe over a fixed mount table.
    pub fn from_mounts(mounts: Vec<(PathBuf, SpaceInfo)>) -> Self {
        Self { mounts }
    }

    /// Stats of the mount hosting `path`: the mount with the longest
    /// mount-point prefix of the path. `None` only when no mount matches at
    /// all (not even a root).
    pub fn stat(&self, path: &Path) -> Option<SpaceInfo> {
        self.mounts
            .iter()
            .filter(|(mount, _)| path.starts_with(mount))
            .max_by_key(|(mount, _)| mount.components().count())
            .map(|(_, info)| *info)
    }

    /// A `VolumeState` for the volume mounted at (or hosting) `path`.
    pub fn volume_state(&self, path: &Path) -> Option<VolumeState> {
        self.stat(path).map(|info| VolumeState {
            path: path.display().to_string(),
            total_bytes: info.total_bytes,
            free_bytes: info.free_bytes,
        })
    }
}

impl Default for SpaceProbe {
    fn default() -> Self {
        Self::new()
    }
}
