//! Audit trail: one immutable snapshot per placement decision.
//!
//! Snapshots must survive later mutation of the live capacity map, so each
//! one carries its own copy of the volume states plus a per-volume summary of
//! the residual (not yet placed or skipped) files. File records themselves
//! are immutable and never need cloning into the trail.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{FileRecord, VolumeState};

pub const ACTION_FOLDER_PLACED: &str = "folder-placed";
pub const ACTION_FOLDER_SKIPPED: &str = "folder-skipped";
pub const ACTION_FILE_PLACED: &str = "file-placed";
pub const ACTION_FILE_SKIPPED: &str = "file-skipped";

/// Residual inventory on one volume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VolumeFiles {
    pub count: usize,
    pub bytes: u64,
}

/// The world as it stands after a mutation: live volume states and the
/// residual file summary per volume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotView {
    pub disks: Vec<VolumeState>,
    pub files: BTreeMap<String, VolumeFiles>,
}

/// One audit record. `step` numbering is contiguous from 1 and snapshot `N`
/// reflects the state after action `N`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldViewSnapshot {
    pub step: u64,
    pub action: String,
    #[serde(rename = "worldView")]
    pub world_view: SnapshotView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
}

/// Append-only recorder owned by a single planner invocation.
#[derive(Debug, Default)]
pub struct AuditRecorder {
    snapshots: Vec<WorldViewSnapshot>,
}

impl AuditRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        action: &str,
        world_view: SnapshotView,
        metadata: Option<BTreeMap<String, String>>,
    ) {
        let step = self.snapshots.len() as u64 + 1;
        self.snapshots.push(WorldViewSnapshot {
            step,
            action: action.to_string(),
            world_view,
            metadata,
        });
    }

    pub fn snapshots(&self) -> &[WorldViewSnapshot] {
        &self.snapshots
    }

    pub fn into_snapshots(self) -> Vec<WorldViewSnapshot> {
        self.snapshots
    }
}

/// Render the snapshot vector as the ordered JSON array consumed by the
/// audit view.
pub fn export_json(snapshots: &[WorldViewSnapshot]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(snapshots)
}

/// Build the residual-files summary for a snapshot.
pub fn summarize_files(files: &[FileRecord]) -> BTreeMap<String, VolumeFiles> {
    let mut summary: BTreeMap<String, VolumeFiles> = BTreeMap::new();
    for f in files {
        let entry = summary.entry(f.source_volume.clone()).or_default();
        entry.count += 1;
        entry.bytes = entry.bytes.saturating_add(f.size_bytes);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::{file, volume};

    fn view() -> SnapshotView {
        SnapshotView {
            disks: vec![volume("/mnt/disk1", 1000, 400)],
            files: summarize_files(&[file("/mnt/disk1", "a", 10), file("/mnt/disk1", "b", 20)]),
        }
    }

    #[test]
    fn test_steps_are_contiguous_from_one() {
        let mut recorder = AuditRecorder::new();
        recorder.record(ACTION_FOLDER_PLACED, view(), None);
        recorder.record(ACTION_FILE_PLACED, view(), None);
        recorder.record(ACTION_FILE_SKIPPED, view(), None);

        let steps: Vec<u64> = recorder.snapshots().iter().map(|s| s.step).collect();
        assert_eq!(steps, [1, 2, 3]);
    }

    #[test]
    fn test_summarize_files_per_volume() {
        let summary = summarize_files(&[
            file("/mnt/disk1", "a", 10),
            file("/mnt/disk1", "b", 20),
            file("/mnt/disk2", "c", 5),
        ]);
        assert_eq!(summary["/mnt/disk1"], VolumeFiles { count: 2, bytes: 30 });
        assert_eq!(summary["/mnt/disk2"], VolumeFiles { count: 1, bytes: 5 });
    }

    #[test]
    fn test_export_shape() {
        let mut recorder = AuditRecorder::new();
        let mut metadata = BTreeMap::new();
        metadata.insert("target".to_string(), "/mnt/disk2".to_string());
        recorder.record(ACTION_FOLDER_PLACED, view(), Some(metadata));

        let json = export_json(recorder.snapshots()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["step"], 1);
        assert_eq!(parsed[0]["action"], "folder-placed");
        assert!(parsed[0]["worldView"]["disks"].is_array());
        assert_eq!(parsed[0]["metadata"]["target"], "/mnt/disk2");
    }
}
