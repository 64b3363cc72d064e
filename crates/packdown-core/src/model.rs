//! Data model shared across the planner stages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::units;

/// A discovered file. Immutable once produced by the scanner; the planner
/// only references records, it never rewrites them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Full on-disk path, globally unique within a snapshot.
    pub absolute_path: String,
    /// Path within the owning volume, used to derive destination paths.
    pub relative_path: String,
    pub size_bytes: u64,
    /// Path of the volume this file currently lives on.
    pub source_volume: String,
}

/// One storage volume in the consolidation set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeState {
    /// Mount path, unique key within a snapshot.
    pub path: String,
    pub total_bytes: u64,
    pub free_bytes: u64,
}

impl VolumeState {
    pub fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.free_bytes)
    }

    pub fn used_ratio(&self) -> f64 {
        units::used_ratio(self.used_bytes(), self.total_bytes)
    }
}

/// The input snapshot handed to the planner: every volume in the set plus the
/// file inventory. Every `FileRecord::source_volume` must name one of the
/// volumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldView {
    pub volumes: Vec<VolumeState>,
    pub files: Vec<FileRecord>,
}

/// Files sharing an immediate parent directory, with the aggregates the
/// packer decides on.
#[derive(Debug, Clone)]
pub struct FolderGroup {
    /// Immediate parent of every member's relative path; empty for root files.
    pub folder_path: String,
    pub files: Vec<FileRecord>,
    pub total_bytes: u64,
    pub largest_file_bytes: u64,
    /// Whether this folder must land on a single destination or not at all.
    pub keep_together: bool,
}

/// A tentative placement produced by the combination scorer.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub files: Vec<FileRecord>,
    pub total_bytes: u64,
    pub target_volume: String,
    /// Capacity left over on the target after this placement.
    pub wasted_space: u64,
    /// Destination utilization in `(0, 1]`.
    pub score: f64,
}

/// Lifecycle of a planned move. The planner emits `Pending` and `Skipped`;
/// the remaining states belong to the transfer executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveStatus {
    Pending,
    InProgress,
    Completed,
    Skipped,
    Failed,
}

/// A planned relocation of a single file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMove {
    pub file: FileRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_volume: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_path: Option<String>,
    pub status: MoveStatus,
    /// Present exactly when the move was skipped or failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl FileMove {
    pub fn pending(file: FileRecord, target_volume: &str) -> Self {
        let destination_path = format!("{}/{}", target_volume, file.relative_path);
        Self {
            file,
            target_volume: Some(target_volume.to_string()),
            destination_path: Some(destination_path),
            status: MoveStatus::Pending,
            reason: None,
        }
    }

    pub fn skipped(file: FileRecord, reason: &str) -> Self {
        Self {
            file,
            target_volume: None,
            destination_path: None,
            status: MoveStatus::Skipped,
            reason: Some(reason.to_string()),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == MoveStatus::Pending
    }

    /// Demote a pending move to skipped, clearing its destination.
    pub fn skip(&mut self, reason: &str) {
        self.status = MoveStatus::Skipped;
        self.reason = Some(reason.to_string());
        self.target_volume = None;
        self.destination_path = None;
    }
}

/// Aggregates over the pending portion of a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub total_files: usize,
    pub total_bytes: u64,
    pub moves_by_target: BTreeMap<String, usize>,
    pub bytes_by_target: BTreeMap<String, u64>,
}

/// The planner's output: ordered moves plus derived summary statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub moves: Vec<FileMove>,
    pub summary: PlanSummary,
}

impl Plan {
    pub fn skipped_count(&self) -> usize {
        self.moves
            .iter()
            .filter(|m| m.status == MoveStatus::Skipped)
            .count()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_volume_derived_fields() {
        let v = volume("/mnt/disk1", 1000, 300);
        assert_eq!(v.used_bytes(), 700);
        assert!((v.used_ratio() - 0.7).abs() < 1e-9);

        let empty = volume("/mnt/disk2", 0, 0);
        assert_eq!(empty.used_ratio(), 0.0);
    }

    #[test]
    fn test_pending_move_destination() {
        let mv = FileMove::pending(file("/mnt/disk1", "movies/a.mkv", 10), "/mnt/disk2");
        assert_eq!(mv.destination_path.as_deref(), Some("/mnt/disk2/movies/a.mkv"));
        assert_eq!(mv.status, MoveStatus::Pending);
        assert!(mv.reason.is_none());
    }

    #[test]
    fn test_skip_clears_destination() {
        let mut mv = FileMove::pending(file("/mnt/disk1", "a", 10), "/mnt/disk2");
        mv.skip("source vanished");
        assert_eq!(mv.status, MoveStatus::Skipped);
        assert!(mv.target_volume.is_none());
        assert!(mv.destination_path.is_none());
        assert_eq!(mv.reason.as_deref(), Some("source vanished"));
    }
}
