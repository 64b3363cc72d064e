//! Volume ranking: the evacuation schedule.
//!
//! Volumes hosting no candidate files are dropped (they remain eligible as
//! targets inside the packer); the rest sort least-full first so that as many
//! whole volumes as possible can reach zero files.

use crate::model::{FileRecord, VolumeState};

/// A volume eligible as a move source, with its candidate inventory totals.
#[derive(Debug, Clone)]
pub struct RankedVolume {
    pub state: VolumeState,
    pub candidate_files: usize,
    pub candidate_bytes: u64,
}

/// Rank `volumes` as evacuation sources given the filtered `files`.
/// Ascending used ratio, ties broken by ascending path.
pub fn rank_sources(volumes: &[VolumeState], files: &[FileRecord]) -> Vec<RankedVolume> {
    let mut ranked: Vec<RankedVolume> = volumes
        .iter()
        .map(|v| {
            let mut count = 0usize;
            let mut bytes = 0u64;
            for f in files.iter().filter(|f| f.source_volume == v.path) {
                count += 1;
                bytes = bytes.saturating_add(f.size_bytes);
            }
            RankedVolume {
                state: v.clone(),
                candidate_files: count,
                candidate_bytes: bytes,
            }
        })
        .filter(|r| r.candidate_files > 0)
        .collect();

    ranked.sort_by(|a, b| {
        a.state
            .used_ratio()
            .total_cmp(&b.state.used_ratio())
            .then_with(|| a.state.path.cmp(&b.state.path))
    });
    ranked
}
