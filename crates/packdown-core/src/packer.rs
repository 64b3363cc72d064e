//! Hybrid bin-packer.
//!
//! Sources are processed least-full first so whole volumes reach zero files.
//! Each source gets two passes: whole folders best-fit onto targets, then the
//! files of folders that did not fit as a unit are placed individually, with
//! a bounded combination search filling near-full destinations. Every
//! placement decision mutates the live capacity map and appends one audit
//! snapshot.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::audit::{
    self, AuditRecorder, SnapshotView, WorldViewSnapshot, ACTION_FILE_PLACED, ACTION_FILE_SKIPPED,
    ACTION_FOLDER_PLACED, ACTION_FOLDER_SKIPPED,
};
use crate::errors::{PlanError, PlanResult};
use crate::filter::FilterCriteria;
use crate::grouping;
use crate::model::{FileMove, FileRecord, ScoredCandidate, VolumeState, WorldView};
use crate::ranking;
use crate::scorer;
use crate::script;
use crate::units::GIB;

pub const REASON_FOLDER_NO_SPACE: &str =
    "folder must stay together but no target has sufficient space";
pub const REASON_NO_SPACE: &str = "no destination has sufficient free space";

/// Target selection policy, chosen at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitPolicy {
    /// The target whose remaining capacity after placement is smallest.
    BestFit,
    /// The first target (ascending path) that satisfies the reserve.
    FirstFit,
}

/// Planner configuration. Everything flows through here; the planner keeps
/// no process-wide state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanOptions {
    pub filter: FilterCriteria,
    /// Folders totalling less than this stay together.
    pub min_split_size: u64,
    /// A folder whose largest file reaches this share of its total stays
    /// together. Zero disables the rule.
    pub folder_threshold: f64,
    /// Free-byte floor no placement may consume on any target.
    pub min_free_reserve: u64,
    /// Evacuation stops when the next source holds less than this.
    pub min_space: u64,
    /// Explicit source whitelist; empty enables iterative evacuation.
    pub source_volumes: Vec<String>,
    /// Explicit destination whitelist; empty allows every volume.
    pub target_volumes: Vec<String>,
    pub fit_policy: FitPolicy,
    /// Upper bound on combination size in the gap-filling search.
    pub max_combination: usize,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            filter: FilterCriteria::default(),
            min_split_size: GIB,
            folder_threshold: 0.9,
            min_free_reserve: GIB,
            min_space: 0,
            source_volumes: Vec::new(),
            target_volumes: Vec::new(),
            fit_policy: FitPolicy::BestFit,
            max_combination: scorer::DEFAULT_MAX_COMBINATION,
        }
    }
}

/// Planner output: the materialized plan plus the audit trail.
#[derive(Debug)]
pub struct PlanOutcome {
    pub plan: crate::model::Plan,
    pub audit: Vec<WorldViewSnapshot>,
}

/// Run the full planning pipeline over an input snapshot. Pure: identical
/// input yields an identical plan and audit trail.
pub fn plan_moves(world: &WorldView, options: &PlanOptions) -> PlanResult<PlanOutcome> {
    validate(world, options)?;

    let compiled = options.filter.compile()?;
    let candidates = compiled.apply(&world.files);

    let mut packer = Packer::new(world, options, candidates);

    if options.source_volumes.is_empty() {
        // Iterative evacuation: re-rank the remaining inventory after each
        // drained source so the next least-full volume goes next.
        loop {
            let live = packer.live_states();
            let ranked = ranking::rank_sources(&live, &packer.remaining);
            let next = ranked
                .into_iter()
                .find(|r| !packer.evacuated.contains(&r.state.path));
            let Some(next) = next else { break };
            if next.candidate_bytes < options.min_space {
                break;
            }
            packer.process_source(&next.state.path);
            packer.evacuated.insert(next.state.path);
        }
    } else {
        let whitelisted: Vec<VolumeState> = world
            .volumes
            .iter()
            .filter(|v| options.source_volumes.contains(&v.path))
            .cloned()
            .collect();
        for ranked in ranking::rank_sources(&whitelisted, &packer.remaining) {
            packer.process_source(&ranked.state.path);
            packer.evacuated.insert(ranked.state.path);
        }
    }

    let plan = script::materialize(packer.moves);
    Ok(PlanOutcome {
        plan,
        audit: packer.recorder.into_snapshots(),
    })
}

fn validate(world: &WorldView, options: &PlanOptions) -> PlanResult<()> {
    if world.volumes.is_empty() {
        return Err(PlanError::InvalidInput("empty volume set".to_string()));
    }
    let mut paths = BTreeSet::new();
    for v in &world.volumes {
        if !paths.insert(v.path.as_str()) {
            return Err(PlanError::InvalidInput(format!(
                "duplicate volume {}",
                v.path
            )));
        }
        if v.free_bytes > v.total_bytes {
            return Err(PlanError::InvalidInput(format!(
                "volume {} reports more free than total",
                v.path
            )));
        }
    }
    for f in &world.files {
        if !paths.contains(f.source_volume.as_str()) {
            return Err(PlanError::InvalidInput(format!(
                "file {} references unknown volume {}",
                f.absolute_path, f.source_volume
            )));
        }
    }
    for src in &options.source_volumes {
        if !paths.contains(src.as_str()) {
            return Err(PlanError::InvalidInput(format!(
                "unknown source volume {}",
                src
            )));
        }
    }
    for dest in &options.target_volumes {
        if !paths.contains(dest.as_str()) {
            return Err(PlanError::InvalidInput(format!(
                "unknown destination volume {}",
                dest
            )));
        }
    }
    if !(0.0..=1.0).contains(&options.folder_threshold) {
        return Err(PlanError::InvalidInput(format!(
            "folder threshold {} outside [0, 1]",
            options.folder_threshold
        )));
    }
    Ok(())
}

struct Packer<'a> {
    options: &'a PlanOptions,
    /// Input volume order, preserved for snapshot rendering.
    volume_order: Vec<String>,
    totals: BTreeMap<String, u64>,
    /// Live capacity map, decremented as placements are committed.
    live_free: BTreeMap<String, u64>,
    /// Candidate files not yet placed or skipped.
    remaining: Vec<FileRecord>,
    moves: Vec<FileMove>,
    recorder: AuditRecorder,
    /// Volumes already drained in this run; never refilled.
    evacuated: BTreeSet<String>,
    pending_count: usize,
    skipped_count: usize,
}

impl<'a> Packer<'a> {
    fn new(world: &WorldView, options: &'a PlanOptions, candidates: Vec<FileRecord>) -> Self {
        Self {
            options,
            volume_order: world.volumes.iter().map(|v| v.path.clone()).collect(),
            totals: world
                .volumes
                .iter()
                .map(|v| (v.path.clone(), v.total_bytes))
                .collect(),
            live_free: world
                .volumes
                .iter()
                .map(|v| (v.path.clone(), v.free_bytes))
                .collect(),
            remaining: candidates,
            moves: Vec::new(),
            recorder: AuditRecorder::new(),
            evacuated: BTreeSet::new(),
            pending_count: 0,
            skipped_count: 0,
        }
    }

    fn live_states(&self) -> Vec<VolumeState> {
        self.volume_order
            .iter()
            .map(|path| VolumeState {
                path: path.clone(),
                total_bytes: self.totals[path],
                free_bytes: self.live_free[path],
            })
            .collect()
    }

    fn available(&self, path: &str) -> u64 {
        self.live_free[path].saturating_sub(self.options.min_free_reserve)
    }

    fn is_target(&self, path: &str, source: &str) -> bool {
        if path == source || self.evacuated.contains(path) {
            return false;
        }
        if !self.options.source_volumes.is_empty()
            && self.options.source_volumes.iter().any(|s| s == path)
        {
            return false;
        }
        self.options.target_volumes.is_empty()
            || self.options.target_volumes.iter().any(|t| t == path)
    }

    /// Eligible targets in ascending path order.
    fn targets(&self, source: &str) -> Vec<String> {
        let mut targets: Vec<String> = self
            .volume_order
            .iter()
            .filter(|p| self.is_target(p.as_str(), source))
            .cloned()
            .collect();
        targets.sort();
        targets
    }

    fn select_target(&self, size: u64, source: &str) -> Option<String> {
        let targets = self.targets(source);
        match self.options.fit_policy {
            FitPolicy::FirstFit => targets.into_iter().find(|t| self.available(t) >= size),
            FitPolicy::BestFit => {
                let mut best: Option<(u64, String)> = None;
                for t in targets {
                    let available = self.available(&t);
                    if available < size {
                        continue;
                    }
                    let slack = available - size;
                    match &best {
                        Some((best_slack, _)) if slack >= *best_slack => {}
                        _ => best = Some((slack, t)),
                    }
                }
                best.map(|(_, t)| t)
            }
        }
    }

    fn commit(&mut self, files: &[FileRecord], target: &str) {
        let total: u64 = files.iter().map(|f| f.size_bytes).sum();
        for f in files {
            self.moves.push(FileMove::pending(f.clone(), target));
            self.pending_count += 1;
        }
        if let Some(free) = self.live_free.get_mut(target) {
            *free = free.saturating_sub(total);
        }
        self.drop_remaining(files);
    }

    fn skip(&mut self, files: &[FileRecord], reason: &str) {
        for f in files {
            self.moves.push(FileMove::skipped(f.clone(), reason));
            self.skipped_count += 1;
        }
        self.drop_remaining(files);
    }

    fn drop_remaining(&mut self, files: &[FileRecord]) {
        let gone: BTreeSet<&str> = files.iter().map(|f| f.absolute_path.as_str()).collect();
        self.remaining
            .retain(|f| !gone.contains(f.absolute_path.as_str()));
    }

    fn record(&mut self, action: &str, mut metadata: BTreeMap<String, String>) {
        metadata.insert("pending".to_string(), self.pending_count.to_string());
        metadata.insert("skipped".to_string(), self.skipped_count.to_string());
        let view = SnapshotView {
            disks: self.live_states(),
            files: audit::summarize_files(&self.remaining),
        };
        self.recorder.record(action, view, Some(metadata));
    }

    fn process_source(&mut self, source: &str) {
        let source_files: Vec<FileRecord> = self
            .remaining
            .iter()
            .filter(|f| f.source_volume == source)
            .cloned()
            .collect();
        if source_files.is_empty() {
            return;
        }

        let mut groups = grouping::group_by_parent(
            &source_files,
            self.options.min_split_size,
            self.options.folder_threshold,
        );
        groups.sort_by(|a, b| {
            b.total_bytes
                .cmp(&a.total_bytes)
                .then_with(|| a.folder_path.cmp(&b.folder_path))
        });

        // Pass 1: whole folders.
        let mut exploded: Vec<FileRecord> = Vec::new();
        for group in groups {
            if let Some(target) = self.select_target(group.total_bytes, source) {
                self.commit(&group.files, &target);
                self.record(
                    ACTION_FOLDER_PLACED,
                    folder_metadata(source, Some(&target), &group.folder_path, &group.files),
                );
            } else if group.keep_together {
                self.skip(&group.files, REASON_FOLDER_NO_SPACE);
                self.record(
                    ACTION_FOLDER_SKIPPED,
                    folder_metadata(source, None, &group.folder_path, &group.files),
                );
            } else {
                exploded.extend(group.files);
            }
        }

        // Pass 2: individual files from exploded folders, largest first.
        exploded.sort_by(|a, b| {
            b.size_bytes
                .cmp(&a.size_bytes)
                .then_with(|| a.absolute_path.cmp(&b.absolute_path))
        });

        let mut decided: BTreeSet<String> = BTreeSet::new();
        for file in &exploded {
            if decided.contains(&file.absolute_path) {
                continue;
            }
            if let Some(target) = self.select_target(file.size_bytes, source) {
                self.commit(std::slice::from_ref(file), &target);
                decided.insert(file.absolute_path.clone());
                self.record(
                    ACTION_FILE_PLACED,
                    file_metadata(source, Some(&target), file),
                );
                continue;
            }

            // The file alone fits nowhere; see whether bundling several
            // smaller leftovers into a near-full destination works.
            let pool: Vec<FileRecord> = exploded
                .iter()
                .filter(|f| !decided.contains(&f.absolute_path))
                .cloned()
                .collect();
            if let Some(combo) = self.best_combination(&pool, source) {
                for f in &combo.files {
                    decided.insert(f.absolute_path.clone());
                }
                self.commit(&combo.files, &combo.target_volume);
                let mut metadata =
                    folder_metadata(source, Some(&combo.target_volume), "", &combo.files);
                metadata.remove("folder");
                self.record(ACTION_FILE_PLACED, metadata);
            }

            if !decided.contains(&file.absolute_path) {
                self.skip(std::slice::from_ref(file), REASON_NO_SPACE);
                decided.insert(file.absolute_path.clone());
                self.record(ACTION_FILE_SKIPPED, file_metadata(source, None, file));
            }
        }
    }

    /// Best-scoring combination across every eligible target. Cross-target
    /// ties fall to the candidate with fewer files, then less waste, then the
    /// smaller target path.
    fn best_combination(&self, pool: &[FileRecord], source: &str) -> Option<ScoredCandidate> {
        let mut best: Option<ScoredCandidate> = None;
        for target in self.targets(source) {
            let available = self.available(&target);
            let Some(candidate) =
                scorer::best_candidate(pool, available, &target, self.options.max_combination)
            else {
                continue;
            };
            let replace = match &best {
                None => true,
                Some(current) => match candidate.score.total_cmp(&current.score) {
                    std::cmp::Ordering::Greater => true,
                    std::cmp::Ordering::Less => false,
                    std::cmp::Ordering::Equal => {
                        (candidate.files.len(), candidate.wasted_space)
                            < (current.files.len(), current.wasted_space)
                    }
                },
            };
            if replace {
                best = Some(candidate);
            }
        }
        best
    }
}

fn folder_metadata(
    source: &str,
    target: Option<&str>,
    folder: &str,
    files: &[FileRecord],
) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    metadata.insert("source".to_string(), source.to_string());
    if let Some(target) = target {
        metadata.insert("target".to_string(), target.to_string());
    }
    metadata.insert("folder".to_string(), folder.to_string());
    metadata.insert("files".to_string(), files.len().to_string());
    metadata.insert(
        "bytes".to_string(),
        files
            .iter()
            .map(|f| f.size_bytes)
            .sum::<u64>()
            .to_string(),
    );
    metadata
}

fn file_metadata(source: &str, target: Option<&str>, file: &FileRecord) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    metadata.insert("source".to_string(), source.to_string());
    if let Some(target) = target {
        metadata.insert("target".to_string(), target.to_string());
    }
    metadata.insert("file".to_string(), file.relative_path.clone());
    metadata.insert("bytes".to_string(), file.size_bytes.to_string());
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::{file, volume};
    use crate::model::MoveStatus;

    fn options(reserve: u64) -> PlanOptions {
        PlanOptions {
            min_free_reserve: reserve,
            ..Default::default()
        }
    }

    fn pending<'p>(outcome: &'p PlanOutcome) -> Vec<&'p FileMove> {
        outcome
            .plan
            .moves
            .iter()
            .filter(|m| m.status == MoveStatus::Pending)
            .collect()
    }

    fn skipped<'p>(outcome: &'p PlanOutcome) -> Vec<&'p FileMove> {
        outcome
            .plan
            .moves
            .iter()
            .filter(|m| m.status == MoveStatus::Skipped)
            .collect()
    }

    /// Folders fall back to the next-best target once the tightest fills up.
    #[test]
    fn test_folders_best_fit_with_fallback() {
        let world = WorldView {
            volumes: vec![
                volume("/mnt/a", 1000, 500),
                volume("/mnt/b", 1000, 300),
                volume("/mnt/src", 1000, 100),
            ],
            files: vec![
                file("/mnt/src", "movies/a", 150),
                file("/mnt/src", "movies/b", 100),
                file("/mnt/src", "photos/p", 100),
            ],
        };
        let outcome = plan_moves(&world, &options(50)).unwrap();

        assert_eq!(pending(&outcome).len(), 3);
        assert!(skipped(&outcome).is_empty());

        for m in pending(&outcome) {
            let expected = if m.file.relative_path.starts_with("movies") {
                "/mnt/b"
            } else {
                "/mnt/a"
            };
            assert_eq!(m.target_volume.as_deref(), Some(expected));
        }
    }

    #[test]
    fn test_small_folder_lands_whole_on_one_target() {
        let world = WorldView {
            volumes: vec![volume("/mnt/a", 2000, 1000), volume("/mnt/src", 2000, 0)],
            files: (1..=4)
                .map(|i| file("/mnt/src", &format!("anime/e{}", i), 100))
                .collect(),
        };
        let outcome = plan_moves(&world, &options(50)).unwrap();

        let moves = pending(&outcome);
        assert_eq!(moves.len(), 4);
        assert!(moves
            .iter()
            .all(|m| m.target_volume.as_deref() == Some("/mnt/a")));
    }

    /// A splittable folder that fits nowhere whole is exploded; leftover
    /// files that fit no target are skipped, and no target ever dips under
    /// its reserve.
    #[test]
    fn test_exploded_folder_spreads_and_skips() {
        let world = WorldView {
            volumes: vec![
                volume("/mnt/a", 1000, 200),
                volume("/mnt/b", 1000, 150),
                volume("/mnt/src", 1000, 0),
            ],
            files: (1..=5)
                .map(|i| file("/mnt/src", &format!("big/f{}", i), 100))
                .collect(),
        };
        let opts = PlanOptions {
            min_free_reserve: 50,
            min_split_size: 0,
            ..Default::default()
        };
        let outcome = plan_moves(&world, &opts).unwrap();

        let placed = pending(&outcome);
        assert_eq!(placed.len(), 2);
        let on_a = placed
            .iter()
            .filter(|m| m.target_volume.as_deref() == Some("/mnt/a"))
            .count();
        let on_b = placed
            .iter()
            .filter(|m| m.target_volume.as_deref() == Some("/mnt/b"))
            .count();
        assert_eq!((on_a, on_b), (1, 1));

        let skips = skipped(&outcome);
        assert_eq!(skips.len(), 3);
        assert!(skips.iter().all(|m| m.reason.as_deref() == Some(REASON_NO_SPACE)));
    }

    #[test]
    fn test_oversized_root_file_is_skipped() {
        let world = WorldView {
            volumes: vec![volume("/mnt/a", 1000, 100), volume("/mnt/src", 1000, 0)],
            files: vec![file("/mnt/src", "huge", 500)],
        };
        let outcome = plan_moves(&world, &options(50)).unwrap();

        assert!(pending(&outcome).is_empty());
        let skips = skipped(&outcome);
        assert_eq!(skips.len(), 1);
        assert!(skips[0].reason.as_deref().unwrap().contains("sufficient"));
    }

    #[test]
    fn test_first_fit_takes_first_not_tightest() {
        let world = WorldView {
            volumes: vec![
                volume("/mnt/a", 1000, 500),
                volume("/mnt/b", 1000, 250),
                volume("/mnt/src", 1000, 0),
            ],
            files: vec![file("/mnt/src", "folder/f", 200)],
        };
        let opts = PlanOptions {
            min_free_reserve: 50,
            fit_policy: FitPolicy::FirstFit,
            ..Default::default()
        };
        let outcome = plan_moves(&world, &opts).unwrap();
        assert_eq!(pending(&outcome)[0].target_volume.as_deref(), Some("/mnt/a"));

        // Best-fit picks the tighter /mnt/b instead.
        let outcome = plan_moves(&world, &options(50)).unwrap();
        assert_eq!(pending(&outcome)[0].target_volume.as_deref(), Some("/mnt/b"));
    }

    #[test]
    fn test_atomic_folder_skips_whole_when_no_target_fits() {
        let world = WorldView {
            volumes: vec![volume("/mnt/a", 1000, 100), volume("/mnt/src", 1000, 0)],
            files: vec![
                file("/mnt/src", "set/a", 300),
                file("/mnt/src", "set/b", 300),
            ],
        };
        let outcome = plan_moves(&world, &options(50)).unwrap();

        let skips = skipped(&outcome);
        assert_eq!(skips.len(), 2);
        assert!(skips
            .iter()
            .all(|m| m.reason.as_deref() == Some(REASON_FOLDER_NO_SPACE)));
        assert!(pending(&outcome).is_empty());
    }

    #[test]
    fn test_empty_inventory_yields_empty_plan() {
        let world = WorldView {
            volumes: vec![volume("/mnt/a", 1000, 500)],
            files: vec![],
        };
        let outcome = plan_moves(&world, &options(0)).unwrap();
        assert!(outcome.plan.moves.is_empty());
        assert!(outcome.audit.is_empty());
        assert_eq!(outcome.plan.summary.total_files, 0);
    }

    #[test]
    fn test_single_volume_has_no_valid_target() {
        let world = WorldView {
            volumes: vec![volume("/mnt/a", 1000, 900)],
            files: vec![file("/mnt/a", "x", 10)],
        };
        let outcome = plan_moves(&world, &options(0)).unwrap();
        assert!(pending(&outcome).is_empty());
        assert_eq!(skipped(&outcome).len(), 1);
    }

    #[test]
    fn test_capacity_safety_invariant() {
        let world = WorldView {
            volumes: vec![
                volume("/mnt/a", 1000, 320),
                volume("/mnt/b", 1000, 280),
                volume("/mnt/src", 1000, 0),
            ],
            files: (0..20)
                .map(|i| file("/mnt/src", &format!("d{}/f{}", i % 4, i), 40 + (i as u64 * 13) % 90))
                .collect(),
        };
        let opts = PlanOptions {
            min_free_reserve: 100,
            min_split_size: 0,
            folder_threshold: 0.0,
            ..Default::default()
        };
        let outcome = plan_moves(&world, &opts).unwrap();

        let mut per_target: BTreeMap<&str, u64> = BTreeMap::new();
        for m in pending(&outcome) {
            *per_target.entry(m.target_volume.as_deref().unwrap()).or_default() +=
                m.file.size_bytes;
        }
        assert!(per_target.get("/mnt/a").copied().unwrap_or(0) <= 320 - 100);
        assert!(per_target.get("/mnt/b").copied().unwrap_or(0) <= 280 - 100);

        // No self-moves and no double scheduling.
        let mut seen = BTreeSet::new();
        for m in pending(&outcome) {
            assert_ne!(m.target_volume.as_deref().unwrap(), m.file.source_volume);
            assert!(seen.insert(m.file.absolute_path.clone()));
        }
    }

    #[test]
    fn test_folder_atomicity_invariant() {
        let world = WorldView {
            volumes: vec![
                volume("/mnt/a", 1000, 400),
                volume("/mnt/b", 1000, 400),
                volume("/mnt/src", 1000, 0),
            ],
            files: vec![
                file("/mnt/src", "one/a", 100),
                file("/mnt/src", "one/b", 100),
                file("/mnt/src", "two/c", 120),
                file("/mnt/src", "two/d", 120),
            ],
        };
        let outcome = plan_moves(&world, &options(50)).unwrap();

        let mut targets_by_folder: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for m in pending(&outcome) {
            targets_by_folder
                .entry(grouping::immediate_parent(&m.file.relative_path))
                .or_default()
                .insert(m.target_volume.as_deref().unwrap());
        }
        for (_, targets) in targets_by_folder {
            assert_eq!(targets.len(), 1);
        }
    }

    #[test]
    fn test_determinism_across_runs() {
        let world = WorldView {
            volumes: vec![
                volume("/mnt/a", 1000, 500),
                volume("/mnt/b", 1000, 300),
                volume("/mnt/src", 1000, 100),
            ],
            files: vec![
                file("/mnt/src", "movies/a", 150),
                file("/mnt/src", "movies/b", 100),
                file("/mnt/src", "photos/p", 100),
            ],
        };
        let first = plan_moves(&world, &options(50)).unwrap();
        let second = plan_moves(&world, &options(50)).unwrap();

        assert_eq!(first.plan, second.plan);
        let render = |o: &PlanOutcome| crate::audit::export_json(&o.audit).unwrap();
        assert_eq!(render(&first), render(&second));
    }

    #[test]
    fn test_evacuation_starts_with_least_full_source() {
        let world = WorldView {
            volumes: vec![
                volume("/mnt/full", 1000, 100),
                volume("/mnt/light", 1000, 900),
                volume("/mnt/spare", 1000, 1000),
            ],
            files: vec![
                file("/mnt/full", "f/a", 50),
                file("/mnt/light", "l/b", 50),
            ],
        };
        let opts = PlanOptions {
            min_free_reserve: 0,
            ..Default::default()
        };
        let outcome = plan_moves(&world, &opts).unwrap();

        // The least-full-by-ratio volume with candidates is /mnt/light.
        let first_meta = outcome.audit[0].metadata.as_ref().unwrap();
        assert_eq!(first_meta["source"], "/mnt/light");
    }

    #[test]
    fn test_evacuated_source_is_not_refilled() {
        let world = WorldView {
            volumes: vec![
                volume("/mnt/a", 1000, 800),
                volume("/mnt/b", 1000, 700),
                volume("/mnt/c", 1000, 1000),
            ],
            files: vec![file("/mnt/a", "x/f", 100), file("/mnt/b", "y/g", 100)],
        };
        let opts = PlanOptions {
            min_free_reserve: 0,
            ..Default::default()
        };
        let outcome = plan_moves(&world, &opts).unwrap();

        // /mnt/a drains first (lowest used ratio among sources); /mnt/b's
        // file must not land back on it.
        for m in pending(&outcome) {
            if m.file.source_volume == "/mnt/b" {
                assert_ne!(m.target_volume.as_deref(), Some("/mnt/a"));
            }
        }
    }

    #[test]
    fn test_min_space_stops_evacuation() {
        let world = WorldView {
            volumes: vec![
                volume("/mnt/a", 1000, 900),
                volume("/mnt/b", 1000, 1000),
            ],
            files: vec![file("/mnt/a", "small/f", 10)],
        };
        let opts = PlanOptions {
            min_free_reserve: 0,
            min_space: 100,
            ..Default::default()
        };
        let outcome = plan_moves(&world, &opts).unwrap();
        assert!(outcome.plan.moves.is_empty());
    }

    #[test]
    fn test_source_whitelist_restricts_sources_and_targets() {
        let world = WorldView {
            volumes: vec![
                volume("/mnt/a", 1000, 900),
                volume("/mnt/b", 1000, 900),
                volume("/mnt/c", 1000, 1000),
            ],
            files: vec![file("/mnt/a", "x/f", 100), file("/mnt/b", "y/g", 100)],
        };
        let opts = PlanOptions {
            min_free_reserve: 0,
            source_volumes: vec!["/mnt/a".to_string(), "/mnt/b".to_string()],
            ..Default::default()
        };
        let outcome = plan_moves(&world, &opts).unwrap();

        let moves = pending(&outcome);
        assert_eq!(moves.len(), 2);
        assert!(moves
            .iter()
            .all(|m| m.target_volume.as_deref() == Some("/mnt/c")));
    }

    #[test]
    fn test_destination_whitelist() {
        let world = WorldView {
            volumes: vec![
                volume("/mnt/a", 1000, 1000),
                volume("/mnt/b", 1000, 1000),
                volume("/mnt/src", 1000, 0),
            ],
            files: vec![file("/mnt/src", "m/f", 100)],
        };
        let opts = PlanOptions {
            min_free_reserve: 0,
            target_volumes: vec!["/mnt/b".to_string()],
            ..Default::default()
        };
        let outcome = plan_moves(&world, &opts).unwrap();
        assert_eq!(pending(&outcome)[0].target_volume.as_deref(), Some("/mnt/b"));
    }

    #[test]
    fn test_combination_fills_gap_single_cannot() {
        // The 90-byte file fits nowhere, but 40+30 fill the 70-byte gap.
        let world = WorldView {
            volumes: vec![volume("/mnt/a", 1000, 70), volume("/mnt/src", 1000, 0)],
            files: vec![
                file("/mnt/src", "pool/big", 90),
                file("/mnt/src", "pool/mid", 40),
                file("/mnt/src", "pool/small", 30),
            ],
        };
        let opts = PlanOptions {
            min_free_reserve: 0,
            min_split_size: 0,
            folder_threshold: 0.0,
            ..Default::default()
        };
        let outcome = plan_moves(&world, &opts).unwrap();

        let placed: BTreeSet<&str> = pending(&outcome)
            .iter()
            .map(|m| m.file.relative_path.as_str())
            .collect();
        assert!(placed.contains("pool/mid"));
        assert!(placed.contains("pool/small"));

        let skips = skipped(&outcome);
        assert_eq!(skips.len(), 1);
        assert_eq!(skips[0].file.relative_path, "pool/big");
    }

    #[test]
    fn test_validation_errors() {
        let empty = WorldView {
            volumes: vec![],
            files: vec![],
        };
        assert!(matches!(
            plan_moves(&empty, &PlanOptions::default()),
            Err(PlanError::InvalidInput(_))
        ));

        let world = WorldView {
            volumes: vec![volume("/mnt/a", 1000, 500)],
            files: vec![file("/mnt/ghost", "f", 10)],
        };
        assert!(matches!(
            plan_moves(&world, &PlanOptions::default()),
            Err(PlanError::InvalidInput(_))
        ));

        let world = WorldView {
            volumes: vec![volume("/mnt/a", 1000, 500)],
            files: vec![],
        };
        let opts = PlanOptions {
            source_volumes: vec!["/mnt/missing".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            plan_moves(&world, &opts),
            Err(PlanError::InvalidInput(_))
        ));

        let opts = PlanOptions {
            folder_threshold: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            plan_moves(&world, &opts),
            Err(PlanError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_audit_reflects_post_mutation_state() {
        let world = WorldView {
            volumes: vec![volume("/mnt/a", 1000, 500), volume("/mnt/src", 1000, 0)],
            files: vec![file("/mnt/src", "m/f", 200)],
        };
        let outcome = plan_moves(&world, &options(0)).unwrap();

        assert_eq!(outcome.audit.len(), 1);
        let snap = &outcome.audit[0];
        assert_eq!(snap.step, 1);
        assert_eq!(snap.action, ACTION_FOLDER_PLACED);
        let a = snap
            .world_view
            .disks
            .iter()
            .find(|d| d.path == "/mnt/a")
            .unwrap();
        assert_eq!(a.free_bytes, 300);
        assert!(snap.world_view.files.is_empty());
    }
}
