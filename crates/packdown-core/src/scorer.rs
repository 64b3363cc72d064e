//! Candidate scoring for gap filling.
//!
//! Given a source file list and a target's available capacity, find the
//! placement that utilizes that capacity best: either one file, or a small
//! bundle drawn from the representative sample. Enumeration is bounded to
//! subsets of at most `max_combination` representatives.

use crate::model::{FileRecord, ScoredCandidate};
use crate::sampling;

/// Default bound on combination size.
pub const DEFAULT_MAX_COMBINATION: usize = 4;

fn candidate(files: Vec<FileRecord>, available: u64, target: &str) -> ScoredCandidate {
    let total_bytes: u64 = files.iter().map(|f| f.size_bytes).sum();
    ScoredCandidate {
        files,
        total_bytes,
        target_volume: target.to_string(),
        wasted_space: available - total_bytes,
        score: total_bytes as f64 / available as f64,
    }
}

/// Deterministic preference between two candidates for the same target:
/// higher utilization, then fewer files, then less waste, then the
/// lexicographically smaller path tuple.
fn better(a: &ScoredCandidate, b: &ScoredCandidate) -> bool {
    if a.total_bytes != b.total_bytes {
        return a.total_bytes > b.total_bytes;
    }
    if a.files.len() != b.files.len() {
        return a.files.len() < b.files.len();
    }
    if a.wasted_space != b.wasted_space {
        return a.wasted_space < b.wasted_space;
    }
    path_tuple(a) < path_tuple(b)
}

fn path_tuple(c: &ScoredCandidate) -> Vec<&str> {
    c.files.iter().map(|f| f.absolute_path.as_str()).collect()
}

/// The single file that fills `available` best, if any fits at all.
pub fn best_single(
    files: &[FileRecord],
    available: u64,
    target: &str,
) -> Option<ScoredCandidate> {
    if available == 0 {
        return None;
    }
    files
        .iter()
        .filter(|f| f.size_bytes <= available)
        .max_by(|a, b| {
            a.size_bytes
                .cmp(&b.size_bytes)
                .then_with(|| b.absolute_path.cmp(&a.absolute_path))
        })
        .map(|f| candidate(vec![f.clone()], available, target))
}

/// The best-scoring placement for `target` across the single-file candidate
/// and every k-subset (2..=max_combination) of the representative sample.
/// Returns `None` when nothing fits.
pub fn best_candidate(
    files: &[FileRecord],
    available: u64,
    target: &str,
    max_combination: usize,
) -> Option<ScoredCandidate> {
    if available == 0 {
        return None;
    }
    let eligible: Vec<FileRecord> = files
        .iter()
        .filter(|f| f.size_bytes <= available)
        .cloned()
        .collect();
    if eligible.is_empty() {
        return None;
    }

    let mut best = best_single(&eligible, available, target);

    let sample = sampling::representatives(&eligible);
    let k_max = max_combination.min(sample.len());
    for k in 2..=k_max {
        for combo in Combinations::new(sample.len(), k) {
            let total: u64 = combo.iter().map(|&i| sample[i].size_bytes).sum();
            if total > available {
                continue;
            }
            let files: Vec<FileRecord> = combo.iter().map(|&i| sample[i].clone()).collect();
            let next = candidate(files, available, target);
            match &best {
                Some(current) if !better(&next, current) => {}
                _ => best = Some(next),
            }
        }
    }

    best
}

/// Lexicographic k-subset index enumerator.
struct Combinations {
    n: usize,
    k: usize,
    indices: Vec<usize>,
    done: bool,
}

impl Combinations {
    fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            k,
            indices: (0..k).collect(),
            done: k == 0 || k > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.done {
            return None;
        }
        let current = self.indices.clone();

        // Advance the rightmost index that still has room.
        let mut i = self.k;
        loop {
            if i == 0 {
                self.done = true;
                break;
            }
            i -= 1;
            if self.indices[i] != i + self.n - self.k {
                self.indices[i] += 1;
                for j in i + 1..self.k {
                    self.indices[j] = self.indices[j - 1] + 1;
                }
                break;
            }
        }

        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::file;

    #[test]
    fn test_combinations_are_lexicographic() {
        let combos: Vec<Vec<usize>> = Combinations::new(4, 2).collect();
        assert_eq!(
            combos,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3]
            ]
        );
        assert_eq!(Combinations::new(3, 3).count(), 1);
        assert_eq!(Combinations::new(2, 3).count(), 0);
    }

    #[test]
    fn test_best_single_maximizes_utilization() {
        let files = vec![
            file("/v", "a", 80),
            file("/v", "b", 120),
            file("/v", "c", 95),
        ];
        let best = best_single(&files, 100, "/t").unwrap();
        assert_eq!(best.files[0].relative_path, "c");
        assert_eq!(best.wasted_space, 5);
        assert!((best.score - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_best_single_none_when_nothing_fits() {
        let files = vec![file("/v", "a", 500)];
        assert!(best_single(&files, 100, "/t").is_none());
        assert!(best_single(&files, 0, "/t").is_none());
    }

    #[test]
    fn test_combination_beats_single() {
        // 60+35 = 95 utilizes better than any single file.
        let files = vec![
            file("/v", "a", 60),
            file("/v", "b", 35),
            file("/v", "c", 10),
        ];
        let best = best_candidate(&files, 100, "/t", 4).unwrap();
        assert_eq!(best.total_bytes, 95);
        assert_eq!(best.files.len(), 2);
    }

    #[test]
    fn test_single_wins_ties_on_fewer_files() {
        // A lone 100 and a 60+40 pair both fill the gap exactly.
        let files = vec![
            file("/v", "pair1", 60),
            file("/v", "pair2", 40),
            file("/v", "lone", 100),
        ];
        let best = best_candidate(&files, 100, "/t", 4).unwrap();
        assert_eq!(best.files.len(), 1);
        assert_eq!(best.files[0].relative_path, "lone");
    }

    #[test]
    fn test_no_candidate_when_all_too_big() {
        let files = vec![file("/v", "a", 500), file("/v", "b", 700)];
        assert!(best_candidate(&files, 100, "/t", 4).is_none());
    }

    #[test]
    fn test_deterministic_across_runs() {
        let files: Vec<_> = (0..30)
            .map(|i| file("/v", &format!("f{:02}", i), 10 + (i * 7) % 90))
            .collect();
        let a = best_candidate(&files, 150, "/t", 4).unwrap();
        let b = best_candidate(&files, 150, "/t", 4).unwrap();
        let paths = |c: &crate::model::ScoredCandidate| {
            c.files
                .iter()
                .map(|f| f.absolute_path.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(paths(&a), paths(&b));
    }
}
