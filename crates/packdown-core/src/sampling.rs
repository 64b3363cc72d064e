//! Size bucketing and representative sampling.
//!
//! The combination scorer enumerates k-subsets, so the population it works on
//! has to stay small. Files are partitioned into fixed logarithmic buckets
//! and each non-empty bucket contributes its smallest, median, and largest
//! member, bounding the representative set to three entries per bucket.

use crate::model::FileRecord;
use crate::units::{KIB, MIB};

/// Upper bounds of the size buckets; the last bucket is unbounded.
const BUCKET_BOUNDS: [u64; 4] = [100 * KIB, MIB, 10 * MIB, 100 * MIB];

fn bucket_index(size: u64) -> usize {
    BUCKET_BOUNDS
        .iter()
        .position(|&bound| size < bound)
        .unwrap_or(BUCKET_BOUNDS.len())
}

/// Partition `files` into size buckets, dropping empty ones. Each bucket is
/// sorted ascending by size (path as tie-break).
pub fn bucketize(files: &[FileRecord]) -> Vec<Vec<FileRecord>> {
    let mut buckets: Vec<Vec<FileRecord>> = vec![Vec::new(); BUCKET_BOUNDS.len() + 1];
    for f in files {
        buckets[bucket_index(f.size_bytes)].push(f.clone());
    }
    for bucket in &mut buckets {
        bucket.sort_by(|a, b| {
            a.size_bytes
                .cmp(&b.size_bytes)
                .then_with(|| a.absolute_path.cmp(&b.absolute_path))
        });
    }
    buckets.retain(|b| !b.is_empty());
    buckets
}

/// Draw the bounded representative set: smallest, median, and largest per
/// non-empty bucket, deduplicated by absolute path in first-seen order.
pub fn representatives(files: &[FileRecord]) -> Vec<FileRecord> {
    let mut sample = Vec::new();
    for bucket in bucketize(files) {
        let median = bucket.len() / 2;
        for idx in [0, median, bucket.len() - 1] {
            let candidate = &bucket[idx];
            if !sample
                .iter()
                .any(|s: &FileRecord| s.absolute_path == candidate.absolute_path)
            {
                sample.push(candidate.clone());
            }
        }
    }
    sample
}
