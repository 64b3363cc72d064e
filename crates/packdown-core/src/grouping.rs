//! Folder grouping.
//!
//! Files are partitioned by the immediate parent of their volume-relative
//! path. Small folders and folders dominated by a single file are flagged
//! `keep_together`: relocating them whole is cheap, and a dominated folder is
//! de-facto a single item.

use std::collections::BTreeMap;

use crate::model::{FileRecord, FolderGroup};

/// Substring of `relative_path` before the final `/`, or the empty string for
/// root files.
pub fn immediate_parent(relative_path: &str) -> &str {
    match relative_path.rfind('/') {
        Some(idx) => &relative_path[..idx],
        None => "",
    }
}

/// First path segment of `relative_path` (the whole path if undivided).
pub fn top_level(relative_path: &str) -> &str {
    match relative_path.find('/') {
        Some(idx) => &relative_path[..idx],
        None => relative_path,
    }
}

/// Partition `files` by immediate parent and classify each group as atomic or
/// splittable. Groups come back ordered by folder path.
pub fn group_by_parent(
    files: &[FileRecord],
    min_split_size: u64,
    folder_threshold: f64,
) -> Vec<FolderGroup> {
    build_groups(files, |f| immediate_parent(&f.relative_path))
        .into_iter()
        .map(|mut g| {
            g.keep_together =
                keep_together(g.total_bytes, g.largest_file_bytes, min_split_size, folder_threshold);
            g
        })
        .collect()
}

/// Coarse grouping by top-level folder. Always keep-together; used only for
/// diagnostic views, never by the packer.
pub fn group_by_top_level(files: &[FileRecord]) -> Vec<FolderGroup> {
    build_groups(files, |f| top_level(&f.relative_path))
        .into_iter()
        .map(|mut g| {
            g.keep_together = true;
            g
        })
        .collect()
}

fn build_groups<'a, F>(files: &'a [FileRecord], key: F) -> Vec<FolderGroup>
where
    F: Fn(&'a FileRecord) -> &'a str,
{
    let mut buckets: BTreeMap<&str, Vec<FileRecord>> = BTreeMap::new();
    for f in files {
        buckets.entry(key(f)).or_default().push(f.clone());
    }

    buckets
        .into_iter()
        .map(|(folder, members)| {
            let total_bytes = members.iter().map(|f| f.size_bytes).sum();
            let largest_file_bytes = members.iter().map(|f| f.size_bytes).max().unwrap_or(0);
            FolderGroup {
                folder_path: folder.to_string(),
                files: members,
                total_bytes,
                largest_file_bytes,
                keep_together: false,
            }
        })
        .collect()
}

/// A folder stays together when it is small, or when one file dominates it.
/// A zero threshold disables the dominance rule entirely.
fn keep_together(total: u64, largest: u64, min_split_size: u64, folder_threshold: f64) -> bool {
    if total < min_split_size {
        return true;
    }
    if folder_threshold <= 0.0 {
        return false;
    }
    if total == 0 {
        return true;
    }
    largest as f64 / total as f64 >= folder_threshold
}
