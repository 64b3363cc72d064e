//! Filesystem inventory scanner.
//!
//! Discovery is two-step per volume: enumerate the directory tree, then stat
//! every entry. Volumes are walked in parallel, one thread each, fanning
//! results back over a channel; within a volume the stat step runs on a
//! bounded rayon pool. Entries that vanish or turn unreadable between the
//! two steps are logged and dropped rather than failing the scan.

use std::path::{Path, PathBuf};

use eyre::{bail, Result, WrapErr};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::model::FileRecord;

/// Scanner tuning.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Bound on per-volume stat parallelism.
    pub stat_workers: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            stat_workers: num_cpus::get().max(1),
        }
    }
}

/// Walk every volume and produce its file inventory. Output is sorted by
/// absolute path so identical trees always yield an identical snapshot.
pub fn scan_volumes(volumes: &[PathBuf], options: &ScanOptions) -> Result<Vec<FileRecord>> {
    for volume in volumes {
        if !volume.is_dir() {
            bail!("volume root is not a directory: {}", volume.display());
        }
    }

    let mut records: Vec<FileRecord> = Vec::new();
    std::thread::scope(|scope| -> Result<()> {
        let (tx, rx) = crossbeam_channel::unbounded::<Result<Vec<FileRecord>>>();
        for volume in volumes {
            let tx = tx.clone();
            scope.spawn(move || {
                let result = scan_one_volume(volume, options.stat_workers);
                let _ = tx.send(result);
            });
        }
        drop(tx);

        for result in rx {
            records.extend(result?);
        }
        Ok(())
    })?;

    records.sort_by(|a, b| a.absolute_path.cmp(&b.absolute_path));
    Ok(records)
}

fn scan_one_volume(volume: &Path, stat_workers: usize) -> Result<Vec<FileRecord>> {
    // Step 1: enumerate. Unreadable subtrees below the root are skipped.
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(volume).follow_links(false) {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                if err.depth() == 0 {
                    return Err(err.into());
                }
                log::warn!("skipping unreadable entry under {}: {}", volume.display(), err);
                continue;
            }
        };
        if entry.file_type().is_file() {
            paths.push(entry.into_path());
        }
    }

    // Step 2: stat, bounded.
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(stat_workers)
        .build()
        .wrap_err("building stat pool")?;
    let records: Vec<FileRecord> = pool.install(|| {
        paths
            .par_iter()
            .filter_map(|path| match path.metadata() {
                Ok(metadata) => Some(FileRecord {
                    absolute_path: path.display().to_string(),
                    relative_path: relative_to(volume, path),
                    size_bytes: metadata.len(),
                    source_volume: volume.display().to_string(),
                }),
                Err(err) => {
                    log::warn!("cannot stat {}: {}", path.display(), err);
                    None
                }
            })
            .collect()
    });

    Ok(records)
}

fn relative_to(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
