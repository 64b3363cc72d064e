//! Inventory filtering.
//!
//! Filters are applied in a fixed order: minimum size, path prefix, include
//! globs, exclude globs. The stage is a pure subset of its input with order
//! preserved.

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::errors::{PlanError, PlanResult};
use crate::model::FileRecord;

/// Recognized filter options. All fields default to "accept everything".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    /// Files strictly smaller than this are excluded.
    pub min_size_bytes: u64,
    /// A file is kept iff some prefix matches its volume-relative path or its
    /// raw absolute path. Empty means accept all.
    pub path_prefixes: Vec<String>,
    /// Glob patterns; a file must match at least one when any are supplied.
    pub include_patterns: Vec<String>,
    /// Glob patterns; a file matching any is dropped.
    pub exclude_patterns: Vec<String>,
}

impl FilterCriteria {
    /// Compile the glob patterns. Malformed patterns surface as
    /// `InvalidFilter`.
    pub fn compile(&self) -> PlanResult<CompiledFilter> {
        Ok(CompiledFilter {
            criteria: self.clone(),
            includes: compile_globs(&self.include_patterns)?,
            excludes: compile_globs(&self.exclude_patterns)?,
        })
    }
}

fn compile_globs(patterns: &[String]) -> PlanResult<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|err| PlanError::InvalidFilter(format!("{}: {}", pattern, err)))?;
        builder.add(glob);
    }
    let set = builder
        .build()
        .map_err(|err| PlanError::InvalidFilter(err.to_string()))?;
    Ok(Some(set))
}

/// A `FilterCriteria` with its glob sets compiled once up front.
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    criteria: FilterCriteria,
    includes: Option<GlobSet>,
    excludes: Option<GlobSet>,
}

impl CompiledFilter {
    /// Apply all filters in order, returning the surviving subset.
    pub fn apply(&self, files: &[FileRecord]) -> Vec<FileRecord> {
        files
            .iter()
            .filter(|f| self.accepts(f))
            .cloned()
            .collect()
    }

    pub fn accepts(&self, file: &FileRecord) -> bool {
        if file.size_bytes < self.criteria.min_size_bytes {
            return false;
        }
        if !self.matches_prefix(file) {
            return false;
        }
        if let Some(includes) = &self.includes {
            if !includes.is_match(&file.relative_path) {
                return false;
            }
        }
        if let Some(excludes) = &self.excludes {
            if excludes.is_match(&file.relative_path) {
                return false;
            }
        }
        true
    }

    /// Two-way prefix match: tools in this ecosystem mix volume-relative
    /// prefixes (`/Movies`) and absolute ones (`/mnt/disk1/Movies`), so an
    /// entry matches if either branch matches.
    fn matches_prefix(&self, file: &FileRecord) -> bool {
        if self.criteria.path_prefixes.is_empty() {
            return true;
        }
        let rooted = format!("/{}", file.relative_path.trim_start_matches('/'));
        self.criteria
            .path_prefixes
            .iter()
            .any(|p| rooted.starts_with(p.as_str()) || file.absolute_path.starts_with(p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::file;

    fn apply(criteria: FilterCriteria, files: &[FileRecord]) -> Vec<String> {
        criteria
            .compile()
            .unwrap()
            .apply(files)
            .into_iter()
            .map(|f| f.relative_path)
            .collect()
    }

    #[test]
    fn test_default_accepts_everything_in_order() {
        let files = vec![
            file("/mnt/disk1", "b.mkv", 10),
            file("/mnt/disk1", "a.mkv", 20),
        ];
        assert_eq!(apply(FilterCriteria::default(), &files), ["b.mkv", "a.mkv"]);
    }

    #[test]
    fn test_min_size_is_strict() {
        let files = vec![
            file("/mnt/disk1", "small", 99),
            file("/mnt/disk1", "exact", 100),
            file("/mnt/disk1", "big", 101),
        ];
        let criteria = FilterCriteria {
            min_size_bytes: 100,
            ..Default::default()
        };
        assert_eq!(apply(criteria, &files), ["exact", "big"]);
    }

    #[test]
    fn test_prefix_matches_volume_relative_or_absolute() {
        let files = vec![
            file("/mnt/disk1", "Movies/a.mkv", 10),
            file("/mnt/disk1", "Photos/p.jpg", 10),
            file("/mnt/disk2", "Music/m.flac", 10),
        ];

        let relative = FilterCriteria {
            path_prefixes: vec!["/Movies".to_string()],
            ..Default::default()
        };
        assert_eq!(apply(relative, &files), ["Movies/a.mkv"]);

        let absolute = FilterCriteria {
            path_prefixes: vec!["/mnt/disk2/Music".to_string()],
            ..Default::default()
        };
        assert_eq!(apply(absolute, &files), ["Music/m.flac"]);
    }

    #[test]
    fn test_include_then_exclude() {
        let files = vec![
            file("/mnt/disk1", "Movies/a.mkv", 10),
            file("/mnt/disk1", "Movies/a.srt", 10),
            file("/mnt/disk1", "Movies/sample.mkv", 10),
        ];
        let criteria = FilterCriteria {
            include_patterns: vec!["*.mkv".to_string()],
            exclude_patterns: vec!["*sample*".to_string()],
            ..Default::default()
        };
        assert_eq!(apply(criteria, &files), ["Movies/a.mkv"]);
    }

    #[test]
    fn test_bad_glob_is_invalid_filter() {
        let criteria = FilterCriteria {
            include_patterns: vec!["[".to_string()],
            ..Default::default()
        };
        match criteria.compile() {
            Err(PlanError::InvalidFilter(_)) => {}
            other => panic!("expected InvalidFilter, got {:?}", other.map(|_| ())),
        }
    }
}
