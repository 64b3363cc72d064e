//! Plan materialization and the persisted transfer script.
//!
//! The persisted artifact is a plain bash script, not a structured plan
//! binary: one batched copy per destination, each launched in the background
//! behind a job throttle, joined by a single barrier. Re-running a script
//! against a partially applied state is safe because every batch uses
//! copy-then-remove semantics that are idempotent at the destination.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::errors::{PlanError, PlanResult};
use crate::model::{FileMove, Plan, PlanSummary};
use crate::units;

pub const REASON_SOURCE_MISSING: &str = "source file no longer exists";

/// Environment knobs the script reads at run time, so `apply` can override
/// without rewriting the file.
pub const ENV_CONCURRENCY: &str = "PACKDOWN_CONCURRENCY";
pub const ENV_PROGRESS_LOG: &str = "PACKDOWN_LOG";

const DEFAULT_PROGRESS_LOG: &str = "/tmp/packdown-progress.log";

/// Finalize the accumulated moves into a `Plan` with summary statistics over
/// the pending subset.
pub fn materialize(moves: Vec<FileMove>) -> Plan {
    let mut summary = PlanSummary::default();
    for m in moves.iter().filter(|m| m.is_pending()) {
        let target = m.target_volume.clone().unwrap_or_default();
        summary.total_files += 1;
        summary.total_bytes = summary.total_bytes.saturating_add(m.file.size_bytes);
        *summary.moves_by_target.entry(target.clone()).or_default() += 1;
        *summary.bytes_by_target.entry(target).or_default() += m.file.size_bytes;
    }
    Plan { moves, summary }
}

/// Demote pending moves whose source no longer exists (the scanner snapshot
/// can race against reality). Returns the number of moves demoted.
pub fn mark_missing_sources<F>(moves: &mut [FileMove], exists: F) -> usize
where
    F: Fn(&str) -> bool,
{
    let mut demoted = 0;
    for m in moves.iter_mut() {
        if m.is_pending() && !exists(&m.file.absolute_path) {
            m.skip(REASON_SOURCE_MISSING);
            demoted += 1;
        }
    }
    demoted
}

/// One batched copy: every pending file moving from one source volume to one
/// destination volume, in placement order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetBatch {
    pub target_volume: String,
    pub source_volume: String,
    pub relative_paths: Vec<String>,
    pub total_bytes: u64,
}

/// Group pending moves by destination (first-seen order), then by source
/// volume within each destination, preserving placement order throughout.
pub fn batches(plan: &Plan) -> Vec<TargetBatch> {
    let mut out: Vec<TargetBatch> = Vec::new();
    for m in plan.moves.iter().filter(|m| m.is_pending()) {
        let target = m.target_volume.as_deref().unwrap_or_default();
        let source = m.file.source_volume.as_str();
        let idx = out
            .iter()
            .position(|b| b.target_volume == target && b.source_volume == source)
            .unwrap_or_else(|| {
                out.push(TargetBatch {
                    target_volume: target.to_string(),
                    source_volume: source.to_string(),
                    relative_paths: Vec::new(),
                    total_bytes: 0,
                });
                out.len() - 1
            });
        let batch = &mut out[idx];
        batch.relative_paths.push(m.file.relative_path.clone());
        batch.total_bytes = batch.total_bytes.saturating_add(m.file.size_bytes);
    }

    // Stable regroup: all batches for a destination stay adjacent, ordered by
    // that destination's first appearance.
    let target_order: Vec<String> = {
        let mut seen = BTreeSet::new();
        out.iter()
            .filter(|b| seen.insert(b.target_volume.clone()))
            .map(|b| b.target_volume.clone())
            .collect()
    };
    let mut grouped = Vec::with_capacity(out.len());
    for target in target_order {
        grouped.extend(out.iter().filter(|b| b.target_volume == target).cloned());
    }
    grouped
}

/// Source volumes of pending moves in first-appearance order.
fn pending_sources(plan: &Plan) -> Vec<String> {
    let mut seen = BTreeSet::new();
    plan.moves
        .iter()
        .filter(|m| m.is_pending())
        .filter(|m| seen.insert(m.file.source_volume.clone()))
        .map(|m| m.file.source_volume.clone())
        .collect()
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Render the transfer script. `generated_on` is a `YYYY-MM-DD` date string;
/// `concurrency` is the number of simultaneous batches recorded as the
/// default.
pub fn render_script(plan: &Plan, generated_on: &str, concurrency: usize) -> String {
    let mut out = String::new();
    out.push_str("#!/usr/bin/env bash\n");
    out.push_str("set -euo pipefail\n\n");
    out.push_str("# packdown transfer script\n");
    out.push_str(&format!("# Generated: {}\n", generated_on));
    let sources = pending_sources(plan);
    out.push_str(&format!(
        "# Sources: {}\n",
        if sources.is_empty() {
            "(none)".to_string()
        } else {
            sources.join(", ")
        }
    ));
    out.push_str(&format!("# Pending moves: {}\n", plan.summary.total_files));
    out.push_str(&format!(
        "# Total bytes: {} ({})\n",
        plan.summary.total_bytes,
        units::format_size(plan.summary.total_bytes)
    ));
    out.push_str(&format!("# Concurrency: {}\n\n", concurrency));

    if plan.summary.total_files == 0 {
        out.push_str("# Nothing to transfer.\n");
        out.push_str("exit 0\n");
        return out;
    }

    out.push_str(&format!(
        "PROGRESS_LOG=\"${{{}:-{}}}\"\n",
        ENV_PROGRESS_LOG, DEFAULT_PROGRESS_LOG
    ));
    out.push_str(&format!(
        "MAX_JOBS=\"${{{}:-{}}}\"\n\n",
        ENV_CONCURRENCY, concurrency
    ));
    out.push_str("throttle() {\n");
    out.push_str("    while [ \"$(jobs -rp | wc -l)\" -ge \"$MAX_JOBS\" ]; do\n");
    out.push_str("        wait -n\n");
    out.push_str("    done\n");
    out.push_str("}\n");

    for batch in batches(plan) {
        let src_root = shell_quote(&format!("{}/", batch.source_volume));
        let dest_root = shell_quote(&format!("{}/", batch.target_volume));
        out.push('\n');
        out.push_str("throttle\n");
        out.push_str("(\n");
        out.push_str(&format!(
            "    rsync --archive --remove-source-files --files-from=- {} {} <<'FILES'\n",
            src_root, dest_root
        ));
        for rel in &batch.relative_paths {
            out.push_str(rel);
            out.push('\n');
        }
        out.push_str("FILES\n");
        out.push_str(&format!(
            "    echo \"{} <- {} done ({} files, {})\" >>\"$PROGRESS_LOG\"\n",
            batch.target_volume,
            batch.source_volume,
            batch.relative_paths.len(),
            units::format_size(batch.total_bytes)
        ));
        out.push_str(") &\n");
    }

    out.push_str("\nwait\n");
    out.push_str("echo \"all transfers complete\" >>\"$PROGRESS_LOG\"\n");
    out
}

/// Metadata recovered from a persisted script's comment block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptMetadata {
    pub generated: String,
    pub sources: Vec<String>,
    pub pending_moves: usize,
    pub total_bytes: u64,
    pub concurrency: usize,
}

/// Re-parse the metadata comment block of a persisted script.
pub fn parse_script_metadata(script: &str) -> PlanResult<ScriptMetadata> {
    let mut generated = None;
    let mut sources = None;
    let mut pending_moves = None;
    let mut total_bytes = None;
    let mut concurrency = None;

    for line in script.lines() {
        let Some(rest) = line.strip_prefix("# ") else {
            continue;
        };
        if let Some(value) = rest.strip_prefix("Generated: ") {
            generated = Some(value.trim().to_string());
        } else if let Some(value) = rest.strip_prefix("Sources: ") {
            let value = value.trim();
            sources = Some(if value == "(none)" {
                Vec::new()
            } else {
                value.split(", ").map(str::to_string).collect()
            });
        } else if let Some(value) = rest.strip_prefix("Pending moves: ") {
            pending_moves = value.trim().parse().ok();
        } else if let Some(value) = rest.strip_prefix("Total bytes: ") {
            let digits = value.split_whitespace().next().unwrap_or_default();
            total_bytes = digits.parse().ok();
        } else if let Some(value) = rest.strip_prefix("Concurrency: ") {
            concurrency = value.trim().parse().ok();
        }
    }

    match (generated, sources, pending_moves, total_bytes, concurrency) {
        (Some(generated), Some(sources), Some(pending_moves), Some(total_bytes), Some(concurrency)) => {
            Ok(ScriptMetadata {
                generated,
                sources,
                pending_moves,
                total_bytes,
                concurrency,
            })
        }
        _ => Err(PlanError::InvalidInput(
            "script is missing its metadata block".to_string(),
        )),
    }
}

/// Persist the script atomically: write a sibling temp file, then rename.
pub fn write_script(path: &Path, contents: &str) -> PlanResult<()> {
    let persist_err = |source: std::io::Error| PlanError::Persistence {
        path: path.display().to_string(),
        source,
    };

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents).map_err(persist_err)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp, fs::Permissions::from_mode(0o755)).map_err(persist_err)?;
    }
    fs::rename(&tmp, path).map_err(persist_err)
}
