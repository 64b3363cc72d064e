//! Byte-size parsing and formatting (base-1024 throughout).

use crate::errors::{PlanError, PlanResult};

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;
pub const GIB: u64 = 1024 * MIB;
pub const TIB: u64 = 1024 * GIB;

/// Parse a human-readable size: an integer with an optional `B`, `KB`, `MB`,
/// `GB`, or `TB` suffix (case-insensitive, base-1024). `"512MB"`, `"1 GB"`,
/// and `"1048576"` are all valid.
pub fn parse_size(input: &str) -> PlanResult<u64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(PlanError::InvalidSize("empty size".to_string()));
    }

    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, suffix) = trimmed.split_at(digits_end);
    if digits.is_empty() {
        return Err(PlanError::InvalidSize(trimmed.to_string()));
    }

    let value: u64 = digits
        .parse()
        .map_err(|_| PlanError::InvalidSize(trimmed.to_string()))?;

    let multiplier = match suffix.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "KB" => KIB,
        "MB" => MIB,
        "GB" => GIB,
        "TB" => TIB,
        _ => return Err(PlanError::InvalidSize(trimmed.to_string())),
    };

    value
        .checked_mul(multiplier)
        .ok_or_else(|| PlanError::InvalidSize(trimmed.to_string()))
}

/// Format a byte count with the largest unit that keeps the value at or
/// above one, trimming trailing zeros: `"350 B"`, `"1.5 GB"`, `"250 KB"`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [(u64, &str); 4] = [(TIB, "TB"), (GIB, "GB"), (MIB, "MB"), (KIB, "KB")];
    for (unit, label) in UNITS {
        if bytes >= unit {
            let value = bytes as f64 / unit as f64;
            let rendered = format!("{:.2}", value);
            let rendered = rendered.trim_end_matches('0').trim_end_matches('.');
            return format!("{} {}", rendered, label);
        }
    }
    format!("{} B", bytes)
}

/// Utilization ratio in `[0, 1]`; zero-capacity volumes count as empty.
pub fn used_ratio(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 / total as f64
    }
}
