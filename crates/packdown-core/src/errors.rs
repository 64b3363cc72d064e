//! Planner error taxonomy.
//!
//! Input-shape problems (bad sizes, bad globs, inconsistent snapshots) and
//! persistence failures are surfaced to the caller; per-file capacity
//! shortfalls are never errors, they become skipped moves inside the plan.

use std::io;

/// Errors surfaced by the planner and the plan persistence layer.
#[derive(Debug)]
pub enum PlanError {
    /// A human-readable byte size could not be parsed.
    InvalidSize(String),
    /// A filter option was malformed (bad glob pattern).
    InvalidFilter(String),
    /// The input snapshot or options were inconsistent.
    InvalidInput(String),
    /// The plan script could not be written.
    Persistence { path: String, source: io::Error },
}

impl std::fmt::Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanError::InvalidSize(detail) => write!(f, "invalid size: {}", detail),
            PlanError::InvalidFilter(detail) => write!(f, "invalid filter: {}", detail),
            PlanError::InvalidInput(detail) => write!(f, "invalid input: {}", detail),
            PlanError::Persistence { path, source } => {
                write!(f, "cannot persist plan to {}: {}", path, source)
            }
        }
    }
}

impl std::error::Error for PlanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlanError::Persistence { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type for planner operations.
pub type PlanResult<T> = std::result::Result<T, PlanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_category() {
        let err = PlanError::InvalidSize("10XB".to_string());
        assert_eq!(err.to_string(), "invalid size: 10XB");

        let err = PlanError::InvalidInput("no volumes".to_string());
        assert!(err.to_string().starts_with("invalid input:"));
    }

    #[test]
    fn test_persistence_keeps_source() {
        use std::error::Error;
        let err = PlanError::Persistence {
            path: "/tmp/plan.sh".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.source().is_some());
    }
}
