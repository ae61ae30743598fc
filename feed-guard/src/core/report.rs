//! Validation report types.

use serde::{Deserialize, Serialize};

use super::{ValidationMode, Violation};

/// How a validation call left the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ValidationOutcome {
    /// No violation was found.
    Consistent,
    /// Offending rows were deleted until the store became consistent.
    Repaired {
        /// Sweeps that scheduled deletions
        passes: usize,
        rows_deleted: usize,
    },
    /// Violations were reported and the offending rows kept.
    Retained,
}

/// The result of a validation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub mode: ValidationMode,
    pub outcome: ValidationOutcome,
    /// Violations found by the first pass only
    pub violations: Vec<Violation>,
    /// Total sweeps over the edge set, the final clean sweep included
    pub passes: usize,
    pub rows_deleted: usize,
    /// When validation started (ISO 8601 format)
    pub timestamp: String,
}

impl ValidationReport {
    pub fn new(mode: ValidationMode) -> Self {
        Self {
            mode,
            outcome: ValidationOutcome::Consistent,
            violations: Vec::new(),
            passes: 0,
            rows_deleted: 0,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Whether the first pass found nothing.
    pub fn is_consistent(&self) -> bool {
        matches!(self.outcome, ValidationOutcome::Consistent)
    }

    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Violations recorded against `entity`.
    pub fn violations_for<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.violations.iter().filter(move |v| v.entity == entity)
    }

    /// Violation messages in the order they were found.
    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }
}
