//! Core types for declarative resource management

use serde::{Deserialize, Serialize};
use std::fmt;

/// Current or desired state of a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceState {
    /// Resource exists/is configured
    Present { details: Option<String> },
    /// Resource does not exist/is not configured
    Absent,
    /// State cannot be determined
    Unknown { error: String },
}

impl ResourceState {
    /// Check if state represents presence
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present { .. })
    }

    /// Check if state represents absence
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Check if the state could not be read
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown { .. })
    }
}

/// Result of applying a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ApplyResult {
    /// Already in the desired state
    NoChange,
    /// Resource was created
    Created,
    /// Apply failed
    Failed { error: String },
    /// Apply was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Created)
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.created + self.skipped + self.failed + self.no_change
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ExecuteSummary) {
        self.created += other.created;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.no_change += other.no_change;
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Options for execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
}

/// What happened to one resource during execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceOutcome {
    pub resource_id: String,
    pub resource_type: String,
    /// Display name, as returned by `Resource::name`
    pub name: String,
    pub description: String,
    pub result: ApplyResult,
}

/// Per-resource outcomes of a run, in execution order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteReport {
    pub outcomes: Vec<ResourceOutcome>,
    pub summary: ExecuteSummary,
}

impl ExecuteReport {
    /// Record an outcome and fold it into the summary
    pub fn push(&mut self, outcome: ResourceOutcome) {
        self.summary.add_result(&outcome.result);
        self.outcomes.push(outcome);
    }

    /// Find the outcome for a resource id
    pub fn outcome(&self, resource_id: &str) -> Option<&ResourceOutcome> {
        self.outcomes.iter().find(|o| o.resource_id == resource_id)
    }

    /// Outcomes that failed
    pub fn failures(&self) -> impl Iterator<Item = &ResourceOutcome> {
        self.outcomes.iter().filter(|o| !o.result.is_success())
    }
}

/// A run stopped by a fatal error
///
/// Holds the outcomes recorded before the abort, so callers can still
/// report what was changed. The fatal error is the source.
#[derive(Debug)]
pub struct Aborted {
    pub report: ExecuteReport,
    pub cause: anyhow::Error,
}

impl fmt::Display for Aborted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run aborted after {} resources", self.report.outcomes.len())
    }
}

impl std::error::Error for Aborted {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let cause: &(dyn std::error::Error + 'static) = self.cause.as_ref();
        Some(cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_results() {
        let mut summary = ExecuteSummary::default();
        summary.add_result(&ApplyResult::Created);
        summary.add_result(&ApplyResult::NoChange);
        summary.add_result(&ApplyResult::Failed {
            error: "boom".into(),
        });
        summary.add_result(&ApplyResult::Skipped {
            reason: "dry run".into(),
        });

        assert_eq!(summary.total(), 4);
        assert_eq!(summary.total_changes(), 1);
        assert!(!summary.is_success());
    }

    #[test]
    fn test_summary_merge() {
        let mut a = ExecuteSummary {
            created: 1,
            ..Default::default()
        };
        let b = ExecuteSummary {
            created: 2,
            failed: 1,
            ..Default::default()
        };
        a.merge(&b);
        assert_eq!(a.created, 3);
        assert_eq!(a.failed, 1);
    }

    #[test]
    fn test_report_failures() {
        let mut report = ExecuteReport::default();
        report.push(ResourceOutcome {
            resource_id: "a".into(),
            resource_type: "test".into(),
            name: "a".into(),
            description: "A".into(),
            result: ApplyResult::Created,
        });
        report.push(ResourceOutcome {
            resource_id: "b".into(),
            resource_type: "test".into(),
            name: "b".into(),
            description: "B".into(),
            result: ApplyResult::Failed {
                error: "nope".into(),
            },
        });

        let failed: Vec<_> = report.failures().map(|o| o.resource_id.as_str()).collect();
        assert_eq!(failed, vec!["b"]);
        assert_eq!(report.summary.created, 1);
        assert!(report.outcome("a").is_some());
    }
}
