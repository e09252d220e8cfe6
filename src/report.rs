//! Run report - per-entity outcomes, printed and optionally saved as JSON

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use declarative::{ApplyResult, ExecuteReport, ExecuteSummary, ResourceOutcome};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::ui;

/// Resource types in report order
const TYPE_ORDER: [&str; 4] = ["ou", "group", "user", "membership"];

/// Outcome of one adsync run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    /// Directory host the run was against
    pub target: String,
    pub base_dn: String,
    pub dry_run: bool,
    pub summary: ExecuteSummary,
    pub outcomes: Vec<ResourceOutcome>,
    /// Why the run stopped early; outcomes after that point are missing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

impl RunReport {
    pub fn new(target: &str, base_dn: &str, dry_run: bool, report: ExecuteReport) -> Self {
        Self {
            generated_at: Utc::now(),
            target: target.to_string(),
            base_dn: base_dn.to_string(),
            dry_run,
            summary: report.summary,
            outcomes: report.outcomes,
            aborted: None,
        }
    }

    /// Check if the run completed and no operation failed
    pub fn is_success(&self) -> bool {
        self.aborted.is_none() && self.summary.is_success()
    }

    /// Find the outcome for a resource id
    pub fn outcome(&self, resource_id: &str) -> Option<&ResourceOutcome> {
        self.outcomes.iter().find(|o| o.resource_id == resource_id)
    }

    /// Write the report as pretty JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Could not create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Could not write {}", path.display()))?;
        log::info!("Report written to {}", path.display());
        Ok(())
    }

    /// Print per-entity outcomes grouped by type, then the summary
    pub fn print(&self) {
        for resource_type in TYPE_ORDER {
            let outcomes: Vec<&ResourceOutcome> = self
                .outcomes
                .iter()
                .filter(|o| o.resource_type == resource_type)
                .collect();
            if outcomes.is_empty() {
                continue;
            }

            ui::section(ui::type_heading(resource_type));
            for outcome in outcomes {
                print_outcome(outcome);
            }
        }

        print_summary(&self.summary, self.dry_run);
        if let Some(reason) = &self.aborted {
            println!("  {} Run aborted: {reason}", "✗".red().bold());
        }
    }
}

/// A run stopped by a lost directory session, with what it did until then
#[derive(Debug)]
pub struct RunAborted {
    pub report: RunReport,
    pub cause: anyhow::Error,
}

impl RunAborted {
    pub fn new(target: &str, base_dn: &str, dry_run: bool, aborted: declarative::Aborted) -> Self {
        let mut report = RunReport::new(target, base_dn, dry_run, aborted.report);
        report.aborted = Some(format!("{:#}", aborted.cause));
        Self {
            report,
            cause: aborted.cause,
        }
    }
}

impl fmt::Display for RunAborted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Reconciliation aborted after {} changes",
            self.report.summary.created
        )
    }
}

impl std::error::Error for RunAborted {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let cause: &(dyn std::error::Error + 'static) = self.cause.as_ref();
        Some(cause)
    }
}

/// Short status text for an outcome ("created", "already member", ...)
pub fn status_label(resource_type: &str, result: &ApplyResult) -> String {
    match (resource_type, result) {
        ("membership", ApplyResult::Created) => "added".to_string(),
        (_, ApplyResult::Created) => "created".to_string(),
        ("membership", ApplyResult::NoChange) => "already member".to_string(),
        (_, ApplyResult::NoChange) => "already exists".to_string(),
        (_, ApplyResult::Skipped { reason }) => format!("skipped: {reason}"),
        (_, ApplyResult::Failed { error }) => format!("failed: {error}"),
    }
}

fn print_outcome(outcome: &ResourceOutcome) {
    let label = status_label(&outcome.resource_type, &outcome.result);
    let (symbol, label) = match &outcome.result {
        ApplyResult::Created => ("✓".green(), label.green()),
        ApplyResult::NoChange => ("○".dimmed(), label.dimmed()),
        ApplyResult::Skipped { .. } => ("⊘".yellow(), label.yellow()),
        ApplyResult::Failed { .. } => ("✗".red(), label.red()),
    };
    println!("  {symbol} {:<30} {label}", outcome.name);
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary, dry_run: bool) {
    println!();
    if dry_run {
        println!("  {} Dry run - no changes made", "ℹ".blue());
    } else if summary.is_success() {
        println!("  {} Directory reconciled successfully!", "✓".green().bold());
    } else {
        println!("  {} Directory reconciled with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} objects created", summary.created);
    }
    if summary.no_change > 0 {
        println!("    • {} already in place", summary.no_change);
    }
    if summary.skipped > 0 {
        println!("    • {} skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {}", summary.failed, "failed".red());
    }
}
