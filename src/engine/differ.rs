//! Diff display - adsync-specific UI

use colored::Colorize;
use declarative::{DiffSummary, ResourceDiff, ResourceState};

use crate::ui;

/// Resource types in the order they are applied
const TYPE_ORDER: [&str; 4] = ["ou", "group", "user", "membership"];

/// Diffs of one resource type, in plan order
fn of_type<'a>(diffs: &'a [ResourceDiff], resource_type: &str) -> Vec<&'a ResourceDiff> {
    diffs
        .iter()
        .filter(|d| d.resource_type == resource_type)
        .collect()
}

/// One line of the diff box
fn diff_line(diff: &ResourceDiff) -> String {
    match &diff.current {
        ResourceState::Unknown { error } => format!(
            "{} {:<30} {}",
            "?".yellow(),
            diff.resource_id,
            format!("(could not read: {error})").dimmed()
        ),
        _ => format!(
            "{} {:<30} {}",
            "+".green(),
            diff.resource_id,
            diff.description.dimmed()
        ),
    }
}

/// Display a list of diffs in a user-friendly format
pub fn display_diff(diffs: &[ResourceDiff]) {
    if diffs.is_empty() {
        println!();
        println!("  {} Directory already matches the inputs", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Directory Diff".bold()
    );
    println!("│");

    for resource_type in TYPE_ORDER {
        let type_diffs = of_type(diffs, resource_type);
        if type_diffs.is_empty() {
            continue;
        }
        println!("│ {}", ui::type_heading(resource_type).bold());
        for diff in type_diffs {
            println!("│   {}", diff_line(diff));
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} to add, {} unreadable)",
        summary.total().to_string().bold(),
        summary.additions.to_string().green(),
        summary.unknown.to_string().yellow()
    );
    println!("└─────────────────────────────────────────────────────┘");
}
