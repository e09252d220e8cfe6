//! Reconciliation engine for adsync
//!
//! The engine orchestrates:
//! 1. Planning - Build the ordered resource plan from the desired state
//! 2. Inspecting - Read each resource's directory state once
//! 3. Executing - Confirm, then apply the differences in plan order

pub mod differ;
pub mod executor;
pub mod planner;


pub use differ::display_diff;
pub use executor::{RunOptions, preview, reconcile, run, with_directory};
pub use planner::validate_target;
