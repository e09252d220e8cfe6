//! # Declarative
//!
//! A framework for declarative resource management.
//!
//! This crate provides the core abstractions for declaring desired state,
//! inspecting current state, and converging a target system to match the
//! desired state in a fixed, dependency-aware order.
//!
//! ## Core Concepts
//!
//! - **Resource**: Something with state on a target that can be managed
//! - **ResourceState**: The current or desired state of a resource
//! - **ExecutionPlan**: Resources grouped into ordered phases
//! - **Executor**: Inspects every resource once, then applies the differences,
//!   skipping resources whose dependencies did not converge
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{ExecutionPlan, ExecuteOptions, NeverFatal, execute_simple};
//!
//! let mut plan = ExecutionPlan::new();
//! plan.add_resource("containers", Box::new(Container::new("Sales")));
//! plan.add_resource("members", Box::new(Member::new("Sales", "alice")));
//!
//! let report = execute_simple(plan, &target, &ExecuteOptions::default(), &NeverFatal)?;
//! for outcome in report.failures() {
//!     eprintln!("{}: {:?}", outcome.resource_id, outcome.result);
//! }
//! ```
//!
//! ## Provider Traits
//!
//! The crate uses traits for dependency injection:
//!
//! - [`FailurePolicy`]: Decides which errors abort the whole run
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks, error taxonomies, etc.

pub mod context;
pub mod diff;
pub mod executor;
pub mod planner;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{
    ApplyContext, AutoConfirm, AutoDecline, ConfirmCallback, FailurePolicy, NeverFatal,
    NoProgress, ProgressCallback,
};
pub use diff::{DiffSummary, ResourceDiff};
pub use executor::{InspectedPlan, apply, execute, execute_simple, inspect};
pub use planner::{ExecutionPlan, Phase};
pub use resource::{BoxedResource, Resource};
pub use types::{
    Aborted, ApplyResult, ExecuteOptions, ExecuteReport, ExecuteSummary, ResourceOutcome,
    ResourceState,
};
