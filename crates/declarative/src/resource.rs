//! Resource trait for declarative state management
//!
//! A Resource represents something that can be in a certain state,
//! and can be changed to reach a desired state. Resources are generic
//! over the target `T` they are inspected and applied against, so the
//! connection to the managed system is passed in explicitly instead of
//! living in process-wide state.

use crate::context::ApplyContext;
use crate::types::{ApplyResult, ResourceState};
use anyhow::Result;
use std::fmt;

/// Core trait for declarative resources
///
/// Every resource provides:
/// - Identity (id, description, type)
/// - Dependencies on other resources in the same plan
/// - State detection (current vs desired)
/// - State convergence (apply)
///
/// # Example
///
/// ```ignore
/// use declarative::{Resource, ResourceState, ApplyResult, ApplyContext};
/// use std::collections::BTreeSet;
/// use std::sync::Mutex;
///
/// #[derive(Debug)]
/// struct Entry(String);
///
/// impl Resource<Mutex<BTreeSet<String>>> for Entry {
///     fn id(&self) -> String {
///         format!("entry:{}", self.0)
///     }
///
///     fn description(&self) -> String {
///         format!("Ensure entry {}", self.0)
///     }
///
///     fn resource_type(&self) -> &'static str {
///         "entry"
///     }
///
///     fn current_state(&self, set: &Mutex<BTreeSet<String>>) -> anyhow::Result<ResourceState> {
///         if set.lock().unwrap().contains(&self.0) {
///             Ok(ResourceState::Present { details: None })
///         } else {
///             Ok(ResourceState::Absent)
///         }
///     }
///
///     fn apply(&self, set: &Mutex<BTreeSet<String>>, ctx: &mut ApplyContext) -> anyhow::Result<ApplyResult> {
///         if ctx.dry_run {
///             return Ok(ApplyResult::Skipped { reason: "Dry run".to_string() });
///         }
///         set.lock().unwrap().insert(self.0.clone());
///         Ok(ApplyResult::Created)
///     }
/// }
/// ```
pub trait Resource<T: ?Sized>: fmt::Debug {
    /// Unique identifier for this resource
    ///
    /// This should be stable and unique across the whole plan, since
    /// dependencies refer to it. Examples:
    /// - "ou:Sales"
    /// - "membership:Sales/alice"
    fn id(&self) -> String;

    /// Human-readable description of what this resource does
    fn description(&self) -> String;

    /// Resource type category
    ///
    /// Used for grouping, filtering and reporting. Examples:
    /// - "ou", "group", "user", "membership"
    fn resource_type(&self) -> &'static str;

    /// Short name used in filters and reports
    ///
    /// Defaults to the id.
    fn name(&self) -> String {
        self.id()
    }

    /// Ids of resources that must converge before this one
    ///
    /// When a dependency fails (or is itself skipped) this resource is
    /// skipped. Ids that are not part of the plan are ignored.
    fn depends_on(&self) -> Vec<String> {
        Vec::new()
    }

    /// Detect the current state of this resource on the target
    fn current_state(&self, target: &T) -> Result<ResourceState>;

    /// Get the desired state for this resource
    fn desired_state(&self) -> ResourceState {
        ResourceState::Present { details: None }
    }

    /// Apply changes to reach the desired state
    ///
    /// Called only after `current_state` reported a difference, so
    /// implementations perform the write without checking again. On a
    /// dry run (`ctx.dry_run`) they must return `Skipped` without writing.
    fn apply(&self, target: &T, ctx: &mut ApplyContext) -> Result<ApplyResult>;
}

/// A boxed resource for type-erased storage
pub type BoxedResource<T> = Box<dyn Resource<T>>;
