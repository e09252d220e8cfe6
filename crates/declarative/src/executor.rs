//! Execution engine - inspects, then applies resources in plan order
//!
//! Execution is split in two steps so callers can show the diff and ask
//! for confirmation in between:
//!
//! 1. [`inspect`] reads every resource's current state exactly once.
//! 2. [`apply`] converges the resources that differ, phase by phase.
//!
//! A failed resource never stops its siblings; resources depending on it
//! are skipped. Errors the [`FailurePolicy`] deems fatal abort immediately.

use crate::context::{ApplyContext, ConfirmCallback, FailurePolicy, ProgressCallback};
use crate::diff::ResourceDiff;
use crate::planner::ExecutionPlan;
use crate::resource::Resource;
use crate::types::{
    Aborted, ApplyResult, ExecuteOptions, ExecuteReport, ResourceOutcome, ResourceState,
};
use anyhow::Result;
use std::collections::HashSet;

/// A plan together with the state observed for each of its resources
pub struct InspectedPlan<T: ?Sized> {
    plan: ExecutionPlan<T>,
    /// Observed states, flattened in plan order
    states: Vec<ResourceState>,
}

impl<T: ?Sized> InspectedPlan<T> {
    /// Diffs for every resource that is not in its desired state
    pub fn diffs(&self) -> Vec<ResourceDiff> {
        self.plan
            .resources()
            .zip(&self.states)
            .filter_map(|(resource, state)| ResourceDiff::from_state(resource.as_ref(), state))
            .collect()
    }

    /// Number of resources that need work
    pub fn pending_changes(&self) -> usize {
        self.plan
            .resources()
            .zip(&self.states)
            .filter(|(resource, state)| **state != resource.desired_state())
            .count()
    }

    /// Check if anything differs from the desired state
    pub fn has_changes(&self) -> bool {
        self.pending_changes() > 0
    }

    /// The inspected plan
    pub fn plan(&self) -> &ExecutionPlan<T> {
        &self.plan
    }

    /// Report for a run the user declined
    ///
    /// Converged resources are reported unchanged, everything else skipped.
    pub fn decline(self) -> ExecuteReport {
        let mut report = ExecuteReport::default();
        for (resource, state) in self.plan.resources().zip(&self.states) {
            let result = if *state == resource.desired_state() {
                ApplyResult::NoChange
            } else {
                ApplyResult::Skipped {
                    reason: "Declined".to_string(),
                }
            };
            report.push(outcome(resource.as_ref(), resource.id(), result));
        }
        report
    }
}

/// Read the current state of every resource in the plan, once
///
/// Read errors are kept as `ResourceState::Unknown` unless the policy
/// deems them fatal, in which case inspection stops and the error is
/// returned before anything was written.
pub fn inspect<T: ?Sized>(
    plan: ExecutionPlan<T>,
    target: &T,
    policy: &dyn FailurePolicy,
) -> Result<InspectedPlan<T>> {
    let mut states = Vec::with_capacity(plan.total_resources());

    for resource in plan.resources() {
        let state = match resource.current_state(target) {
            Ok(state) => state,
            Err(e) if policy.is_fatal(&e) => return Err(e),
            Err(e) => {
                log::warn!("Could not inspect {}: {e:#}", resource.id());
                ResourceState::Unknown {
                    error: format!("{e:#}"),
                }
            }
        };
        log::debug!("{} is {:?}", resource.id(), state);
        states.push(state);
    }

    Ok(InspectedPlan { plan, states })
}

/// Apply an inspected plan
///
/// Every resource yields exactly one outcome, in plan order. An error the
/// policy deems fatal stops the run; the returned error is an [`Aborted`]
/// carrying the outcomes recorded so far, the fatal one last.
pub fn apply<T, P>(
    inspected: InspectedPlan<T>,
    target: &T,
    opts: &ExecuteOptions,
    policy: &dyn FailurePolicy,
    progress: &mut P,
) -> Result<ExecuteReport>
where
    T: ?Sized,
    P: ProgressCallback,
{
    let InspectedPlan { plan, states } = inspected;
    let mut states = states.into_iter();
    let mut report = ExecuteReport::default();
    // Resources that did not converge: failed, or skipped because of a dependency
    let mut blocked: HashSet<String> = HashSet::new();

    for phase in &plan.phases {
        if phase.resources.is_empty() {
            continue;
        }
        log::info!("Phase {}: {} resources", phase.name, phase.resources.len());
        progress.on_phase_start(&phase.name, phase.resources.len());

        for resource in &phase.resources {
            let id = resource.id();
            let state = states.next().unwrap_or(ResourceState::Unknown {
                error: "state was not inspected".to_string(),
            });

            progress.on_resource_start(&id, &resource.description());
            let result = match apply_resource(resource.as_ref(), target, state, opts, policy, &blocked)
            {
                Ok(result) => result,
                Err(cause) => {
                    let result = ApplyResult::Failed {
                        error: format!("{cause:#}"),
                    };
                    progress.on_resource_complete(&id, &result);
                    progress.on_phase_complete();
                    report.push(outcome(resource.as_ref(), id, result));
                    log::error!("Aborting after {} resources", report.outcomes.len());
                    return Err(Aborted { report, cause }.into());
                }
            };
            progress.on_resource_complete(&id, &result);

            match &result {
                ApplyResult::Failed { error } => {
                    log::warn!("{id} failed: {error}");
                    blocked.insert(id.clone());
                }
                ApplyResult::Skipped { reason } => {
                    log::info!("{id} skipped: {reason}");
                    if !opts.dry_run {
                        blocked.insert(id.clone());
                    }
                }
                _ => {}
            }

            report.push(outcome(resource.as_ref(), id, result));
        }

        progress.on_phase_complete();
    }

    Ok(report)
}

fn outcome<T: ?Sized>(resource: &dyn Resource<T>, id: String, result: ApplyResult) -> ResourceOutcome {
    ResourceOutcome {
        resource_id: id,
        resource_type: resource.resource_type().to_string(),
        name: resource.name(),
        description: resource.description(),
        result,
    }
}

/// Decide and perform the work for one resource
fn apply_resource<T: ?Sized>(
    resource: &dyn Resource<T>,
    target: &T,
    state: ResourceState,
    opts: &ExecuteOptions,
    policy: &dyn FailurePolicy,
    blocked: &HashSet<String>,
) -> Result<ApplyResult> {
    if let ResourceState::Unknown { error } = state {
        return Ok(ApplyResult::Failed { error });
    }

    if state == resource.desired_state() {
        return Ok(ApplyResult::NoChange);
    }

    if let Some(dependency) = resource
        .depends_on()
        .into_iter()
        .find(|d| blocked.contains(d))
    {
        return Ok(ApplyResult::Skipped {
            reason: format!("dependency {dependency} did not converge"),
        });
    }

    let mut ctx = ApplyContext::new(opts.dry_run);
    match resource.apply(target, &mut ctx) {
        Ok(result) => Ok(result),
        Err(e) if policy.is_fatal(&e) => Err(e),
        Err(e) => Ok(ApplyResult::Failed {
            error: format!("{e:#}"),
        }),
    }
}

/// Inspect, confirm, then apply a plan
///
/// When nothing differs, or the user declines, no resource is applied.
/// A declined run reports every pending change as skipped.
pub fn execute<T, P, C>(
    plan: ExecutionPlan<T>,
    target: &T,
    opts: &ExecuteOptions,
    policy: &dyn FailurePolicy,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteReport>
where
    T: ?Sized,
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let inspected = inspect(plan, target, policy)?;
    let pending = inspected.pending_changes();

    if pending > 0
        && !opts.dry_run
        && !confirm.confirm(&format!("Apply {pending} changes?"))?
    {
        return Ok(inspected.decline());
    }

    apply(inspected, target, opts, policy, progress)
}

/// Simple execution without callbacks
///
/// For basic use cases where you don't need progress or confirmation.
pub fn execute_simple<T: ?Sized>(
    plan: ExecutionPlan<T>,
    target: &T,
    opts: &ExecuteOptions,
    policy: &dyn FailurePolicy,
) -> Result<ExecuteReport> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(plan, target, opts, policy, &mut NoProgress, &mut AutoConfirm)
}
