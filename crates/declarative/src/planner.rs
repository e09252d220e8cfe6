//! Execution planner - builds ordered, phased resource plans

use crate::resource::{BoxedResource, Resource};

/// A named group of resources applied together
///
/// Phases run in the order they were added to the plan; resources run in
/// insertion order inside their phase.
pub struct Phase<T: ?Sized> {
    pub name: String,
    pub resources: Vec<BoxedResource<T>>,
}

impl<T: ?Sized> Phase<T> {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            resources: Vec::new(),
        }
    }
}

/// An execution plan with resources grouped into ordered phases
pub struct ExecutionPlan<T: ?Sized> {
    pub phases: Vec<Phase<T>>,
}

impl<T: ?Sized> ExecutionPlan<T> {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self { phases: Vec::new() }
    }

    /// Declare a phase, keeping the position of an existing one
    pub fn add_phase(&mut self, name: &str) -> &mut Phase<T> {
        let index = match self.phases.iter().position(|p| p.name == name) {
            Some(index) => index,
            None => {
                self.phases.push(Phase::new(name));
                self.phases.len() - 1
            }
        };
        &mut self.phases[index]
    }

    /// Append a resource to a phase, declaring the phase if needed
    pub fn add_resource(&mut self, phase: &str, resource: BoxedResource<T>) {
        self.add_phase(phase).resources.push(resource);
    }

    /// Check if a resource with this id is part of the plan
    pub fn contains(&self, id: &str) -> bool {
        self.resources().any(|r| r.id() == id)
    }

    /// Iterate over all resources in execution order
    pub fn resources(&self) -> impl Iterator<Item = &BoxedResource<T>> {
        self.phases.iter().flat_map(|p| p.resources.iter())
    }

    /// Filter plan to only include resources matching a predicate
    ///
    /// Phases are kept even when they end up empty, so ordering stays stable.
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&dyn Resource<T>) -> bool,
    {
        Self {
            phases: self
                .phases
                .into_iter()
                .map(|phase| Phase {
                    name: phase.name,
                    resources: phase
                        .resources
                        .into_iter()
                        .filter(|r| predicate(r.as_ref()))
                        .collect(),
                })
                .collect(),
        }
    }

    /// Filter plan to only include resources matching a target pattern
    ///
    /// Target format: "type" or "type.name"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (resource_type, name) = parse_target(t);
                self.filter(|r| matches_filter(r, resource_type.as_deref(), name.as_deref()))
            }
        }
    }

    /// Total number of resources in the plan
    pub fn total_resources(&self) -> usize {
        self.phases.iter().map(|p| p.resources.len()).sum()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.total_resources() == 0
    }
}

impl<T: ?Sized> Default for ExecutionPlan<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a target string like "type.name" into (type, name)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    let parts: Vec<&str> = target.split('.').collect();
    match parts.len() {
        1 => (Some(parts[0].to_string()), None),
        2 => (Some(parts[0].to_string()), Some(parts[1].to_string())),
        _ => (None, Some(target.to_string())),
    }
}

/// Check if a resource matches the filter criteria
///
/// Plural type names are accepted ("users" matches "user"), and names
/// match case-insensitively by substring.
fn matches_filter<T: ?Sized>(
    resource: &dyn Resource<T>,
    resource_type: Option<&str>,
    name: Option<&str>,
) -> bool {
    if let Some(rt) = resource_type {
        let rt = rt.to_lowercase();
        let singular = rt.strip_suffix('s').unwrap_or(&rt);
        if resource.resource_type() != rt && resource.resource_type() != singular {
            return false;
        }
    }

    if let Some(n) = name
        && !resource.name().to_lowercase().contains(&n.to_lowercase())
    {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ApplyContext;
    use crate::types::{ApplyResult, ResourceState};
    use anyhow::Result;

    #[derive(Debug)]
    struct Named {
        kind: &'static str,
        name: &'static str,
    }

    impl Resource<()> for Named {
        fn id(&self) -> String {
            format!("{}:{}", self.kind, self.name)
        }

        fn name(&self) -> String {
            self.name.to_string()
        }

        fn description(&self) -> String {
            self.id()
        }

        fn resource_type(&self) -> &'static str {
            self.kind
        }

        fn current_state(&self, _target: &()) -> Result<ResourceState> {
            Ok(ResourceState::Absent)
        }

        fn apply(&self, _target: &(), _ctx: &mut ApplyContext) -> Result<ApplyResult> {
            Ok(ApplyResult::Created)
        }
    }

    fn sample_plan() -> ExecutionPlan<()> {
        let mut plan = ExecutionPlan::new();
        plan.add_resource("ous", Box::new(Named { kind: "ou", name: "Sales" }));
        plan.add_resource("users", Box::new(Named { kind: "user", name: "alice" }));
        plan.add_resource("users", Box::new(Named { kind: "user", name: "bob" }));
        plan
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("users"), (Some("users".to_string()), None));
        assert_eq!(
            parse_target("users.alice"),
            (Some("users".to_string()), Some("alice".to_string()))
        );
        assert_eq!(parse_target("a.b.c"), (None, Some("a.b.c".to_string())));
    }

    #[test]
    fn test_phases_keep_insertion_order() {
        let mut plan = sample_plan();
        plan.add_resource("ous", Box::new(Named { kind: "ou", name: "IT" }));

        let names: Vec<_> = plan.phases.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["ous", "users"]);

        let ids: Vec<_> = plan.resources().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["ou:Sales", "ou:IT", "user:alice", "user:bob"]);
        assert!(plan.contains("user:bob"));
        assert_eq!(plan.total_resources(), 4);
    }

    #[test]
    fn test_filter_by_target() {
        let plan = sample_plan().filter_by_target(Some("users"));
        assert_eq!(plan.total_resources(), 2);

        let plan = sample_plan().filter_by_target(Some("users.ALICE"));
        let ids: Vec<_> = plan.resources().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["user:alice"]);

        let plan = sample_plan().filter_by_target(None);
        assert_eq!(plan.total_resources(), 3);

        let plan = sample_plan().filter_by_target(Some("groups"));
        assert!(plan.is_empty());
    }
}
