//! Group membership resource
//!
//! Memberships are only ever added; members the inputs do not mention are
//! left alone.

use adkit::Directory;
use anyhow::{Context, Result};

use super::{ApplyContext, ApplyResult, Resource, ResourceState, presence, resource_id};

/// A user's membership in a group
#[derive(Debug, Clone)]
pub struct Membership {
    pub group: String,
    pub user: String,
    /// Whether the group is declared in the groups input (and so planned)
    pub group_declared: bool,
}

impl Membership {
    pub fn new(group: &str, user: &str, group_declared: bool) -> Self {
        Self {
            group: group.to_string(),
            user: user.to_string(),
            group_declared,
        }
    }
}

impl<'d> Resource<dyn Directory + 'd> for Membership {
    fn id(&self) -> String {
        resource_id("membership", &format!("{}/{}", self.group, self.user))
    }

    fn description(&self) -> String {
        format!("Add {} to group {}", self.user, self.group)
    }

    fn resource_type(&self) -> &'static str {
        "membership"
    }

    fn name(&self) -> String {
        format!("{}/{}", self.group, self.user)
    }

    fn depends_on(&self) -> Vec<String> {
        let mut deps = vec![resource_id("user", &self.user)];
        if self.group_declared {
            deps.push(resource_id("group", &self.group));
        }
        deps
    }

    /// A missing group reads as "not a member"; adding then reports it.
    fn current_state(&self, directory: &(dyn Directory + 'd)) -> Result<ResourceState> {
        let member = directory
            .is_member(&self.group, &self.user)
            .with_context(|| format!("Failed to read members of group {}", self.group))?;
        Ok(presence(member))
    }

    fn apply(
        &self,
        directory: &(dyn Directory + 'd),
        ctx: &mut ApplyContext,
    ) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: "Dry run".to_string(),
            });
        }
        log::info!("Adding {} to {}", self.user, self.group);
        directory
            .add_group_member(&self.group, &self.user)
            .with_context(|| format!("Failed to add {} to group {}", self.user, self.group))?;
        Ok(ApplyResult::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adkit::{ErrorCategory, GroupType, MemoryDirectory};

    #[test]
    fn test_dependencies() {
        let declared = Membership::new("Sales", "Alice", true);
        assert_eq!(declared.id(), "membership:sales/alice");
        assert_eq!(
            declared.depends_on(),
            vec!["user:alice".to_string(), "group:sales".to_string()]
        );

        let external = Membership::new("Domain Admins", "Alice", false);
        assert_eq!(external.depends_on(), vec!["user:alice".to_string()]);
    }

    #[test]
    fn test_existing_membership_is_present() {
        let directory = MemoryDirectory::new("corp.example")
            .with_ou("Sales")
            .with_group("Sales", "Sales", GroupType::security())
            .with_user("alice", "Sales", &["Sales"]);
        let membership = Membership::new("SALES", "Alice", true);
        assert!(membership.current_state(&directory).unwrap().is_present());
    }

    #[test]
    fn test_missing_group_reads_absent_and_add_fails() {
        let directory = MemoryDirectory::new("corp.example")
            .with_ou("Missing")
            .with_user("Bob", "Missing", &[]);
        let membership = Membership::new("NoSuchGroup", "Bob", false);

        assert!(membership.current_state(&directory).unwrap().is_absent());

        let mut ctx = ApplyContext::new(false);
        let err = membership.apply(&directory, &mut ctx).unwrap_err();
        let cause = err.downcast_ref::<adkit::Error>().unwrap();
        assert_eq!(cause.category(), ErrorCategory::NotFound);
        assert_eq!(cause.to_string(), "group not found: NoSuchGroup");
    }
}
