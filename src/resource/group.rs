//! Group resource

use adkit::{Directory, GroupType};
use anyhow::{Context, Result};

use super::{ApplyContext, ApplyResult, Resource, ResourceState, presence, resource_id};

/// A group declared in the groups input
#[derive(Debug, Clone)]
pub struct Group {
    pub name: String,
    /// Name of the containing OU
    pub ou: String,
    /// Distinguished name of the containing OU
    pub ou_path: String,
    pub group_type: GroupType,
}

impl Group {
    pub fn new(name: &str, ou: &str, ou_path: &str, group_type: GroupType) -> Self {
        Self {
            name: name.to_string(),
            ou: ou.to_string(),
            ou_path: ou_path.to_string(),
            group_type,
        }
    }
}

impl<'d> Resource<dyn Directory + 'd> for Group {
    fn id(&self) -> String {
        resource_id("group", &self.name)
    }

    fn description(&self) -> String {
        format!(
            "Create {} group {} in {}",
            self.group_type, self.name, self.ou_path
        )
    }

    fn resource_type(&self) -> &'static str {
        "group"
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn depends_on(&self) -> Vec<String> {
        vec![resource_id("ou", &self.ou)]
    }

    fn current_state(&self, directory: &(dyn Directory + 'd)) -> Result<ResourceState> {
        let exists = directory
            .group_exists(&self.name)
            .with_context(|| format!("Failed to look up group {}", self.name))?;
        Ok(presence(exists))
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
        log::info!("Creating group {} in {}", self.name, self.ou_path);
        directory
            .create_group(&self.name, &self.ou_path, self.group_type)
            .with_context(|| format!("Failed to create group {}", self.name))?;
        Ok(ApplyResult::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adkit::{ErrorCategory, MemoryDirectory};

    const SALES: &str = "OU=Sales,DC=corp,DC=example";

    #[test]
    fn test_group_depends_on_ou() {
        let group = Group::new("Sales", "Sales", SALES, GroupType::security());
        assert_eq!(group.id(), "group:sales");
        assert_eq!(group.depends_on(), vec!["ou:sales".to_string()]);
        assert!(group.description().contains("Global Security"));
    }

    #[test]
    fn test_group_created_with_type() {
        let directory = MemoryDirectory::new("corp.example").with_ou("Sales");
        let group = Group::new("Sales", "Sales", SALES, GroupType::distribution());

        let mut ctx = ApplyContext::new(false);
        group.apply(&directory, &mut ctx).unwrap();

        assert!(group.current_state(&directory).unwrap().is_present());
        assert_eq!(
            directory.group("sales"),
            Some((SALES.to_string(), GroupType::distribution()))
        );
    }

    #[test]
    fn test_conflict_is_reported_with_context() {
        let directory = MemoryDirectory::new("corp.example").with_ou("Sales");
        directory.reserve_name("Sales");
        let group = Group::new("Sales", "Sales", SALES, GroupType::security());

        let mut ctx = ApplyContext::new(false);
        let err = group.apply(&directory, &mut ctx).unwrap_err();
        assert!(format!("{err:#}").starts_with("Failed to create group Sales"));
        assert_eq!(
            err.downcast_ref::<adkit::Error>().unwrap().category(),
            ErrorCategory::Conflict
        );
    }
}
