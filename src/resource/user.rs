//! User account resource

use adkit::Directory;
use anyhow::{Context, Result};

use super::{ApplyContext, ApplyResult, Resource, ResourceState, presence, resource_id};

/// A user declared in the users input
#[derive(Debug, Clone)]
pub struct User {
    pub name: String,
    pub ou: String,
    pub ou_path: String,
}

impl User {
    pub fn new(name: &str, ou: &str, ou_path: &str) -> Self {
        Self {
            name: name.to_string(),
            ou: ou.to_string(),
            ou_path: ou_path.to_string(),
        }
    }
}

impl<'d> Resource<dyn Directory + 'd> for User {
    fn id(&self) -> String {
        resource_id("user", &self.name)
    }

    fn description(&self) -> String {
        format!("Create user {} in {}", self.name, self.ou_path)
    }

    fn resource_type(&self) -> &'static str {
        "user"
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn depends_on(&self) -> Vec<String> {
        vec![resource_id("ou", &self.ou)]
    }

    fn current_state(&self, directory: &(dyn Directory + 'd)) -> Result<ResourceState> {
        let exists = directory
            .user_exists(&self.name)
            .with_context(|| format!("Failed to look up user {}", self.name))?;
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
        log::info!("Creating user {} in {}", self.name, self.ou_path);
        directory
            .create_user(&self.name, &self.ou_path)
            .with_context(|| format!("Failed to create user {}", self.name))?;
        Ok(ApplyResult::Created)
    }
}
