//! Organizational unit resource

use adkit::{Directory, dn};
use anyhow::{Context, Result};

use super::{ApplyContext, ApplyResult, Resource, ResourceState, presence, resource_id};

/// An organizational unit directly under the base DN
#[derive(Debug, Clone)]
pub struct OrganizationalUnit {
    pub name: String,
    pub parent_dn: String,
}

impl OrganizationalUnit {
    pub fn new(name: &str, parent_dn: &str) -> Self {
        Self {
            name: name.to_string(),
            parent_dn: parent_dn.to_string(),
        }
    }

    /// Distinguished name the OU gets when created
    pub fn dn(&self) -> String {
        dn::ou_path(&self.name, &self.parent_dn)
    }
}

impl<'d> Resource<dyn Directory + 'd> for OrganizationalUnit {
    fn id(&self) -> String {
        resource_id("ou", &self.name)
    }

    fn description(&self) -> String {
        format!("Create OU {} under {}", self.name, self.parent_dn)
    }

    fn resource_type(&self) -> &'static str {
        "ou"
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn current_state(&self, directory: &(dyn Directory + 'd)) -> Result<ResourceState> {
        let exists = directory
            .ou_exists(&self.name)
            .with_context(|| format!("Failed to look up OU {}", self.name))?;
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
        log::info!("Creating OU {}", self.dn());
        directory
            .create_ou(&self.name, &self.parent_dn)
            .with_context(|| format!("Failed to create OU {}", self.name))?;
        Ok(ApplyResult::Created)
    }
}
