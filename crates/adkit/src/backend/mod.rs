//! Backend abstraction for directory operations.
//!
//! The [`Directory`] trait is the boundary between reconciliation and the
//! directory service, allowing for different implementations (PowerShell
//! over a remote session, in-memory for testing).

pub mod memory;
pub mod powershell;

use crate::error::Result;
use crate::types::GroupType;
use std::collections::BTreeSet;

/// Directory service operations.
///
/// Existence checks treat "not found" as a normal answer (`false`/`None`);
/// errors are reserved for failed lookups and rejected writes.
pub trait Directory {
    /// Distinguished name of the domain root (e.g. "DC=corp,DC=example").
    fn root_dn(&self) -> Result<String>;

    /// Check if an organizational unit with this name exists anywhere in the domain.
    fn ou_exists(&self, name: &str) -> Result<bool>;

    /// Create an organizational unit under `parent_dn`.
    fn create_ou(&self, name: &str, parent_dn: &str) -> Result<()>;

    /// Check if a group with this name exists.
    fn group_exists(&self, name: &str) -> Result<bool>;

    /// Create a group inside the OU at `ou_path`.
    fn create_group(&self, name: &str, ou_path: &str, group_type: GroupType) -> Result<()>;

    /// Check if a user with this account name exists.
    fn user_exists(&self, name: &str) -> Result<bool>;

    /// Create a user inside the OU at `ou_path`.
    fn create_user(&self, name: &str, ou_path: &str) -> Result<()>;

    /// Account names of the direct members of a group, `None` if the group does not exist.
    fn group_members(&self, name: &str) -> Result<Option<BTreeSet<String>>>;

    /// Add a user to a group.
    fn add_group_member(&self, group: &str, user: &str) -> Result<()>;

    /// Check if a user is a direct member of a group (case-insensitive).
    fn is_member(&self, group: &str, user: &str) -> Result<bool> {
        let user = user.to_lowercase();
        Ok(self
            .group_members(group)?
            .is_some_and(|members| members.iter().any(|m| m.to_lowercase() == user)))
    }
}
