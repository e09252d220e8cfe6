//! Desired directory state, as declared by the CSV inputs.

use adkit::GroupType;
use serde::Serialize;
use std::collections::HashSet;

/// One row of the groups file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRecord {
    pub name: String,
    /// Name of the organizational unit the group lives in
    pub ou: String,
    pub group_type: GroupType,
    /// 1-based line in the input file
    pub line: u64,
}

/// One row of the users file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub name: String,
    pub ou: String,
    /// Group the user should belong to, `None` when the cell is empty
    pub member_of: Option<String>,
    pub line: u64,
}

/// Everything the directory should contain after a run.
///
/// Immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DesiredState {
    pub groups: Vec<GroupRecord>,
    pub users: Vec<UserRecord>,
}

impl DesiredState {
    /// Distinct OU names in first-reference order, groups before users.
    ///
    /// Names differing only in case are the same OU; the first spelling wins.
    pub fn ou_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.groups
            .iter()
            .map(|g| g.ou.as_str())
            .chain(self.users.iter().map(|u| u.ou.as_str()))
            .filter(|name| seen.insert(name.to_lowercase()))
            .collect()
    }

    /// Check if a group is declared in the groups input.
    pub fn declares_group(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.groups.iter().any(|g| g.name.to_lowercase() == name)
    }

    /// Number of memberships the users input asks for.
    pub fn membership_count(&self) -> usize {
        self.users.iter().filter(|u| u.member_of.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.users.is_empty()
    }
}
