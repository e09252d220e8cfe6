//! In-memory directory, used to exercise reconciliation without a domain controller.

use crate::backend::Directory;
use crate::dn;
use crate::error::{Error, Result};
use crate::types::{GroupType, Operation};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct GroupEntry {
    path: String,
    group_type: GroupType,
    members: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct State {
    /// OU distinguished names, keyed by lowercase name
    ous: BTreeMap<String, String>,
    groups: BTreeMap<String, GroupEntry>,
    /// User OU paths, keyed by lowercase name
    users: BTreeMap<String, String>,
    /// Names taken by objects the existence checks do not see
    reserved: HashSet<String>,
    writes: Vec<Operation>,
    disconnected: bool,
}

/// A directory held in memory.
///
/// Names compare case-insensitively, as in Active Directory. Every write
/// attempt is recorded, whether or not it succeeds.
#[derive(Debug)]
pub struct MemoryDirectory {
    root_dn: String,
    state: Mutex<State>,
}

impl MemoryDirectory {
    /// Create an empty directory for a DNS domain ("corp.example").
    pub fn new(domain: &str) -> Self {
        Self {
            root_dn: dn::domain_dn(domain).unwrap_or_else(|| format!("DC={domain}")),
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn connected(&self) -> Result<std::sync::MutexGuard<'_, State>> {
        let state = self.state();
        if state.disconnected {
            return Err(Error::connectivity("session to in-memory directory was closed"));
        }
        Ok(state)
    }

    /// Seed an existing organizational unit under the root.
    pub fn with_ou(self, name: &str) -> Self {
        let path = dn::ou_path(name, &self.root_dn);
        self.state().ous.insert(name.to_lowercase(), path);
        self
    }

    /// Seed an existing group inside an existing OU.
    pub fn with_group(self, name: &str, ou: &str, group_type: GroupType) -> Self {
        let path = dn::ou_path(ou, &self.root_dn);
        self.state().groups.insert(
            name.to_lowercase(),
            GroupEntry {
                path,
                group_type,
                members: BTreeSet::new(),
            },
        );
        self
    }

    /// Seed an existing user, optionally as member of existing groups.
    pub fn with_user(self, name: &str, ou: &str, groups: &[&str]) -> Self {
        let path = dn::ou_path(ou, &self.root_dn);
        {
            let mut state = self.state();
            state.users.insert(name.to_lowercase(), path);
            for group in groups {
                if let Some(entry) = state.groups.get_mut(&group.to_lowercase()) {
                    entry.members.insert(name.to_string());
                }
            }
        }
        self
    }

    /// Take a name by an object outside the reconciler's view.
    ///
    /// Existence checks still answer "absent", but creating an OU, group or
    /// user with this name fails with a conflict.
    pub fn reserve_name(&self, name: &str) {
        self.state().reserved.insert(name.to_lowercase());
    }

    /// Make every following call fail with a connectivity error.
    pub fn disconnect(&self) {
        self.state().disconnected = true;
    }

    /// Writes attempted so far, in order.
    pub fn writes(&self) -> Vec<Operation> {
        self.state().writes.clone()
    }

    /// Forget the recorded writes.
    pub fn clear_writes(&self) {
        self.state().writes.clear();
    }

    /// Distinguished name of an existing OU.
    pub fn ou_dn(&self, name: &str) -> Option<String> {
        self.state().ous.get(&name.to_lowercase()).cloned()
    }

    /// OU path and type of an existing group.
    pub fn group(&self, name: &str) -> Option<(String, GroupType)> {
        self.state()
            .groups
            .get(&name.to_lowercase())
            .map(|g| (g.path.clone(), g.group_type))
    }

    /// OU path of an existing user.
    pub fn user_path(&self, name: &str) -> Option<String> {
        self.state().users.get(&name.to_lowercase()).cloned()
    }
}

fn check_reserved(state: &State, name: &str) -> Result<()> {
    if state.reserved.contains(&name.to_lowercase()) {
        return Err(Error::Conflict {
            name: name.to_string(),
            message: "The specified name is already in use by another object".to_string(),
        });
    }
    Ok(())
}

fn check_container(state: &State, path: &str) -> Result<()> {
    if state.ous.values().any(|dn| dn.eq_ignore_ascii_case(path)) {
        Ok(())
    } else {
        Err(Error::not_found("organizational unit", path))
    }
}

impl Directory for MemoryDirectory {
    fn root_dn(&self) -> Result<String> {
        let _state = self.connected()?;
        Ok(self.root_dn.clone())
    }

    fn ou_exists(&self, name: &str) -> Result<bool> {
        Ok(self.connected()?.ous.contains_key(&name.to_lowercase()))
    }

    fn create_ou(&self, name: &str, parent_dn: &str) -> Result<()> {
        let mut state = self.connected()?;
        state.writes.push(Operation::CreateOu {
            name: name.to_string(),
            path: parent_dn.to_string(),
        });

        check_reserved(&state, name)?;
        if state.ous.contains_key(&name.to_lowercase()) {
            return Err(Error::Conflict {
                name: name.to_string(),
                message: "An organizational unit with this name already exists".to_string(),
            });
        }
        if !parent_dn.eq_ignore_ascii_case(&self.root_dn) {
            check_container(&state, parent_dn)?;
        }

        let path = dn::ou_path(name, parent_dn);
        state.ous.insert(name.to_lowercase(), path);
        Ok(())
    }

    fn group_exists(&self, name: &str) -> Result<bool> {
        Ok(self.connected()?.groups.contains_key(&name.to_lowercase()))
    }

    fn create_group(&self, name: &str, ou_path: &str, group_type: GroupType) -> Result<()> {
        let mut state = self.connected()?;
        state.writes.push(Operation::CreateGroup {
            name: name.to_string(),
            path: ou_path.to_string(),
            group_type,
        });

        check_reserved(&state, name)?;
        if state.groups.contains_key(&name.to_lowercase()) {
            return Err(Error::Conflict {
                name: name.to_string(),
                message: "A group with this name already exists".to_string(),
            });
        }
        check_container(&state, ou_path)?;

        state.groups.insert(
            name.to_lowercase(),
            GroupEntry {
                path: ou_path.to_string(),
                group_type,
                members: BTreeSet::new(),
            },
        );
        Ok(())
    }

    fn user_exists(&self, name: &str) -> Result<bool> {
        Ok(self.connected()?.users.contains_key(&name.to_lowercase()))
    }

    fn create_user(&self, name: &str, ou_path: &str) -> Result<()> {
        let mut state = self.connected()?;
        state.writes.push(Operation::CreateUser {
            name: name.to_string(),
            path: ou_path.to_string(),
        });

        check_reserved(&state, name)?;
        if state.users.contains_key(&name.to_lowercase()) {
            return Err(Error::Conflict {
                name: name.to_string(),
                message: "The specified account already exists".to_string(),
            });
        }
        check_container(&state, ou_path)?;

        state.users.insert(name.to_lowercase(), ou_path.to_string());
        Ok(())
    }

    fn group_members(&self, name: &str) -> Result<Option<BTreeSet<String>>> {
        Ok(self
            .connected()?
            .groups
            .get(&name.to_lowercase())
            .map(|g| g.members.clone()))
    }

    fn add_group_member(&self, group: &str, user: &str) -> Result<()> {
        let mut state = self.connected()?;
        state.writes.push(Operation::AddGroupMember {
            group: group.to_string(),
            user: user.to_string(),
        });

        if !state.users.contains_key(&user.to_lowercase()) {
            return Err(Error::not_found("user", user));
        }
        let entry = state
            .groups
            .get_mut(&group.to_lowercase())
            .ok_or_else(|| Error::not_found("group", group))?;
        entry.members.insert(user.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_dn_from_domain() {
        let dir = MemoryDirectory::new("corp.example");
        assert_eq!(dir.root_dn().unwrap(), "DC=corp,DC=example");
    }

    #[test]
    fn test_create_and_lookup() {
        let dir = MemoryDirectory::new("corp.example");
        assert!(!dir.ou_exists("Sales").unwrap());

        dir.create_ou("Sales", "DC=corp,DC=example").unwrap();
        let path = dir.ou_dn("sales").unwrap();
        assert_eq!(path, "OU=Sales,DC=corp,DC=example");

        dir.create_group("Sales", &path, GroupType::security()).unwrap();
        dir.create_user("alice", &path).unwrap();
        dir.add_group_member("Sales", "alice").unwrap();

        assert!(dir.ou_exists("SALES").unwrap());
        assert!(dir.group_exists("sales").unwrap());
        assert!(dir.user_exists("Alice").unwrap());
        assert!(dir.is_member("Sales", "ALICE").unwrap());
        assert_eq!(dir.writes().len(), 4);
    }

    #[test]
    fn test_missing_group_is_not_an_error_for_reads() {
        let dir = MemoryDirectory::new("corp.example");
        assert_eq!(dir.group_members("Nope").unwrap(), None);
        assert!(!dir.is_member("Nope", "alice").unwrap());
    }

    #[test]
    fn test_add_member_to_missing_group_fails() {
        let dir = MemoryDirectory::new("corp.example")
            .with_ou("Staff")
            .with_user("bob", "Staff", &[]);
        let err = dir.add_group_member("NoSuchGroup", "bob").unwrap_err();
        assert_eq!(err.category(), crate::ErrorCategory::NotFound);
    }

    #[test]
    fn test_create_in_missing_ou_fails() {
        let dir = MemoryDirectory::new("corp.example");
        let err = dir
            .create_user("bob", "OU=Missing,DC=corp,DC=example")
            .unwrap_err();
        assert_eq!(err.category(), crate::ErrorCategory::NotFound);
    }

    #[test]
    fn test_reserved_name_conflicts() {
        let dir = MemoryDirectory::new("corp.example").with_ou("Staff");
        dir.reserve_name("carol");
        assert!(!dir.user_exists("carol").unwrap());

        let err = dir
            .create_user("carol", "OU=Staff,DC=corp,DC=example")
            .unwrap_err();
        assert_eq!(err.category(), crate::ErrorCategory::Conflict);
        assert_eq!(dir.writes().len(), 1);
    }

    #[test]
    fn test_disconnect_is_fatal() {
        let dir = MemoryDirectory::new("corp.example");
        dir.disconnect();
        assert!(dir.ou_exists("Sales").unwrap_err().is_fatal());
    }

    #[test]
    fn test_seeded_membership() {
        let dir = MemoryDirectory::new("corp.example")
            .with_ou("Sales")
            .with_group("Sales", "Sales", GroupType::security())
            .with_user("alice", "Sales", &["Sales"]);
        assert!(dir.is_member("sales", "alice").unwrap());
        assert_eq!(
            dir.group("sales"),
            Some(("OU=Sales,DC=corp,DC=example".to_string(), GroupType::security()))
        );
        assert_eq!(
            dir.user_path("alice").as_deref(),
            Some("OU=Sales,DC=corp,DC=example")
        );
        assert!(dir.writes().is_empty());
    }
}
