//! Core types for directory provisioning.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Whether a group carries security identifiers or is mail-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupCategory {
    /// Security group (can be used in ACLs)
    Security,
    /// Distribution group (email only)
    Distribution,
}

/// Where a group can be used and who can be a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GroupScope {
    /// Domain local group
    DomainLocal,
    /// Global group
    #[default]
    Global,
    /// Universal group
    Universal,
}

/// Category and scope of a group, as in the `Type` column of the groups input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupType {
    /// Security or distribution
    pub category: GroupCategory,
    /// Domain local, global or universal
    pub scope: GroupScope,
}

impl GroupType {
    /// Create a group type.
    pub fn new(category: GroupCategory, scope: GroupScope) -> Self {
        Self { category, scope }
    }

    /// Global security group, the directory default.
    pub fn security() -> Self {
        Self::new(GroupCategory::Security, GroupScope::Global)
    }

    /// Global distribution group.
    pub fn distribution() -> Self {
        Self::new(GroupCategory::Distribution, GroupScope::Global)
    }
}

impl GroupCategory {
    /// Value of the `-GroupCategory` cmdlet parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupCategory::Security => "Security",
            GroupCategory::Distribution => "Distribution",
        }
    }
}

impl GroupScope {
    /// Value of the `-GroupScope` cmdlet parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupScope::DomainLocal => "DomainLocal",
            GroupScope::Global => "Global",
            GroupScope::Universal => "Universal",
        }
    }
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.scope.as_str(), self.category.as_str())
    }
}

/// Error returned when a group type cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "invalid group type '{0}': expected Security or Distribution, optionally with a scope \
     (DomainLocal, Domain Local, Local, Global or Universal), e.g. \"Domain Local Security\""
)]
pub struct ParseGroupTypeError(pub String);

impl FromStr for GroupType {
    type Err = ParseGroupTypeError;

    /// Parse "Security", "Distribution", "Security-Global", "Domain Local Security", ...
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || ParseGroupTypeError(s.trim().to_string());
        let mut category = None;
        let mut scope = None;

        let mut tokens = s
            .split(|c: char| c.is_whitespace() || matches!(c, '-' | '/' | ','))
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .peekable();
        while let Some(mut token) = tokens.next() {
            // "Domain Local" is the spelling AD tools display
            if token == "domain" && tokens.peek().is_some_and(|next| next == "local") {
                tokens.next();
                token = "domainlocal".to_string();
            }
            match token.as_str() {
                "security" if category.is_none() => category = Some(GroupCategory::Security),
                "distribution" if category.is_none() => {
                    category = Some(GroupCategory::Distribution);
                }
                "domainlocal" | "local" if scope.is_none() => scope = Some(GroupScope::DomainLocal),
                "global" if scope.is_none() => scope = Some(GroupScope::Global),
                "universal" if scope.is_none() => scope = Some(GroupScope::Universal),
                _ => return Err(invalid()),
            }
        }

        let category = category.ok_or_else(invalid)?;
        Ok(Self::new(category, scope.unwrap_or_default()))
    }
}

/// A write submitted to the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Create an organizational unit
    CreateOu {
        /// OU name
        name: String,
        /// Parent distinguished name
        path: String,
    },
    /// Create a group
    CreateGroup {
        /// Group name
        name: String,
        /// Distinguished name of the containing OU
        path: String,
        /// Category and scope
        group_type: GroupType,
    },
    /// Create a user
    CreateUser {
        /// Account name
        name: String,
        /// Distinguished name of the containing OU
        path: String,
    },
    /// Add a user to a group
    AddGroupMember {
        /// Group name
        group: String,
        /// Account name
        user: String,
    },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CreateOu { name, .. } => write!(f, "CreateOU({name})"),
            Operation::CreateGroup { name, .. } => write!(f, "CreateGroup({name})"),
            Operation::CreateUser { name, .. } => write!(f, "CreateUser({name})"),
            Operation::AddGroupMember { group, user } => {
                write!(f, "AddGroupMember({group}, {user})")
            }
        }
    }
}

/// Login used to open the remote session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Credential {
    /// Remote account name
    pub user: Option<String>,
    /// Private key file for the account
    pub identity_file: Option<PathBuf>,
}

impl Credential {
    /// Check if neither a user nor a key was given.
    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.identity_file.is_none()
    }
}
