//! Directory resources for adsync
//!
//! Every object the inputs declare is modeled as a resource against any
//! [`adkit::Directory`] target:
//! - State detection (present or absent in the directory)
//! - Apply function (create the object, or add the membership)
//! - Dependencies on the resources that must exist first
//!
//! Ids use lowercase names since directory names compare case-insensitively.

pub use declarative::{ApplyContext, ApplyResult, Resource, ResourceState};

pub mod group;
pub mod membership;
pub mod ou;
pub mod user;

pub use group::Group;
pub use membership::Membership;
pub use ou::OrganizationalUnit;
pub use user::User;

/// Stable id for a directory object ("ou:sales", "user:alice", ...)
pub fn resource_id(kind: &str, name: &str) -> String {
    format!("{kind}:{}", name.to_lowercase())
}

/// State from an existence check
fn presence(exists: bool) -> ResourceState {
    if exists {
        ResourceState::Present { details: None }
    } else {
        ResourceState::Absent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_id_is_lowercase() {
        assert_eq!(resource_id("ou", "Sales"), "ou:sales");
        assert_eq!(resource_id("membership", "Sales/Alice"), "membership:sales/alice");
    }

    #[test]
    fn test_presence() {
        assert!(presence(true).is_present());
        assert!(presence(false).is_absent());
    }
}
