//! Execution planner - turns the desired state into ordered phases

use adkit::{Directory, dn};
use anyhow::{Result, bail};
use declarative::{ExecutionPlan, FailurePolicy};

use crate::resource::{Group, Membership, OrganizationalUnit, User};
use crate::schema::DesiredState;

/// Phase names, in execution order
pub const PHASES: [&str; 3] = ["ous", "groups", "users"];

/// Resource types accepted by `--only`
const TARGET_TYPES: [&str; 4] = ["ou", "group", "user", "membership"];

/// Build the plan for a desired state
///
/// OUs come first, then groups, then each user followed by its membership,
/// so every object's container exists before it is created.
pub fn build_plan<'d>(
    desired: &DesiredState,
    base_dn: &str,
) -> ExecutionPlan<dyn Directory + 'd> {
    let mut plan = ExecutionPlan::new();
    for phase in PHASES {
        plan.add_phase(phase);
    }

    for name in desired.ou_names() {
        plan.add_resource("ous", Box::new(OrganizationalUnit::new(name, base_dn)));
    }

    for group in &desired.groups {
        plan.add_resource(
            "groups",
            Box::new(Group::new(
                &group.name,
                &group.ou,
                &dn::ou_path(&group.ou, base_dn),
                group.group_type,
            )),
        );
    }

    for user in &desired.users {
        plan.add_resource(
            "users",
            Box::new(User::new(&user.name, &user.ou, &dn::ou_path(&user.ou, base_dn))),
        );
        if let Some(group) = &user.member_of {
            plan.add_resource(
                "users",
                Box::new(Membership::new(
                    group,
                    &user.name,
                    desired.declares_group(group),
                )),
            );
        }
    }

    log::debug!("Planned {} resources", plan.total_resources());
    plan
}

/// Check a `--only` target ("users", "groups.Sales", ...)
pub fn validate_target(target: &str) -> Result<()> {
    let kind = target.split('.').next().unwrap_or_default().to_lowercase();
    let singular = kind.strip_suffix('s').unwrap_or(&kind);
    if !TARGET_TYPES.contains(&singular) {
        bail!(
            "Unknown target '{target}': expected one of ous, groups, users, memberships (optionally followed by .name)"
        );
    }
    Ok(())
}

/// Treats a lost directory session as fatal for the whole run
pub struct DirectoryFailurePolicy;

impl FailurePolicy for DirectoryFailurePolicy {
    fn is_fatal(&self, error: &anyhow::Error) -> bool {
        error
            .chain()
            .any(|cause| cause.downcast_ref::<adkit::Error>().is_some_and(adkit::Error::is_fatal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{GroupRecord, UserRecord};
    use adkit::GroupType;
    use anyhow::Context;

    const BASE: &str = "DC=corp,DC=example";

    fn desired() -> DesiredState {
        DesiredState {
            groups: vec![GroupRecord {
                name: "Sales".to_string(),
                ou: "Sales".to_string(),
                group_type: GroupType::security(),
                line: 2,
            }],
            users: vec![
                UserRecord {
                    name: "Alice".to_string(),
                    ou: "Sales".to_string(),
                    member_of: Some("Sales".to_string()),
                    line: 2,
                },
                UserRecord {
                    name: "Bob".to_string(),
                    ou: "Missing".to_string(),
                    member_of: Some("NoSuchGroup".to_string()),
                    line: 3,
                },
                UserRecord {
                    name: "Carol".to_string(),
                    ou: "Sales".to_string(),
                    member_of: None,
                    line: 4,
                },
            ],
        }
    }

    fn ids(plan: &ExecutionPlan<dyn Directory + '_>) -> Vec<String> {
        plan.resources().map(|r| r.id()).collect()
    }

    #[test]
    fn test_plan_order() {
        let plan = build_plan(&desired(), BASE);
        let names: Vec<&str> = plan.phases.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, PHASES);
        assert_eq!(
            ids(&plan),
            vec![
                "ou:sales",
                "ou:missing",
                "group:sales",
                "user:alice",
                "membership:sales/alice",
                "user:bob",
                "membership:nosuchgroup/bob",
                "user:carol",
            ]
        );
    }

    #[test]
    fn test_undeclared_group_is_not_a_dependency() {
        let plan = build_plan(&desired(), BASE);
        let bob = plan
            .resources()
            .find(|r| r.id() == "membership:nosuchgroup/bob")
            .unwrap();
        assert_eq!(bob.depends_on(), vec!["user:bob".to_string()]);
    }

    #[test]
    fn test_membership_depends_on_group_spelled_differently() {
        let desired = DesiredState {
            groups: vec![GroupRecord {
                name: "Ärzte".to_string(),
                ou: "Klinik".to_string(),
                group_type: GroupType::security(),
                line: 2,
            }],
            users: vec![UserRecord {
                name: "Dana".to_string(),
                ou: "Klinik".to_string(),
                member_of: Some("ärzte".to_string()),
                line: 2,
            }],
        };
        let plan = build_plan(&desired, BASE);
        let membership = plan
            .resources()
            .find(|r| r.id() == "membership:ärzte/dana")
            .unwrap();
        let deps = membership.depends_on();
        assert!(deps.contains(&"group:ärzte".to_string()), "{deps:?}");
        assert!(deps.contains(&"user:dana".to_string()), "{deps:?}");
    }

    #[test]
    fn test_filter_by_target() {
        let plan = build_plan(&desired(), BASE).filter_by_target(Some("memberships"));
        assert_eq!(
            ids(&plan),
            vec!["membership:sales/alice", "membership:nosuchgroup/bob"]
        );

        let plan = build_plan(&desired(), BASE).filter_by_target(Some("users.bob"));
        assert_eq!(ids(&plan), vec!["user:bob"]);
    }

    #[test]
    fn test_validate_target() {
        assert!(validate_target("ous").is_ok());
        assert!(validate_target("groups.Sales").is_ok());
        assert!(validate_target("membership").is_ok());
        assert!(validate_target("computers").is_err());
    }

    #[test]
    fn test_failure_policy() {
        let policy = DirectoryFailurePolicy;

        let fatal: Result<()> =
            Err(adkit::Error::connectivity("reset")).context("Failed to look up");
        assert!(policy.is_fatal(&fatal.unwrap_err()));

        let per_entity = anyhow::Error::new(adkit::Error::not_found("group", "NoSuchGroup"));
        assert!(!policy.is_fatal(&per_entity));

        assert!(!policy.is_fatal(&anyhow::anyhow!("something else")));
    }
}
