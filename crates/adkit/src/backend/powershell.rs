//! Active Directory backend using the ActiveDirectory PowerShell module.
//!
//! Every call is one script sent over the run's [`RemoteSession`]. Values
//! are passed as single-quoted PowerShell literals, never interpolated into
//! cmdlet syntax.

use crate::backend::Directory;
use crate::error::{Error, Result};
use crate::session::{RemoteSession, ScriptOutput};
use crate::types::GroupType;
use std::collections::BTreeSet;

/// Exit code of the membership script when the group is missing.
const EXIT_NO_GROUP: i32 = 2;
/// Exit code of the membership script when the user is missing.
const EXIT_NO_USER: i32 = 3;

/// Backend that runs AD cmdlets through a remote session.
#[derive(Debug)]
pub struct PowerShellDirectory<'a> {
    session: &'a RemoteSession,
}

impl<'a> PowerShellDirectory<'a> {
    /// Create a backend over an open session.
    pub fn new(session: &'a RemoteSession) -> Self {
        Self { session }
    }

    /// Run a script and return its output, classifying failures.
    fn run_checked(&self, body: &str, kind: &str, subject: &str) -> Result<String> {
        let output = self.run(body)?;
        if !output.success() {
            return Err(Error::from_powershell_output(&output.stderr, kind, subject));
        }
        Ok(output.stdout)
    }

    fn run(&self, body: &str) -> Result<ScriptOutput> {
        let script = wrap_script(body);
        log::trace!("powershell: {script}");
        self.session.run_script(&script)
    }

    fn run_bool(&self, body: &str, kind: &str, subject: &str) -> Result<bool> {
        parse_bool(&self.run_checked(body, kind, subject)?)
    }
}

/// Quote a value as a PowerShell single-quoted string.
pub fn ps_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Wrap statements so that any error is written to stderr and exits 1.
///
/// `-Command -` executes stdin line by line, so the whole script is kept on
/// a single line.
fn wrap_script(body: &str) -> String {
    format!(
        "$ErrorActionPreference = 'Stop'; $ProgressPreference = 'SilentlyContinue'; \
         try {{ Import-Module ActiveDirectory; {body} }} \
         catch {{ [Console]::Error.WriteLine($_.Exception.Message); exit 1 }}\n"
    )
}

fn exists_script(cmdlet: &str, attribute: &str, name: &str) -> String {
    format!(
        "$name = {}; if ({cmdlet} -Filter '{attribute} -eq $name') {{ 'true' }} else {{ 'false' }}",
        ps_quote(name)
    )
}

fn create_ou_script(name: &str, parent_dn: &str) -> String {
    format!(
        "New-ADOrganizationalUnit -Name {} -Path {}",
        ps_quote(name),
        ps_quote(parent_dn)
    )
}

fn create_group_script(name: &str, ou_path: &str, group_type: GroupType) -> String {
    format!(
        "New-ADGroup -Name {name} -SamAccountName {name} -GroupCategory {} -GroupScope {} -Path {}",
        group_type.category.as_str(),
        group_type.scope.as_str(),
        ps_quote(ou_path),
        name = ps_quote(name),
    )
}

fn create_user_script(name: &str, ou_path: &str) -> String {
    format!(
        "New-ADUser -Name {name} -SamAccountName {name} -Path {}",
        ps_quote(ou_path),
        name = ps_quote(name),
    )
}

fn group_members_script(name: &str) -> String {
    format!(
        "$name = {}; $group = Get-ADGroup -Filter 'Name -eq $name'; \
         if (-not $group) {{ 'null' }} else {{ ConvertTo-Json -Compress -InputObject \
         @(Get-ADGroupMember -Identity $group | ForEach-Object {{ $_.SamAccountName }}) }}",
        ps_quote(name)
    )
}

fn add_member_script(group: &str, user: &str) -> String {
    format!(
        "$g = {}; $u = {}; \
         $group = Get-ADGroup -Filter 'Name -eq $g'; \
         if (-not $group) {{ [Console]::Error.WriteLine(\"group not found: $g\"); exit {EXIT_NO_GROUP} }}; \
         $user = Get-ADUser -Filter 'SamAccountName -eq $u'; \
         if (-not $user) {{ [Console]::Error.WriteLine(\"user not found: $u\"); exit {EXIT_NO_USER} }}; \
         Add-ADGroupMember -Identity $group -Members $user",
        ps_quote(group),
        ps_quote(user)
    )
}

fn parse_bool(stdout: &str) -> Result<bool> {
    match stdout.trim() {
        "true" | "True" => Ok(true),
        "false" | "False" => Ok(false),
        other => Err(Error::Parse(format!("expected true or false, got '{other}'"))),
    }
}

/// Parse the member list: `null` for a missing group, otherwise a JSON array.
fn parse_members(stdout: &str) -> Result<Option<BTreeSet<String>>> {
    let stdout = stdout.trim();
    if stdout.is_empty() {
        return Err(Error::Parse("empty member list".to_string()));
    }
    let members: Option<Vec<Option<String>>> = serde_json::from_str(stdout)?;
    Ok(members.map(|list| list.into_iter().flatten().collect()))
}

impl Directory for PowerShellDirectory<'_> {
    fn root_dn(&self) -> Result<String> {
        let dn = self.run_checked("(Get-ADDomain).DistinguishedName", "domain", "root")?;
        if dn.is_empty() {
            return Err(Error::Parse("domain has no distinguished name".to_string()));
        }
        Ok(dn)
    }

    fn ou_exists(&self, name: &str) -> Result<bool> {
        self.run_bool(
            &exists_script("Get-ADOrganizationalUnit", "Name", name),
            "organizational unit",
            name,
        )
    }

    fn create_ou(&self, name: &str, parent_dn: &str) -> Result<()> {
        log::debug!("Creating OU {name} under {parent_dn}");
        self.run_checked(&create_ou_script(name, parent_dn), "organizational unit", name)?;
        Ok(())
    }

    fn group_exists(&self, name: &str) -> Result<bool> {
        self.run_bool(&exists_script("Get-ADGroup", "Name", name), "group", name)
    }

    fn create_group(&self, name: &str, ou_path: &str, group_type: GroupType) -> Result<()> {
        log::debug!("Creating {group_type} group {name} in {ou_path}");
        self.run_checked(&create_group_script(name, ou_path, group_type), "group", name)?;
        Ok(())
    }

    fn user_exists(&self, name: &str) -> Result<bool> {
        self.run_bool(&exists_script("Get-ADUser", "SamAccountName", name), "user", name)
    }

    fn create_user(&self, name: &str, ou_path: &str) -> Result<()> {
        log::debug!("Creating user {name} in {ou_path}");
        self.run_checked(&create_user_script(name, ou_path), "user", name)?;
        Ok(())
    }

    fn group_members(&self, name: &str) -> Result<Option<BTreeSet<String>>> {
        parse_members(&self.run_checked(&group_members_script(name), "group", name)?)
    }

    fn add_group_member(&self, group: &str, user: &str) -> Result<()> {
        log::debug!("Adding {user} to {group}");
        let output = self.run(&add_member_script(group, user))?;
        match output.status {
            Some(0) => Ok(()),
            Some(EXIT_NO_GROUP) => Err(Error::not_found("group", group)),
            Some(EXIT_NO_USER) => Err(Error::not_found("user", user)),
            _ => Err(Error::from_powershell_output(
                &output.stderr,
                "group membership",
                &format!("{group}/{user}"),
            )),
        }
    }
}
