//! Execution engine - adsync-specific executor with UI integration
//!
//! Every run holds exactly one directory session. It is opened before the
//! first read and released before returning, whether the run succeeded,
//! failed, or was aborted.

use adkit::{Directory, PowerShellDirectory, RemoteSession};
use anyhow::{Context, Result};
use declarative::{
    Aborted, ConfirmCallback, ExecuteOptions, NoProgress, ProgressCallback, ResourceDiff,
};

use super::differ::display_diff;
use super::planner::{DirectoryFailurePolicy, build_plan};
use crate::config::ConnectionParams;
use crate::progress::PhaseProgress;
use crate::report::{RunAborted, RunReport};
use crate::schema::DesiredState;
use crate::ui;

/// Options for a reconciliation run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Skip the confirmation prompt
    pub yes: bool,
    /// Restrict the run to a target ("users", "groups.Sales", ...)
    pub only: Option<String>,
    /// Parent of the declared OUs; the domain root when absent
    pub base_dn: Option<String>,
    /// Draw progress bars while applying
    pub show_progress: bool,
}

/// Asks the user before writing, unless told to assume yes
pub struct PromptConfirm {
    pub assume_yes: bool,
}

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }

        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .context("Confirmation needs an interactive terminal (use --yes to skip it)")?;
        Ok(confirmed)
    }
}

/// Open the session for a run, hand its directory to `f`, then release it
pub fn with_directory<R>(
    conn: &ConnectionParams,
    f: impl FnOnce(&dyn Directory) -> Result<R>,
) -> Result<R> {
    let session = RemoteSession::open(&conn.domain_controller, &conn.credential, &conn.session)
        .with_context(|| format!("Could not open a session to {}", conn.domain_controller))?;

    let result = f(&PowerShellDirectory::new(&session));

    if let Err(e) = session.close() {
        log::warn!("Could not close session to {}: {e}", conn.domain_controller);
    }
    result
}

/// Reconcile the directory at `conn` with the desired state
pub fn run(
    conn: &ConnectionParams,
    desired: &DesiredState,
    opts: &RunOptions,
) -> Result<RunReport> {
    with_directory(conn, |directory| {
        let target = conn.domain_controller.as_str();
        let mut confirm = PromptConfirm {
            assume_yes: opts.yes,
        };
        if opts.show_progress {
            let mut progress = PhaseProgress::default();
            reconcile(directory, target, desired, opts, &mut progress, &mut confirm)
        } else {
            reconcile(directory, target, desired, opts, &mut NoProgress, &mut confirm)
        }
    })
}

/// Base DN for the declared OUs
fn resolve_base_dn(directory: &dyn Directory, base_dn: Option<&str>) -> Result<String> {
    match base_dn.map(str::trim).filter(|dn| !dn.is_empty()) {
        Some(dn) => Ok(dn.to_string()),
        None => {
            let root = directory
                .root_dn()
                .context("Could not determine the domain's distinguished name")?;
            log::info!("Using domain root {root} as base DN");
            Ok(root)
        }
    }
}

/// Inspect, show the diff, confirm, then apply
///
/// A lost session aborts with an error; once writing has started that
/// error is a [`RunAborted`] holding the partial report. Any other failure
/// is recorded in the report and only affects the resource and its
/// dependents.
pub fn reconcile<P, C>(
    directory: &dyn Directory,
    target: &str,
    desired: &DesiredState,
    opts: &RunOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<RunReport>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let base_dn = resolve_base_dn(directory, opts.base_dn.as_deref())?;
    let plan = build_plan(desired, &base_dn).filter_by_target(opts.only.as_deref());
    log::info!("Inspecting {} resources on {target}", plan.total_resources());

    let inspected = declarative::inspect(plan, directory, &DirectoryFailurePolicy)
        .context("Directory inspection aborted")?;
    display_diff(&inspected.diffs());

    let pending = inspected.pending_changes();
    if pending > 0
        && !opts.dry_run
        && !confirm.confirm(&format!("Apply {pending} changes to {target}?"))?
    {
        ui::warn("Aborted, no changes made");
        return Ok(RunReport::new(target, &base_dn, false, inspected.decline()));
    }

    let exec_opts = ExecuteOptions {
        dry_run: opts.dry_run,
    };
    let report = match declarative::apply(
        inspected,
        directory,
        &exec_opts,
        &DirectoryFailurePolicy,
        progress,
    ) {
        Ok(report) => report,
        Err(e) => {
            return Err(match e.downcast::<Aborted>() {
                Ok(aborted) => RunAborted::new(target, &base_dn, opts.dry_run, aborted).into(),
                Err(e) => e.context("Reconciliation aborted"),
            });
        }
    };

    Ok(RunReport::new(target, &base_dn, opts.dry_run, report))
}

/// Compute what a run would change, without writing
pub fn preview(
    directory: &dyn Directory,
    desired: &DesiredState,
    base_dn: Option<&str>,
    only: Option<&str>,
) -> Result<Vec<ResourceDiff>> {
    let base_dn = resolve_base_dn(directory, base_dn)?;
    let plan = build_plan(desired, &base_dn).filter_by_target(only);
    let inspected = declarative::inspect(plan, directory, &DirectoryFailurePolicy)
        .context("Directory inspection aborted")?;
    Ok(inspected.diffs())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use adkit::{Credential, SessionOptions};
    use anyhow::anyhow;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Connection through an ssh stand-in that logs its arguments
    fn logged_connection(dir: &Path) -> (ConnectionParams, PathBuf) {
        let log = dir.join("ssh.log");
        let program = dir.join("ssh");
        std::fs::write(
            &program,
            format!("#!/bin/sh\necho \"$@\" >> '{}'\nexit 0\n", log.display()),
        )
        .unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

        let conn = ConnectionParams {
            domain_controller: "dc01".to_string(),
            credential: Credential::default(),
            session: SessionOptions {
                ssh_program: program.display().to_string(),
                ..Default::default()
            },
            base_dn: None,
        };
        (conn, log)
    }

    #[test]
    fn test_session_is_released_when_the_run_fails() {
        let dir = TempDir::new().unwrap();
        let (conn, log) = logged_connection(dir.path());

        let result: Result<()> = with_directory(&conn, |_| Err(anyhow!("inputs rejected")));

        assert_eq!(result.unwrap_err().to_string(), "inputs rejected");
        let calls = std::fs::read_to_string(&log).unwrap();
        assert_eq!(calls.matches("-O exit dc01").count(), 1, "{calls}");
    }

    #[test]
    fn test_session_is_released_after_success() {
        let dir = TempDir::new().unwrap();
        let (conn, log) = logged_connection(dir.path());

        let value = with_directory(&conn, |_| Ok(7)).unwrap();

        assert_eq!(value, 7);
        let calls = std::fs::read_to_string(&log).unwrap();
        assert!(calls.lines().last().unwrap().ends_with("-O exit dc01"), "{calls}");
    }
}
