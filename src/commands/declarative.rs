//! Declarative commands
//!
//! - `apply` - Make the directory match the CSV inputs
//! - `diff` - Preview what apply would change

use anyhow::{Context as AnyhowContext, Result, bail};
use declarative::DiffSummary;
use std::path::Path;

use crate::Context;
use crate::cli::{ApplyArgs, ConnectionArgs, DiffArgs, InputArgs};
use crate::config::{ConnectionParams, FileConfig, InputParams};
use crate::engine::{self, RunOptions};
use crate::loader::LoadOptions;
use crate::report::{RunAborted, RunReport};
use crate::schema::DesiredState;
use crate::ui;

/// Resolve everything a directory command needs before touching the network
fn prepare(
    ctx: &Context,
    input: &InputArgs,
    connection: &ConnectionArgs,
    only: Option<&str>,
) -> Result<(DesiredState, ConnectionParams)> {
    let file = FileConfig::load(ctx.config.as_deref())?;
    let inputs = InputParams::resolve(input, &file)?;
    let conn = ConnectionParams::resolve(connection, &file)?;
    if let Some(target) = only {
        engine::validate_target(target)?;
    }

    let desired = DesiredState::load(
        &inputs.groups,
        &inputs.users,
        &LoadOptions {
            delimiter: inputs.delimiter,
        },
    )?;
    Ok((desired, conn))
}

fn print_target(conn: &ConnectionParams) {
    ui::kv("Domain controller", &conn.domain_controller);
    if let Some(user) = &conn.credential.user {
        ui::kv("Account", user);
    }
    if let Some(base_dn) = &conn.base_dn {
        ui::kv("Base DN", &ui::truncate_dn(base_dn, 60));
    }
}

/// Print the report and save it when asked to
fn publish(ctx: &Context, report: &RunReport, path: Option<&Path>) -> Result<()> {
    if !ctx.quiet {
        report.print();
    }
    if let Some(path) = path {
        report
            .write_json(path)
            .with_context(|| format!("Could not save report to {}", path.display()))?;
        ui::dim(&format!("Report saved to {}", path.display()));
    }
    Ok(())
}

pub fn apply(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let (desired, conn) = prepare(ctx, &args.input, &args.connection, args.only.as_deref())?;

    ui::header("Applying Directory State");
    print_target(&conn);
    if args.dry_run {
        ui::warn("Dry run - no changes will be made");
    }
    if desired.is_empty() {
        ui::info("Inputs declare nothing, nothing to do");
        return Ok(());
    }

    let opts = RunOptions {
        dry_run: args.dry_run,
        yes: args.yes,
        only: args.only,
        base_dn: conn.base_dn.clone(),
        show_progress: !ctx.quiet && ctx.verbose == 0,
    };
    let report = match engine::run(&conn, &desired, &opts) {
        Ok(report) => report,
        Err(e) => {
            if let Some(aborted) = e.downcast_ref::<RunAborted>() {
                publish(ctx, &aborted.report, args.report.as_deref())?;
            }
            return Err(e);
        }
    };
    publish(ctx, &report, args.report.as_deref())?;

    if !report.is_success() {
        bail!(
            "{} of {} operations failed",
            report.summary.failed,
            report.summary.total()
        );
    }
    Ok(())
}

pub fn diff(ctx: &Context, args: DiffArgs) -> Result<()> {
    let (desired, conn) = prepare(ctx, &args.input, &args.connection, args.only.as_deref())?;

    ui::header("Directory Diff");
    print_target(&conn);

    let base_dn = conn.base_dn.clone();
    let diffs = engine::with_directory(&conn, |directory| {
        engine::preview(directory, &desired, base_dn.as_deref(), args.only.as_deref())
    })?;
    engine::display_diff(&diffs);

    let summary = DiffSummary::from_diffs(&diffs);
    if summary.unknown > 0 {
        ui::warn(&format!(
            "{} entries could not be read and would fail on apply",
            summary.unknown
        ));
    }
    Ok(())
}
