//! `validate` - load the CSV inputs and report what they declare

use anyhow::Result;

use crate::Context;
use crate::cli::InputArgs;
use crate::config::{FileConfig, InputParams};
use crate::loader::LoadOptions;
use crate::schema::DesiredState;
use crate::ui;

pub fn run(ctx: &Context, args: &InputArgs) -> Result<()> {
    let file = FileConfig::load(ctx.config.as_deref())?;
    let inputs = InputParams::resolve(args, &file)?;

    let desired = DesiredState::load(
        &inputs.groups,
        &inputs.users,
        &LoadOptions {
            delimiter: inputs.delimiter,
        },
    )?;

    if ctx.quiet {
        return Ok(());
    }

    ui::header("Inputs");
    ui::kv("Groups file", &inputs.groups.display().to_string());
    ui::kv("Users file", &inputs.users.display().to_string());
    println!();
    ui::kv("Organizational units", &desired.ou_names().len().to_string());
    ui::kv("Groups", &desired.groups.len().to_string());
    ui::kv("Users", &desired.users.len().to_string());
    ui::kv("Memberships", &desired.membership_count().to_string());

    let undeclared: Vec<&str> = desired
        .users
        .iter()
        .filter_map(|u| u.member_of.as_deref())
        .filter(|group| !desired.declares_group(group))
        .collect();
    if !undeclared.is_empty() {
        println!();
        ui::warn("Memberships in groups the groups file does not declare:");
        for group in undeclared {
            ui::dim(group);
        }
    }

    println!();
    ui::success("Inputs are valid");
    Ok(())
}
