use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "adsync")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Converge Active Directory OUs, groups, users and memberships from CSV", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ~/.config/adsync/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Converge the directory to the CSV desired state
    Apply(ApplyArgs),

    /// Show what apply would change (reads only)
    Diff(DiffArgs),

    /// Load and validate the CSV inputs without contacting a directory
    Validate(InputArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Shared arguments
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Users CSV (UserName, OUName, MemberOf)
    #[arg(long, env = "ADSYNC_USERS", value_name = "FILE")]
    pub users: Option<PathBuf>,

    /// Groups CSV (GroupName, OUName, Type)
    #[arg(long, env = "ADSYNC_GROUPS", value_name = "FILE")]
    pub groups: Option<PathBuf>,

    /// Field delimiter of both files (default: ,)
    #[arg(long, value_name = "CHAR")]
    pub delimiter: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Domain controller to run against (localhost for a local session)
    #[arg(long, env = "ADSYNC_DC", value_name = "HOST")]
    pub dc: Option<String>,

    /// Remote account name
    #[arg(long, value_name = "NAME")]
    pub user: Option<String>,

    /// Private key for the remote account
    #[arg(long, value_name = "FILE")]
    pub identity: Option<PathBuf>,

    /// ssh port
    #[arg(long)]
    pub port: Option<u16>,

    /// Parent DN of the declared OUs (default: domain root)
    #[arg(long, value_name = "DN")]
    pub base_dn: Option<String>,

    /// Seconds to wait for the connection
    #[arg(long, value_name = "SECS")]
    pub connect_timeout: Option<u64>,
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Dry run - show what would be done
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Apply without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Only this target: ous, groups, users, memberships, or type.name
    #[arg(long, value_name = "TARGET")]
    pub only: Option<String>,

    /// Write the run report as JSON
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

#[derive(Args)]
pub struct DiffArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Only this target: ous, groups, users, memberships, or type.name
    #[arg(long, value_name = "TARGET")]
    pub only: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from([
            "adsync",
            "-vv",
            "apply",
            "--users",
            "users.csv",
            "--groups",
            "groups.csv",
            "--dc",
            "dc01",
            "--dry-run",
            "--only",
            "users",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Apply(args) => {
                assert!(args.dry_run);
                assert!(!args.yes);
                assert_eq!(args.only.as_deref(), Some("users"));
                assert_eq!(args.connection.dc.as_deref(), Some("dc01"));
                assert_eq!(args.input.users, Some(PathBuf::from("users.csv")));
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn test_parse_validate() {
        let cli =
            Cli::try_parse_from(["adsync", "validate", "--delimiter", ";", "--quiet"]).unwrap();
        assert!(cli.quiet);
        assert!(matches!(cli.command, Command::Validate(_)));
    }
}
