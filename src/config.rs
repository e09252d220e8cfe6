//! Configuration - optional TOML file merged with command-line values

use adkit::{Credential, SessionOptions};
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::{ConnectionArgs, InputArgs};

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("adsync"))
}

/// Settings read from `config.toml`; every key is optional
#[derive(Debug, Default, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub domain_controller: Option<String>,
    pub user: Option<String>,
    pub identity_file: Option<String>,
    pub port: Option<u16>,
    /// Seconds to wait for the connection
    pub connect_timeout: Option<u64>,
    pub base_dn: Option<String>,
    pub delimiter: Option<String>,
    pub users_file: Option<String>,
    pub groups_file: Option<String>,
}

impl FileConfig {
    /// Load an explicit config file, or the default one if it exists
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => {
                let path = config_dir()?.join("config.toml");
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    log::debug!("No config file at {}", path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load and parse a config file that must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Where the desired state comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputParams {
    pub users: PathBuf,
    pub groups: PathBuf,
    pub delimiter: u8,
}

impl InputParams {
    /// Merge the input arguments over the file config
    pub fn resolve(args: &InputArgs, file: &FileConfig) -> Result<Self> {
        let users = args
            .users
            .clone()
            .or_else(|| file.users_file.as_deref().map(expand_path))
            .context("No users file given (use --users, ADSYNC_USERS or users_file)")?;
        let groups = args
            .groups
            .clone()
            .or_else(|| file.groups_file.as_deref().map(expand_path))
            .context("No groups file given (use --groups, ADSYNC_GROUPS or groups_file)")?;
        let delimiter = match args.delimiter.as_deref().or(file.delimiter.as_deref()) {
            Some(value) => parse_delimiter(value)?,
            None => b',',
        };

        Ok(Self {
            users,
            groups,
            delimiter,
        })
    }
}

/// How to reach the directory
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    pub domain_controller: String,
    pub credential: Credential,
    pub session: SessionOptions,
    pub base_dn: Option<String>,
}

impl ConnectionParams {
    /// Merge the connection arguments over the file config
    pub fn resolve(args: &ConnectionArgs, file: &FileConfig) -> Result<Self> {
        let domain_controller = args
            .dc
            .clone()
            .or_else(|| file.domain_controller.clone())
            .map(|dc| dc.trim().to_string())
            .filter(|dc| !dc.is_empty())
            .context("No domain controller given (use --dc, ADSYNC_DC or domain_controller)")?;

        let credential = Credential {
            user: args.user.clone().or_else(|| file.user.clone()),
            identity_file: args
                .identity
                .clone()
                .or_else(|| file.identity_file.as_deref().map(expand_path)),
        };

        let defaults = SessionOptions::default();
        let session = SessionOptions {
            port: args.port.or(file.port),
            connect_timeout: args
                .connect_timeout
                .or(file.connect_timeout)
                .unwrap_or(defaults.connect_timeout),
            ..defaults
        };

        Ok(Self {
            domain_controller,
            credential,
            session,
            base_dn: args.base_dn.clone().or_else(|| file.base_dn.clone()),
        })
    }
}

/// Expand `~` in a configured path
fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Parse a single-character CSV delimiter ("\t" is accepted for tab)
pub fn parse_delimiter(value: &str) -> Result<u8> {
    let value = if value == "\\t" { "\t" } else { value };
    match value.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ => bail!("Delimiter must be a single ASCII character, got '{value}'"),
    }
}
