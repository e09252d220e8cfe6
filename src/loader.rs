//! Desired-state loader.
//!
//! Reads the groups and users CSV files into a [`DesiredState`]. Loading is
//! all-or-nothing: the first malformed row or duplicate key aborts it.

use crate::schema::{DesiredState, GroupRecord, UserRecord};
use adkit::GroupType;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

const GROUP_COLUMNS: [&str; 3] = ["GroupName", "OUName", "Type"];
const USER_COLUMNS: [&str; 3] = ["UserName", "OUName", "MemberOf"];

/// Errors raised while loading the inputs.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}:{line}: {message}", path.display())]
    MalformedInput {
        path: PathBuf,
        line: u64,
        message: String,
    },

    #[error("{}:{line}: duplicate {column} '{key}' (first defined on line {first_line})", path.display())]
    DuplicateKey {
        path: PathBuf,
        column: &'static str,
        key: String,
        first_line: u64,
        line: u64,
    },
}

/// How the input files are read.
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub delimiter: u8,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

/// A data row with its cells in column order.
struct Row {
    line: u64,
    cells: Vec<String>,
}

impl Row {
    fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map_or("", String::as_str)
    }
}

/// Tracks keys seen so far, case-insensitively.
struct KeyChecker<'a> {
    path: &'a Path,
    column: &'static str,
    seen: HashMap<String, u64>,
}

impl<'a> KeyChecker<'a> {
    fn new(path: &'a Path, column: &'static str) -> Self {
        Self {
            path,
            column,
            seen: HashMap::new(),
        }
    }

    fn check_and_insert(&mut self, key: &str, line: u64) -> Result<(), LoadError> {
        if let Some(&first_line) = self.seen.get(&key.to_lowercase()) {
            return Err(LoadError::DuplicateKey {
                path: self.path.to_path_buf(),
                column: self.column,
                key: key.to_string(),
                first_line,
                line,
            });
        }
        self.seen.insert(key.to_lowercase(), line);
        Ok(())
    }
}

fn strip_utf8_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(UTF8_BOM).unwrap_or(data)
}

fn malformed(path: &Path, line: u64, message: impl Into<String>) -> LoadError {
    LoadError::MalformedInput {
        path: path.to_path_buf(),
        line,
        message: message.into(),
    }
}

/// Read a CSV file, keeping only `columns` (matched case-insensitively).
fn read_rows(path: &Path, opts: &LoadOptions, columns: &[&str]) -> Result<Vec<Row>, LoadError> {
    let data = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let csv_error = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(opts.delimiter)
        .from_reader(strip_utf8_bom(&data));

    let headers = reader.headers().map_err(csv_error)?.clone();
    let indexes = columns
        .iter()
        .map(|column| {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(column))
                .ok_or_else(|| malformed(path, 1, format!("missing required column '{column}'")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(csv_error)?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = record.position().map_or(0, csv::Position::line);
        let cells = indexes
            .iter()
            .map(|&i| record.get(i).unwrap_or_default().to_string())
            .collect();
        rows.push(Row { line, cells });
    }

    log::debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Require a non-empty cell.
fn required(path: &Path, row: &Row, index: usize, column: &str) -> Result<String, LoadError> {
    let value = row.cell(index);
    if value.is_empty() {
        return Err(malformed(path, row.line, format!("empty {column}")));
    }
    Ok(value.to_string())
}

/// OU name from its cell, accepting a bare "OU=Name" RDN.
fn ou_name(path: &Path, row: &Row, index: usize) -> Result<String, LoadError> {
    let value = required(path, row, index, "OUName")?;
    let name = match value.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("OU=") && !value.contains(',') => {
            value[3..].trim().to_string()
        }
        _ => value,
    };
    if name.is_empty() {
        return Err(malformed(path, row.line, "empty OUName"));
    }
    Ok(name)
}

/// Load the groups file (`GroupName, OUName, Type`).
pub fn load_groups(path: &Path, opts: &LoadOptions) -> Result<Vec<GroupRecord>, LoadError> {
    let mut keys = KeyChecker::new(path, "GroupName");
    let mut groups = Vec::new();

    for row in read_rows(path, opts, &GROUP_COLUMNS)? {
        let name = required(path, &row, 0, "GroupName")?;
        let ou = ou_name(path, &row, 1)?;
        let group_type: GroupType = row
            .cell(2)
            .parse()
            .map_err(|e: adkit::ParseGroupTypeError| malformed(path, row.line, e.to_string()))?;
        keys.check_and_insert(&name, row.line)?;

        groups.push(GroupRecord {
            name,
            ou,
            group_type,
            line: row.line,
        });
    }

    Ok(groups)
}

/// Load the users file (`UserName, OUName, MemberOf`).
pub fn load_users(path: &Path, opts: &LoadOptions) -> Result<Vec<UserRecord>, LoadError> {
    let mut keys = KeyChecker::new(path, "UserName");
    let mut users = Vec::new();

    for row in read_rows(path, opts, &USER_COLUMNS)? {
        let name = required(path, &row, 0, "UserName")?;
        let ou = ou_name(path, &row, 1)?;
        let member_of = Some(row.cell(2))
            .filter(|g| !g.is_empty())
            .map(String::from);
        keys.check_and_insert(&name, row.line)?;

        users.push(UserRecord {
            name,
            ou,
            member_of,
            line: row.line,
        });
    }

    Ok(users)
}

impl DesiredState {
    /// Load both inputs.
    pub fn load(groups: &Path, users: &Path, opts: &LoadOptions) -> Result<Self, LoadError> {
        let state = Self {
            groups: load_groups(groups, opts)?,
            users: load_users(users, opts)?,
        };
        log::info!(
            "Loaded {} groups and {} users ({} OUs)",
            state.groups.len(),
            state.users.len(),
            state.ou_names().len()
        );
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adkit::{GroupCategory, GroupScope};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_groups() {
        let file = csv_file(
            "GroupName,OUName,Type\n\
             Sales,Sales,Security\n\
             Newsletter, Marketing ,Universal Distribution\n",
        );
        let groups = load_groups(file.path(), &LoadOptions::default()).unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "Sales");
        assert_eq!(groups[0].group_type, GroupType::security());
        assert_eq!(groups[0].line, 2);
        assert_eq!(groups[1].ou, "Marketing");
        assert_eq!(
            groups[1].group_type,
            GroupType::new(GroupCategory::Distribution, GroupScope::Universal)
        );
    }

    #[test]
    fn test_load_users_with_empty_member_of() {
        let file = csv_file(
            "UserName,OUName,MemberOf\n\
             alice,Sales,Sales\n\
             bob,Missing,\n",
        );
        let users = load_users(file.path(), &LoadOptions::default()).unwrap();

        assert_eq!(users[0].member_of.as_deref(), Some("Sales"));
        assert_eq!(users[1].member_of, None);
        assert_eq!(users[1].line, 3);
    }

    #[test]
    fn test_headers_case_insensitive_with_bom_and_extra_columns() {
        let file = csv_file(
            "\u{feff}username,Email,ouname,memberof\n\
             alice,alice@corp.example,Sales,Sales\n",
        );
        let users = load_users(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].ou, "Sales");
    }

    #[test]
    fn test_blank_lines_skipped() {
        let file = csv_file("UserName,OUName,MemberOf\n\nalice,Sales,\n,,\n");
        let users = load_users(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(users.len(), 1);
    }

    #[test]
    fn test_custom_delimiter() {
        let file = csv_file("GroupName;OUName;Type\nSales;Sales;Security-Global\n");
        let groups = load_groups(file.path(), &LoadOptions { delimiter: b';' }).unwrap();
        assert_eq!(groups[0].group_type, GroupType::security());
    }

    #[test]
    fn test_ou_rdn_prefix_accepted() {
        let file = csv_file("GroupName,OUName,Type\nSales,OU=Sales,Security\n");
        let groups = load_groups(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(groups[0].ou, "Sales");
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let file = csv_file(
            "UserName,OUName,MemberOf\n\
             alice,Sales,\n\
             bob,Sales,\n\
             Alice,Ops,\n",
        );
        let err = load_users(file.path(), &LoadOptions::default()).unwrap_err();
        match err {
            LoadError::DuplicateKey {
                key,
                first_line,
                line,
                ..
            } => {
                assert_eq!(key, "Alice");
                assert_eq!(first_line, 2);
                assert_eq!(line, 4);
            }
            other => panic!("expected duplicate key, got {other}"),
        }
    }

    #[test]
    fn test_missing_column_rejected() {
        let file = csv_file("GroupName,Type\nSales,Security\n");
        let err = load_groups(file.path(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::MalformedInput { line: 1, .. }));
        assert!(err.to_string().contains("OUName"));
    }

    #[test]
    fn test_empty_key_rejected() {
        let file = csv_file("UserName,OUName,MemberOf\n,Sales,Sales\n");
        let err = load_users(file.path(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::MalformedInput { line: 2, .. }));
    }

    #[test]
    fn test_invalid_group_type_rejected() {
        let file = csv_file("GroupName,OUName,Type\nSales,Sales,Security\nOps,Ops,Mailbox\n");
        let err = load_groups(file.path(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::MalformedInput { line: 3, .. }));
        assert!(err.to_string().contains("Mailbox"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_groups(Path::new("/nonexistent/groups.csv"), &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_load_desired_state() {
        let groups = csv_file("GroupName,OUName,Type\nSales,Sales,Security\n");
        let users = csv_file("UserName,OUName,MemberOf\nAlice,Sales,Sales\n");
        let state =
            DesiredState::load(groups.path(), users.path(), &LoadOptions::default()).unwrap();
        assert_eq!(state.ou_names(), vec!["Sales"]);
        assert_eq!(state.membership_count(), 1);
    }
}
