//! # adkit
//!
//! Active Directory provisioning primitives.
//!
//! This crate provides:
//! - A [`Directory`] trait over the operations reconciliation needs
//! - A PowerShell backend driven through a scoped [`RemoteSession`]
//! - An in-memory backend for tests and dry experiments
//! - Error categorization that separates fatal connectivity failures from
//!   per-object failures
//!
//! ## Example
//!
//! ```no_run
//! use adkit::{Credential, Directory, PowerShellDirectory, RemoteSession, SessionOptions};
//!
//! let session = RemoteSession::open("dc01", &Credential::default(), &SessionOptions::default())
//!     .expect("directory unreachable");
//! let directory = PowerShellDirectory::new(&session);
//!
//! if !directory.ou_exists("Sales").unwrap() {
//!     let root = directory.root_dn().unwrap();
//!     directory.create_ou("Sales", &root).unwrap();
//! }
//! session.close().unwrap();
//! ```

#![warn(missing_docs)]

pub mod backend;
pub mod dn;
pub mod error;
pub mod session;
pub mod types;

pub use backend::{Directory, memory::MemoryDirectory, powershell::PowerShellDirectory};
pub use error::{Error, ErrorCategory, Result};
pub use session::{RemoteSession, ScriptOutput, SessionOptions, Transport};
pub use types::{
    Credential, GroupCategory, GroupScope, GroupType, Operation, ParseGroupTypeError,
};
