//! Error types for directory operations.
//!
//! Errors are categorized so callers can tell a broken session, which makes
//! every further call pointless, from a per-entity failure such as a naming
//! conflict, which only affects the object being written.

use thiserror::Error;

/// Categories of directory errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transport or directory service unreachable (fatal for the session)
    Connectivity,
    /// Referenced object does not exist
    NotFound,
    /// Naming conflict with an existing object
    Conflict,
    /// Access denied
    Permission,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether this error makes the session unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connectivity)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Connectivity => "Directory unreachable",
            Self::NotFound => "Object not found",
            Self::Conflict => "Naming conflict",
            Self::Permission => "Permission denied",
            Self::Other => "Directory operation failed",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Connectivity => {
                "Check that the domain controller is reachable over SSH and AD Web Services is running"
            }
            Self::NotFound => "Declare the referenced object in the input files or create it first",
            Self::Conflict => "Rename the object or remove the conflicting one, then re-run",
            Self::Permission => "Run with an account allowed to manage the target OU",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur during directory operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Session could not be established or was lost
    #[error("connectivity error: {message}")]
    Connectivity {
        /// Details from the transport
        message: String,
    },

    /// Referenced object does not exist
    #[error("{kind} not found: {name}")]
    NotFound {
        /// Object class ("group", "user", "organizational unit", ...)
        kind: String,
        /// Name that was looked up
        name: String,
    },

    /// An object with this name already exists
    #[error("name conflict for {name}: {message}")]
    Conflict {
        /// Name being created
        name: String,
        /// Directory message
        message: String,
    },

    /// Access denied
    #[error("permission denied: {message}")]
    Permission {
        /// Directory message
        message: String,
    },

    /// A directory command failed for another reason
    #[error("{message}: {stderr}")]
    CommandFailed {
        /// What was attempted
        message: String,
        /// Error output from the directory command
        stderr: String,
    },

    /// Unexpected output from the directory command
    #[error("unexpected directory output: {0}")]
    Parse(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Connectivity { .. } => ErrorCategory::Connectivity,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Conflict { .. } => ErrorCategory::Conflict,
            Error::Permission { .. } => ErrorCategory::Permission,
            _ => ErrorCategory::Other,
        }
    }

    /// Whether this error makes the session unusable.
    pub fn is_fatal(&self) -> bool {
        self.category().is_fatal()
    }

    /// Shorthand for a connectivity error.
    pub fn connectivity(message: impl Into<String>) -> Self {
        Error::Connectivity {
            message: message.into(),
        }
    }

    /// Shorthand for a not-found error.
    pub fn not_found(kind: &str, name: &str) -> Self {
        Error::NotFound {
            kind: kind.to_string(),
            name: name.to_string(),
        }
    }

    /// Create an error from the stderr of a failed directory cmdlet.
    ///
    /// `subject` names the object the command acted on; `kind` its class.
    pub fn from_powershell_output(stderr: &str, kind: &str, subject: &str) -> Self {
        let message = stderr.trim().to_string();
        let lower = message.to_lowercase();

        // Directory service unreachable
        if lower.contains("unable to contact the server")
            || lower.contains("server is not operational")
            || lower.contains("web services running")
            || lower.contains("rpc server is unavailable")
            || lower.contains("connection reset")
            || lower.contains("connection closed")
        {
            return Error::Connectivity { message };
        }

        // Naming conflicts
        if lower.contains("already exists")
            || lower.contains("already in use")
            || lower.contains("name already")
        {
            return Error::Conflict {
                name: subject.to_string(),
                message,
            };
        }

        // Missing objects
        if lower.contains("cannot find an object")
            || lower.contains("directory object not found")
            || lower.contains("no such object")
        {
            return Error::NotFound {
                kind: kind.to_string(),
                name: subject.to_string(),
            };
        }

        if lower.contains("access is denied")
            || lower.contains("insufficient access rights")
            || lower.contains("unauthorizedaccess")
        {
            return Error::Permission { message };
        }

        Error::CommandFailed {
            message: format!("directory command failed for {kind} {subject}"),
            stderr: message,
        }
    }
}

/// Result type for directory operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_connectivity_is_fatal() {
        assert!(ErrorCategory::Connectivity.is_fatal());
        assert!(!ErrorCategory::NotFound.is_fatal());
        assert!(!ErrorCategory::Conflict.is_fatal());
        assert!(!ErrorCategory::Permission.is_fatal());
        assert!(!ErrorCategory::Other.is_fatal());
    }

    #[test]
    fn test_from_output_connectivity() {
        let err = Error::from_powershell_output(
            "Unable to contact the server. This may be because this server does not exist, \
             it is currently down, or it does not have the Active Directory Web Services running.",
            "user",
            "alice",
        );
        assert_eq!(err.category(), ErrorCategory::Connectivity);
        assert!(err.is_fatal());
    }

    #[test]
    fn test_from_output_conflict() {
        let err = Error::from_powershell_output(
            "The operation failed because UPN value provided for addition/modification is not unique forest-wide. The specified account already exists",
            "user",
            "alice",
        );
        assert_eq!(err.category(), ErrorCategory::Conflict);
        assert!(err.to_string().contains("alice"));
    }

    #[test]
    fn test_from_output_not_found() {
        let err = Error::from_powershell_output(
            "Cannot find an object with identity: 'NoSuchGroup' under: 'DC=corp,DC=example'.",
            "group",
            "NoSuchGroup",
        );
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert_eq!(err.to_string(), "group not found: NoSuchGroup");
    }

    #[test]
    fn test_from_output_permission() {
        let err = Error::from_powershell_output("Access is denied", "ou", "Sales");
        assert_eq!(err.category(), ErrorCategory::Permission);
    }

    #[test]
    fn test_from_output_other() {
        let err = Error::from_powershell_output("The parameter is incorrect", "ou", "Sales");
        assert_eq!(err.category(), ErrorCategory::Other);
        assert!(err.to_string().contains("The parameter is incorrect"));
    }
}
