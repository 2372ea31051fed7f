// error.rs — Error types for the gatekeeper subsystem.
//
// Every failure carries an `ErrorCategory`, the short token a reporter
// prints in front of the message ("ImportError: ..."). Libraries only
// return these values; deciding to terminate belongs to the binary.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The category token shown to users in front of a diagnostic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed configuration (inputs that are not lists of strings).
    TypeError,
    /// The gatekeeper was requested before a policy was registered.
    RuntimeError,
    /// A restricted identifier failed provenance validation.
    ImportError,
    /// No finder in the pipeline could resolve the identifier.
    ModuleNotFoundError,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::TypeError => "TypeError",
            ErrorCategory::RuntimeError => "RuntimeError",
            ErrorCategory::ImportError => "ImportError",
            ErrorCategory::ModuleNotFoundError => "ModuleNotFoundError",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while configuring or enforcing an access policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The policy file does not describe two lists of strings.
    #[error("invalid policy configuration in {path}: {reason}")]
    InvalidConfig { path: PathBuf, reason: String },

    /// No access policy has been registered yet.
    #[error("use the policy-registration method to set the library specifications!")]
    MissingPolicy,

    /// A restricted identifier was requested from an untrusted call chain.
    #[error("{identifier} cannot be imported. This module path is restricted to user.")]
    Denied { identifier: String },

    /// Nothing in the resolution pipeline knows this identifier.
    #[error("no module named '{identifier}'")]
    NotFound { identifier: String },

    /// Reading or writing a policy file failed.
    #[error("failed to access policy file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl PolicyError {
    /// The category a reporter prints for this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            PolicyError::InvalidConfig { .. } => ErrorCategory::TypeError,
            PolicyError::MissingPolicy | PolicyError::Io { .. } => ErrorCategory::RuntimeError,
            PolicyError::Denied { .. } => ErrorCategory::ImportError,
            PolicyError::NotFound { .. } => ErrorCategory::ModuleNotFoundError,
        }
    }

    /// True for a provenance denial.
    pub fn is_denial(&self) -> bool {
        matches!(self, PolicyError::Denied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denial_message_names_identifier() {
        let err = PolicyError::Denied {
            identifier: "secretlib".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::ImportError);
        assert_eq!(
            err.to_string(),
            "secretlib cannot be imported. This module path is restricted to user."
        );
        assert!(err.is_denial());
    }

    #[test]
    fn missing_policy_is_runtime_error() {
        let err = PolicyError::MissingPolicy;
        assert_eq!(err.category(), ErrorCategory::RuntimeError);
        assert_eq!(
            err.to_string(),
            "use the policy-registration method to set the library specifications!"
        );
        assert!(!err.is_denial());
    }

    #[test]
    fn category_display_matches_token() {
        assert_eq!(ErrorCategory::TypeError.to_string(), "TypeError");
        assert_eq!(
            ErrorCategory::ModuleNotFoundError.to_string(),
            "ModuleNotFoundError"
        );
    }
}
