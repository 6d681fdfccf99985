//! Error types for playctl
//!
//! All modules use `PlayctlResult<T>` as their return type.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for playctl operations
pub type PlayctlResult<T> = Result<T, PlayctlError>;

/// All errors that can occur in playctl
#[derive(Error, Debug)]
pub enum PlayctlError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Lock errors
    #[error("Timed out after {}s waiting for lock on {package}", waited.as_secs())]
    LockTimeout { package: String, waited: Duration },

    #[error("Lock on {0} is not held by this process")]
    LockNotHeld(String),

    #[error("Invalid package name: {0:?}")]
    InvalidPackageName(String),

    // Edit errors
    #[error("Edit not found: {package}/{handle}")]
    EditNotFound { package: String, handle: String },

    #[error("Invalid edit transition for {handle}: {from} -> {to}")]
    InvalidTransition {
        handle: String,
        from: String,
        to: String,
    },

    // Cache and ledger errors
    #[error("Invalid content hash: {0:?}")]
    InvalidHash(String),

    #[error("Invalid idempotency key: {0:?}")]
    InvalidKey(String),

    // Flow control
    #[error("Operation cancelled")]
    Cancelled,

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl PlayctlError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an edit-not-found error
    pub fn edit_not_found(package: impl Into<String>, handle: impl Into<String>) -> Self {
        Self::EditNotFound {
            package: package.into(),
            handle: handle.into(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }

    /// Check if error is a not-found condition rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::EditNotFound { .. } | Self::PathNotFound(_))
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::LockTimeout { .. } => {
                Some("Another playctl process holds the lock. Inspect it with: playctl lock status <package>")
            }
            Self::EditNotFound { .. } => Some("List known edits with: playctl edit list <package>"),
            Self::ConfigInvalid { .. } => Some("Regenerate defaults with: playctl config init --force"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = PlayctlError::edit_not_found("com.example.app", "rel1");
        assert_eq!(err.to_string(), "Edit not found: com.example.app/rel1");
    }

    #[test]
    fn lock_timeout_display() {
        let err = PlayctlError::LockTimeout {
            package: "com.example.app".to_string(),
            waited: Duration::from_secs(30),
        };
        assert!(err.to_string().contains("30s"));
        assert!(err.to_string().contains("com.example.app"));
    }

    #[test]
    fn error_hint() {
        let err = PlayctlError::edit_not_found("p", "h");
        assert!(err.hint().unwrap().contains("edit list"));
        assert!(PlayctlError::Cancelled.hint().is_none());
    }

    #[test]
    fn error_retryable() {
        let timeout = PlayctlError::LockTimeout {
            package: "p".to_string(),
            waited: Duration::from_secs(1),
        };
        assert!(timeout.is_retryable());
        assert!(!PlayctlError::Cancelled.is_retryable());
    }

    #[test]
    fn not_found_is_distinct_from_io() {
        assert!(PlayctlError::edit_not_found("p", "h").is_not_found());
        let io = PlayctlError::io("reading", std::io::Error::other("disk"));
        assert!(!io.is_not_found());
    }
}
