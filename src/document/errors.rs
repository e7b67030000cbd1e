//! Document error types
//!
//! Three user-visible failure kinds plus the unknown-path case:
//! - cast failures are captured during `set` and deferred to the next
//!   hooked save, never thrown synchronously;
//! - validator failures surface through the validation coordinator;
//! - hook failures abort the pre-hook chain before the wrapped method.

use thiserror::Error;

/// Result type for document operations
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Document lifecycle errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DocumentError {
    /// Raw value could not be converted to the path's declared type
    #[error("cannot cast '{path}': expected {expected}, got {actual}")]
    Cast {
        /// Target path
        path: String,
        /// Declared type name
        expected: String,
        /// Type name of the rejected value
        actual: String,
    },

    /// A validator rejected a value
    #[error("validation failed at '{path}': {message}")]
    Validator {
        /// Validated path
        path: String,
        /// The configured rejection message
        message: String,
    },

    /// A caller-registered pre-hook aborted the chain
    #[error("pre-hook for '{method}' rejected: {message}")]
    Hook {
        /// Hooked method name
        method: String,
        /// Hook-supplied message
        message: String,
    },

    /// Set on a path the schema does not declare
    #[error("unknown path '{0}'")]
    UnknownPath(String),
}

impl DocumentError {
    /// Create a cast error
    pub fn cast(
        path: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Cast {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a validator error
    pub fn validator(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validator {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a hook error
    pub fn hook(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Hook {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Stable error kind for log events
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Cast { .. } => "CAST_ERROR",
            Self::Validator { .. } => "VALIDATOR_ERROR",
            Self::Hook { .. } => "HOOK_ERROR",
            Self::UnknownPath(_) => "UNKNOWN_PATH",
        }
    }
}
