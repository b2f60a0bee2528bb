//! Error types used throughout the title engine.
//!
//! Follows the layered pattern used elsewhere in the portal: one thiserror
//! enum per subsystem with string payloads, a `Result` alias, and a severity
//! classification consumed by logging call sites. Sanitization findings are
//! deliberately *not* errors; they travel inside
//! [`SanitizationResult`](crate::sanitize::SanitizationResult) as issues.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for title engine operations.
pub type TitleResult<T> = std::result::Result<T, TitleError>;

/// Main error type for the title engine.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum TitleError {
    /// Invalid engine or component configuration.
    #[error("Configuration error in field '{field}': {message}")]
    Config { field: String, message: String },

    /// Input failed a validation pass the caller chose to enforce.
    #[error("Validation error for '{field}': {message}")]
    Validation { field: String, message: String },

    /// Route registration or pattern compilation failure.
    #[error("Route error: {0}")]
    Route(String),

    /// The compatibility writer exhausted every candidate strategy.
    #[error("Title write failed after {attempts} attempt(s): {message}")]
    WriteFailed { attempts: usize, message: String },

    /// Invariant violations that indicate a bug rather than bad input.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Severity levels for monitoring and log-level selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorSeverity {
    /// Informational, expected conditions.
    Info,
    /// Degraded but operational (e.g. a stale visible title).
    Warning,
    /// Failure requiring attention.
    Error,
    /// Invariant violations.
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl TitleError {
    /// Create a configuration error for a specific field.
    pub fn config_field<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Config { field: field.into(), message: message.into() }
    }

    /// Create a validation error for a specific field.
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    /// Create a route error.
    pub fn route<M: Into<String>>(message: M) -> Self {
        Self::Route(message.into())
    }

    /// Create an internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal(message.into())
    }

    /// Severity of this error for logging and alerting.
    ///
    /// Write failures are `Warning`: the in-memory state stays correct,
    /// only the visible title may be stale.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Config { .. } | Self::Validation { .. } | Self::Route(_) => ErrorSeverity::Error,
            Self::WriteFailed { .. } => ErrorSeverity::Warning,
            Self::Internal(_) => ErrorSeverity::Critical,
        }
    }

    /// Whether the operation can continue with degraded behavior.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::WriteFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_failures_are_recoverable_warnings() {
        let err = TitleError::WriteFailed { attempts: 3, message: "no strategy succeeded".into() };
        assert_eq!(err.severity(), ErrorSeverity::Warning);
        assert!(err.is_recoverable());
    }

    #[test]
    fn config_errors_name_the_field() {
        let err = TitleError::config_field("max_length", "must be at least 1");
        assert!(err.to_string().contains("max_length"));
        assert_eq!(err.severity(), ErrorSeverity::Error);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn severity_orders_from_info_to_critical() {
        assert!(ErrorSeverity::Info < ErrorSeverity::Warning);
        assert!(ErrorSeverity::Warning < ErrorSeverity::Error);
        assert!(ErrorSeverity::Error < ErrorSeverity::Critical);
    }
}
