//! Root error type for the revocation backend.
//!
//! Every subsystem error converts into `RevocError` via `#[from]`, so
//! callers outside a module's own crate boundary only ever need to match
//! on one enum.

use thiserror::Error;

use crate::ca::CaError;
use crate::smt::SmtError;

/// Root error type for the revocation backend.
#[derive(Debug, Error)]
pub enum RevocError {
    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Logging errors
    #[error("logging error: {0}")]
    Logging(#[from] crate::logging::LoggingError),

    /// SMT-level errors (duplicate leaves, malformed paths)
    #[error("smt error: {0}")]
    Smt(#[from] SmtError),

    /// CA-level errors (unknown partition, missing node)
    #[error("ca error: {0}")]
    Ca(#[from] CaError),

    /// Snapshot persistence errors
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal errors that don't fit another category
    #[error("internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RevocError {
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this is a retryable error (i.e. worth a repair attempt
    /// rather than surfacing to the caller immediately).
    pub fn is_retryable(&self) -> bool {
        matches!(self, RevocError::Persistence(_) | RevocError::Io(_))
    }

    /// Error code for structured log events / CLI exit reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            RevocError::Config(_) => "CONFIG_ERROR",
            RevocError::Logging(_) => "LOGGING_ERROR",
            RevocError::Smt(_) => "SMT_ERROR",
            RevocError::Ca(_) => "CA_ERROR",
            RevocError::Persistence(_) => "PERSISTENCE_ERROR",
            RevocError::Internal(_) => "INTERNAL_ERROR",
            RevocError::Io(_) => "IO_ERROR",
        }
    }
}

/// Result type alias using `RevocError`
pub type Result<T> = std::result::Result<T, RevocError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_error_carries_message() {
        let err = RevocError::internal("bad state");
        assert!(err.to_string().contains("bad state"));
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn persistence_errors_are_retryable() {
        assert!(RevocError::persistence("disk full").is_retryable());
        assert!(!RevocError::internal("logic bug").is_retryable());
    }
}
