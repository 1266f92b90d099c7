//! Error Handling Infrastructure
//!
//! All errors raised by validators, the gatekeeper, query builders and the
//! database collaborator are expressed as [`GateError`]. The dispatcher is the
//! only place that turns them into caller-visible text.
//!
//! # Error Categories
//! - `Validation`: caller-supplied argument outside its domain
//! - `RejectedStatement`: raw SQL blocked by the gatekeeper
//! - `NotFound`: a fuzzy lookup resolved to nothing
//! - `ConnectionFailed`: the database could not be reached
//! - `QueryFailed`: the server rejected or failed a statement
//! - `ConfigError`: startup configuration is unusable
//! - `Internal`: a defect in this crate (e.g. malformed statement)

use thiserror::Error;

/// Main error type for gateway operations
#[derive(Error, Debug)]
pub enum GateError {
    /// Argument outside its closed domain, or of the wrong JSON type
    #[error("{0}")]
    Validation(String),

    /// Raw SQL refused by the gatekeeper
    #[error("{0}")]
    RejectedStatement(String),

    /// Lookup by fuzzy match produced no rows
    #[error("{0}")]
    NotFound(String),

    /// Database connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Statement execution failed on the server
    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    /// Configuration error (missing or malformed setting)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Programming defect inside this crate
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GateError {
    /// Stable error code, suitable for programmatic handling by agents
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::RejectedStatement(_) => "REJECTED_STATEMENT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::ConnectionFailed(_) => "CONNECTION_FAILED",
            Self::QueryFailed(_) => "QUERY_FAILED",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the message teaches the caller how to fix the request.
    ///
    /// Everything else is an unexpected failure and must not reach the caller
    /// verbatim.
    #[must_use]
    pub const fn is_caller_visible(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::RejectedStatement(_))
    }

    /// Human-readable message
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a rejected-statement error
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::RejectedStatement(message.into())
    }

    /// Create a not-found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a connection failed error
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    /// Create a query failed error
    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed(message.into())
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(GateError::validation("x").error_code(), "VALIDATION_ERROR");
        assert_eq!(GateError::rejected("x").error_code(), "REJECTED_STATEMENT");
        assert_eq!(GateError::not_found("x").error_code(), "NOT_FOUND");
        assert_eq!(GateError::connection_failed("x").error_code(), "CONNECTION_FAILED");
        assert_eq!(GateError::query_failed("x").error_code(), "QUERY_FAILED");
        assert_eq!(GateError::config_error("x").error_code(), "CONFIG_ERROR");
        assert_eq!(GateError::internal("x").error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_caller_visibility() {
        assert!(GateError::validation("bad rating").is_caller_visible());
        assert!(GateError::rejected("DROP").is_caller_visible());
        assert!(!GateError::not_found("no film").is_caller_visible());
        assert!(!GateError::connection_failed("refused").is_caller_visible());
        assert!(!GateError::query_failed("syntax").is_caller_visible());
        assert!(!GateError::internal("placeholder mismatch").is_caller_visible());
    }

    #[test]
    fn test_error_messages() {
        let err = GateError::validation("Invalid rating 'X'");
        assert_eq!(err.message(), "Invalid rating 'X'");

        let err = GateError::connection_failed("timeout");
        assert!(err.message().contains("Connection failed"));
        assert!(err.message().contains("timeout"));
    }
}
