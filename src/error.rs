//! Error types for the gateway.
//!
//! Defines the error enum shared by the session core and the HTTP boundary.

use thiserror::Error;

/// Main error type for gateway operations.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// A required field was missing or empty.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The presented token is malformed, unsigned, or expired.
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// No live session is registered under the identifier.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// The upstream database connection could not be established.
    #[error("Connection error: {0}")]
    ConnectionFailure(String),

    /// The upstream database rejected a statement.
    #[error("Query error: {0}")]
    QueryFailure(String),

    /// An export was requested for a result without rows.
    #[error("No data to export")]
    NoData,

    /// Configuration errors (invalid config file, missing secret, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors (encoder failures, unexpected states, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Creates an invalid-argument error with the given message.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Creates an invalid-credential error with the given message.
    pub fn invalid_credential(msg: impl Into<String>) -> Self {
        Self::InvalidCredential(msg.into())
    }

    /// Creates a session-not-found error for the given identifier.
    pub fn session_not_found(id: impl ToString) -> Self {
        Self::SessionNotFound(id.to_string())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionFailure(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryFailure(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "Invalid Argument",
            Self::InvalidCredential(_) => "Invalid Credential",
            Self::SessionNotFound(_) => "Session Not Found",
            Self::ConnectionFailure(_) => "Connection Error",
            Self::QueryFailure(_) => "Query Error",
            Self::NoData => "No Data",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using GatewayError.
pub type Result<T> = std::result::Result<T, GatewayError>;
