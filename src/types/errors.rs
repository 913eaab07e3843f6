//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context. Transport and bridge failures keep their
//! own enums ([`ApiError`], [`BridgeError`]) and fold into [`Error`] via `?`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure talking to the remote platform API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Platform answered 4xx.
    #[error("platform rejected request ({status}): {message}")]
    Client { status: u16, message: String },

    /// Platform answered 5xx or the request never reached it.
    #[error("platform unavailable: {message}")]
    Transient { status: Option<u16>, message: String },

    /// No response within the request timeout.
    #[error("platform request timed out after {0:?}")]
    Timeout(Duration),

    /// 2xx body that is not JSON or does not have the expected shape.
    #[error("invalid platform response: {0}")]
    Parse(String),
}

impl ApiError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Transient { .. })
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Client { status, .. } => Some(*status),
            ApiError::Transient { status, .. } => *status,
            ApiError::Timeout(_) | ApiError::Parse(_) => None,
        }
    }
}

/// Failure running the local ADB executable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Executable missing, non-zero exit, or adb reported a connection failure.
    #[error("adb execution failed: {0}")]
    ExecutionFailed(String),

    #[error("adb did not finish within {0:?}")]
    Timeout(Duration),
}

/// Main error enum for the server.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed startup configuration (fatal).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Tool name not present in the registry.
    #[error("unknown tool: {0}")]
    Schema(String),

    /// Tool arguments failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found on the platform.
    #[error("not found: {0}")]
    NotFound(String),

    /// Resource exists but is not in a usable state.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Platform API failure.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// ADB subprocess failure.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// Internal errors (handler panics, invariant breaks).
    #[error("internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error category reported to the agent host in `{kind, message}` results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Configuration,
    Schema,
    Validation,
    ApiClient,
    ApiTransient,
    NotFound,
    Unavailable,
    Bridge,
    Timeout,
    Parse,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Configuration => "CONFIGURATION",
            ErrorKind::Schema => "SCHEMA",
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::ApiClient => "API_CLIENT",
            ErrorKind::ApiTransient => "API_TRANSIENT",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Unavailable => "UNAVAILABLE",
            ErrorKind::Bridge => "BRIDGE",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::Parse => "PARSE",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Classify into the public error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::Schema(_) => ErrorKind::Schema,
            Error::Validation(_) => ErrorKind::Validation,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Unavailable(_) => ErrorKind::Unavailable,
            Error::Api(ApiError::Client { .. }) => ErrorKind::ApiClient,
            Error::Api(ApiError::Transient { .. }) => ErrorKind::ApiTransient,
            Error::Api(ApiError::Timeout(_)) => ErrorKind::Timeout,
            Error::Api(ApiError::Parse(_)) => ErrorKind::Parse,
            Error::Bridge(BridgeError::ExecutionFailed(_)) => ErrorKind::Bridge,
            Error::Bridge(BridgeError::Timeout(_)) => ErrorKind::Timeout,
            Error::Internal(_) | Error::Serialization(_) | Error::Io(_) => ErrorKind::Internal,
        }
    }

    /// Map a platform 404 to [`Error::NotFound`], passing every other error through.
    pub fn not_found_on_404(err: ApiError, what: impl FnOnce() -> String) -> Self {
        match err {
            ApiError::Client { status: 404, .. } => Error::NotFound(what()),
            other => Error::Api(other),
        }
    }
}

// Convenience constructors
impl Error {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
