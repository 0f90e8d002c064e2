//! Domain-level error types for feeding-tracker.
//!
//! All errors are typed with `thiserror` so the controller can decide which
//! failures are surfaced to the user and which are only logged.

use std::path::PathBuf;
use thiserror::Error;

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// The session store could not be opened or initialized.
    #[error("Session storage unavailable at {path}: {message}")]
    StorageUnavailable { path: PathBuf, message: String },

    /// The process is running without a session store.
    #[error("Session storage is not available; running without persistence")]
    NoStorage,

    /// Failed to read or write the session database.
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A record violates the session invariants.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// The timer was asked to do something its current phase does not allow.
    #[error("Invalid action: {message}")]
    InvalidTransition { message: String },

    /// JSON parsing or serialization failed.
    #[error("JSON error: {message}")]
    JsonParse {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// The remote sync capability rejected a session. Returned by
    /// `RemoteSync` implementations; the built-in local remote never fails.
    #[allow(dead_code)]
    #[error("Sync error: {message}")]
    Sync { message: String },
}

impl AppError {
    /// Create a database error from rusqlite error.
    pub fn database(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Create a JSON parse error.
    pub fn json_parse(err: serde_json::Error) -> Self {
        Self::JsonParse {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Create a transition error.
    pub fn transition(message: impl Into<String>) -> Self {
        Self::InvalidTransition {
            message: message.into(),
        }
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
