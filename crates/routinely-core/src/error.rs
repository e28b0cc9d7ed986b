//! Core error types for routinely-core.
//!
//! This module defines the error hierarchy using thiserror. Session-level
//! failures (`SessionError`) are kept apart from the storage collaborators'
//! failures so a caller can tell "the routine was unusable" from "the
//! completion could not be written".

use std::path::PathBuf;
use thiserror::Error;

use crate::session::CompletionRecord;

/// Core error type for routinely-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Session engine errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Routine source errors
    #[error("Routine source error: {0}")]
    Source(#[from] SourceError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by a [`RoutineSession`](crate::session::RoutineSession).
///
/// Out-of-range navigation is never an error; `advance` and `retreat` are
/// total and simply report a no-op.
#[derive(Error, Debug)]
pub enum SessionError {
    /// A session cannot be built from an empty step list.
    #[error("routine '{routine_id}' has no steps")]
    InvalidRoutine { routine_id: String },

    /// The completion sink rejected the record. The session is still
    /// complete; `record` is handed back so the caller can retry.
    #[error("failed to persist completion of routine '{routine_id}': {source}")]
    CompletionPersistFailed {
        routine_id: String,
        record: Box<CompletionRecord>,
        #[source]
        source: SinkError,
    },
}

/// Failure reported by a [`CompletionSink`](crate::storage::CompletionSink).
#[derive(Error, Debug)]
pub enum SinkError {
    /// The backing store could not be reached at all.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Failure reported by a [`RoutineSource`](crate::storage::RoutineSource).
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("routine not found: {0}")]
    NotFound(String),

    #[error("invalid routine definition: {0}")]
    Invalid(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Could not resolve the data directory
    #[error("Cannot resolve data directory: {0}")]
    DataDir(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseBusy
                    || inner.code == rusqlite::ErrorCode::DatabaseLocked
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for SinkError {
    fn from(err: rusqlite::Error) -> Self {
        SinkError::Database(err.into())
    }
}

impl From<rusqlite::Error> for SourceError {
    fn from(err: rusqlite::Error) -> Self {
        SourceError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
