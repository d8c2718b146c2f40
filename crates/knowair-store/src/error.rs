//! Error types for knowair-store.

use std::path::PathBuf;

use time::OffsetDateTime;

/// Result type for knowair-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in knowair-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Device not found in database.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// A reading with the same device and timestamp is already stored.
    #[error("Duplicate reading for {device_id} at {timestamp}")]
    DuplicateReading {
        device_id: String,
        timestamp: OffsetDateTime,
    },

    /// Classification failed before anything was written.
    #[error("Classification failed: {0}")]
    Classification(#[from] knowair_core::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if the same operation may succeed when retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Classification(e) => e.is_retryable(),
            Error::Database(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}
