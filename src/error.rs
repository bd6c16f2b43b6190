//! Error taxonomy for the harvester and migration subsystems.
//!
//! Per-unit failures (one page, one record) are recoverable by policy: the
//! loops log them and move on. The only fatal condition is failing to open
//! the store before a run starts.

use thiserror::Error;

/// Failure to retrieve a listing page or an item's metadata.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
}

/// Failure talking to the SQLite store.
///
/// `Duplicate` is a distinguished variant because re-inserting a URL that a
/// previous run already recorded is an expected outcome, not a fault.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key")]
    Duplicate,

    #[error("store connection failed: {0}")]
    Connection(sqlx::Error),

    #[error("store operation failed: {0}")]
    Other(sqlx::Error),

    #[error("document serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        // Migrations run while opening the store, so a failure there means
        // the store never became usable.
        StoreError::Connection(err.into())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Connection(err)
            }
            _ => StoreError::Other(err),
        }
    }
}

/// Failure writing the flat-file URL sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("output file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("output serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
