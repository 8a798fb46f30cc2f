//! Sync error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while pulling and delivering CRM data.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("token refresh failed: {0}")]
    Auth(String),

    #[error("CRM request failed: {0}")]
    Api(String),

    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        last_error: String,
    },

    #[error("entity [{0}] not found in the CRM")]
    EntityNotSupported(String),

    #[error("{kind} pagination stalled at the offset ceiling (lower bound {modified_since:?})")]
    PaginationStalled {
        kind: String,
        modified_since: Option<DateTime<Utc>>,
    },

    #[error("association lookup failed: {0}")]
    AssociationLookup(String),

    #[error("sink delivery failed: {0}")]
    Sink(String),

    #[error("tenant store error: {0}")]
    Store(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Returns true if another attempt of the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            SyncError::EntityNotSupported(_)
                | SyncError::Config(_)
                | SyncError::RetriesExhausted { .. }
                | SyncError::PaginationStalled { .. }
        )
    }
}
