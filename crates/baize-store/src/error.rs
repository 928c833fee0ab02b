//! # Store Error Types
//!
//! Error types for cache and snapshot-store operations.
//!
//! ## Error Flow
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                       Error Propagation                              │
//! │                                                                      │
//! │  SQLite error (sqlx::Error)  ──┐                                     │
//! │                                ├──► StoreError (this module)         │
//! │  Remote put/subscribe failure ─┘         │                           │
//! │                                          ▼                           │
//! │  A failed REMOTE write is logged and local optimistic state stays    │
//! │  authoritative - no rollback, no retry queue; the next debounced     │
//! │  write is the de facto retry. Only CACHE failures surface to the     │
//! │  caller.                                                             │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Cache database could not be opened.
    #[error("Cache connection failed: {0}")]
    ConnectionFailed(String),

    /// Cache schema setup failed.
    #[error("Cache schema setup failed: {0}")]
    SchemaFailed(String),

    /// Cache query failed.
    #[error("Cache query failed: {0}")]
    QueryFailed(String),

    /// Remote snapshot write was rejected.
    #[error("Snapshot write failed for '{collection}': {message}")]
    WriteFailed { collection: String, message: String },

    /// Subscription could not be established.
    #[error("Subscribe failed for '{collection}': {message}")]
    SubscribeFailed { collection: String, message: String },

    /// Snapshot could not be serialized.
    #[error("Snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convert sqlx errors to StoreError.
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed => StoreError::ConnectionFailed("pool is closed".to_string()),
            sqlx::Error::PoolTimedOut => {
                StoreError::ConnectionFailed("pool timed out".to_string())
            }
            other => StoreError::QueryFailed(other.to_string()),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
