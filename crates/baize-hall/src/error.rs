//! # API Error Type
//!
//! Unified error type for hall commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Baize POS                           │
//! │                                                                      │
//! │  Command Function                                                    │
//! │  Result<T, ApiError>                                                 │
//! │       │                                                              │
//! │       ├── ValidationError ──► VALIDATION_ERROR, message verbatim     │
//! │       ├── CoreError ───────► mapped per variant                      │
//! │       ├── StoreError ──────► STORE_ERROR, generic message (real      │
//! │       │                      error goes to the log, not the UI)      │
//! │       └── NotAuthorized ───► never reaches the frontend: commands    │
//! │                              swallow it into a logged no-op          │
//! │                                                                      │
//! │  Frontend receives { "code": "...", "message": "..." }               │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

use baize_core::CoreError;
use baize_store::StoreError;

/// API error returned from hall commands.
///
/// ## Serialization
/// What the dashboard receives when a command fails:
/// ```json
/// {
///   "code": "VALIDATION_ERROR",
///   "message": "Session already open for player 'Bat'"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Business rule violation (duplicate session, pending-request misuse)
    BusinessLogic,

    /// Credit selected below its eligibility floor
    CreditNotEligible,

    /// Settlement amount invalid or no debt outstanding
    SettlementError,

    /// Cache/store failure
    StoreError,

    /// Internal error
    Internal,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::SessionNotFound(id) => ApiError::not_found("Session", &id),
            CoreError::TransactionNotFound(id) => ApiError::not_found("Transaction", &id),
            CoreError::SessionExists(_)
            | CoreError::NoPendingGameRequest
            | CoreError::TableOutOfRange { .. } => {
                ApiError::new(ErrorCode::BusinessLogic, err.to_string())
            }
            CoreError::CreditNotEligible { .. } => {
                ApiError::new(ErrorCode::CreditNotEligible, err.to_string())
            }
            CoreError::InvalidSettlementAmount(_) | CoreError::NoOutstandingDebt(_) => {
                ApiError::new(ErrorCode::SettlementError, err.to_string())
            }
            // Commands swallow NotAuthorized into logged no-ops before it
            // can get here; this arm is the safety net.
            CoreError::NotAuthorized { action } => {
                ApiError::new(ErrorCode::BusinessLogic, format!("Not authorized: {}", action))
            }
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
        }
    }
}

/// Converts store errors to API errors. The underlying error is logged;
/// the frontend gets a generic message.
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "store operation failed");
        ApiError::new(ErrorCode::StoreError, "Storage operation failed")
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// =============================================================================
// Unit Tests
// =============================================================================
