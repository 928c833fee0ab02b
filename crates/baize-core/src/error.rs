//! # Error Types
//!
//! Domain-specific error types for baize-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                          Error Types                                 │
//! │                                                                      │
//! │  baize-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                     │
//! │  └── ValidationError  - Input validation failures                    │
//! │                                                                      │
//! │  baize-store errors (separate crate)                                 │
//! │  └── StoreError       - Cache / snapshot store failures              │
//! │                                                                      │
//! │  baize-hall errors (command layer)                                   │
//! │  └── ApiError         - What the dashboard sees (serialized)         │
//! │                                                                      │
//! │  Flow: ValidationError → CoreError → ApiError → Frontend             │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in messages (player name, amounts, table numbers)
//! 3. Errors are enum variants, never String
//! 4. `NotAuthorized` is special: the command layer swallows it into a
//!    logged no-op rather than surfacing it (an authorized UI never
//!    produces it)

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These represent business rule violations. The command layer translates
/// them to user-facing messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A live session already exists for this player name.
    ///
    /// ## When This Occurs
    /// Player names act as the natural key: at most one active session per
    /// name. Checking in the same name twice is a user mistake, reported
    /// synchronously with no mutation.
    #[error("Session already open for player '{0}'")]
    SessionExists(String),

    /// Session cannot be found.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Transaction cannot be found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// A game commit arrived without a pending table-choice request.
    ///
    /// Recording a game is two-phase: request → choose table → commit.
    #[error("No pending game request to commit")]
    NoPendingGameRequest,

    /// Table number outside the configured table count.
    #[error("Table {table} out of range (hall has {table_count} tables)")]
    TableOutOfRange { table: u32, table_count: u32 },

    /// Credit was selected below the eligibility floor.
    ///
    /// ## When This Occurs
    /// Credit (discounted) checkout requires both floors: games played and
    /// games subtotal. Below either, Credit is rejected outright - never
    /// silently downgraded to Cash.
    #[error(
        "Credit requires at least {min_games} games and a {min_subtotal} subtotal \
         (got {games} games, {subtotal})"
    )]
    CreditNotEligible {
        games: i64,
        subtotal: Money,
        min_games: i64,
        min_subtotal: Money,
    },

    /// Partial settlement amount must be positive.
    #[error("Settlement amount must be positive (got {0})")]
    InvalidSettlementAmount(Money),

    /// The payer has no outstanding unsettled debt.
    #[error("No outstanding debt for player '{0}'")]
    NoOutstandingDebt(String),

    /// Caller's role does not permit this action.
    ///
    /// ## When This Occurs
    /// Only via a UI-reachability bug: privileged actions are hidden from
    /// non-privileged roles. The command layer logs and no-ops.
    #[error("Not authorized: {action}")]
    NotAuthorized { action: &'static str },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when operator input doesn't meet requirements, before any
/// business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g. a malformed UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
