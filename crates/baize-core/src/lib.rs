//! # baize-core: Pure Business Logic for Baize POS
//!
//! Baize POS runs billiard and snooker halls: per-table play sessions,
//! tiered-discount billing, deferred-payment (debt) settlement, and a
//! table audit that estimates revenue leaked through unrecorded games.
//! This crate is the heart of the system - all of that logic lives here
//! as pure functions and plain data, with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                        Baize POS Architecture                        │
//! │                                                                      │
//! │  ┌────────────────────────────────────────────────────────────────┐  │
//! │  │                     Hall Dashboard (GUI)                       │  │
//! │  │   Tables UI ──► Checkout UI ──► Debts UI ──► Audit UI          │  │
//! │  └─────────────────────────────┬──────────────────────────────────┘  │
//! │                                │                                     │
//! │  ┌─────────────────────────────▼──────────────────────────────────┐  │
//! │  │                 baize-hall (command layer)                     │  │
//! │  └─────────────────────────────┬──────────────────────────────────┘  │
//! │                                │                                     │
//! │  ┌─────────────────────────────▼──────────────────────────────────┐  │
//! │  │               ★ baize-core (THIS CRATE) ★                      │  │
//! │  │                                                                │  │
//! │  │  ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌────────────┐ ┌──────┐ │  │
//! │  │  │ session │ │ pricing │ │  ledger  │ │ settlement │ │audit │ │  │
//! │  │  └─────────┘ └─────────┘ └──────────┘ └────────────┘ └──────┘ │  │
//! │  │                                                                │  │
//! │  │  NO I/O • NO CLOCK • NO STORE • PURE FUNCTIONS                 │  │
//! │  └─────────────────────────────┬──────────────────────────────────┘  │
//! │                                │                                     │
//! │  ┌─────────────────────────────▼──────────────────────────────────┐  │
//! │  │          baize-store (snapshot store, local cache)             │  │
//! │  └────────────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (payment methods, settings, roles)
//! - [`money`] - Integer money (whole currency units, no floating point)
//! - [`session`] - Active play sessions and the session ledger
//! - [`pricing`] - Subtotals, tiered discounts, checkout quotes
//! - [`ledger`] - Append-only transaction ledger
//! - [`settlement`] - FIFO debt settlement with transaction splitting
//! - [`audit`] - Per-table game timelines and the leak estimator
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation rules
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: deterministic - "now" is always a parameter
//! 2. **No I/O**: store, cache, and network live in other crates
//! 3. **Integer Money**: whole currency units in `i64`, never floats
//! 4. **Explicit Errors**: typed enums, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod audit;
pub mod error;
pub mod ledger;
pub mod money;
pub mod pricing;
pub mod session;
pub mod settlement;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::{Transaction, TransactionLedger};
pub use money::Money;
pub use pricing::{CheckoutQuote, PaymentMismatch};
pub use session::{PendingGameRequest, Session, SessionLedger};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Minimum games played before the Credit method (and its tiered discount)
/// becomes selectable.
pub const CREDIT_MIN_GAMES: i64 = 4;

/// Minimum games subtotal, in whole currency units, before the Credit
/// method becomes selectable. Both floors must hold.
pub const CREDIT_MIN_SUBTOTAL: i64 = 3000;

/// Grace margin, in minutes, added on top of a table's configured maximum
/// game duration before a gap between games counts as idle time.
pub const GAP_GRACE_MINUTES: i64 = 3;

/// Two games on the same table within this many minutes of each other are
/// grouped into one match session.
pub const MATCH_WINDOW_MINUTES: i64 = 3;

/// Hour (local time) at which a business day begins. A business day runs
/// 08:00 → 08:00 the next calendar day, not midnight to midnight; every
/// day-bounded report in the system uses this convention.
pub const BUSINESS_DAY_START_HOUR: u32 = 8;

/// Table number recorded for games whose table was not tracked. The audit
/// ignores these events.
pub const UNTRACKED_TABLE: u32 = 0;
