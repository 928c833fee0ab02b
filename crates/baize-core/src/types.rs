//! # Domain Types
//!
//! Shared domain types used throughout Baize POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                          Domain Types                                │
//! │                                                                      │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐  │
//! │  │ PaymentMethod  │  │   StaffRole    │  │      SessionState      │  │
//! │  │  ────────────  │  │  ────────────  │  │  ────────────────────  │  │
//! │  │  Cash          │  │  Manager       │  │  Idle    (waiting)     │  │
//! │  │  Credit        │  │  Cashier       │  │  Active  (playing or   │  │
//! │  │  Debt          │  │                │  │           buying)      │  │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘  │
//! │                                                                      │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐  │
//! │  │   MarketLine   │  │   GameTiming   │  │      HallSettings      │  │
//! │  │  ────────────  │  │  ────────────  │  │  ────────────────────  │  │
//! │  │  price_units   │  │  min_minutes   │  │  price, tiers, tables, │  │
//! │  │  quantity      │  │  max_minutes   │  │  timings, utc offset   │  │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::money::Money;
use crate::GAP_GRACE_MINUTES;

// =============================================================================
// Payment Method
// =============================================================================

/// How a checkout is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash, collected on the spot.
    Cash,
    /// Discounted checkout - only selectable above the eligibility floor.
    Credit,
    /// Deferred payment; the transaction stays unsettled until the debt
    /// settlement engine collects it.
    Debt,
}

impl PaymentMethod {
    /// Cash and Credit are collected at checkout; Debt is collected later.
    #[inline]
    pub const fn settles_immediately(&self) -> bool {
        !matches!(self, PaymentMethod::Debt)
    }
}

// =============================================================================
// Staff Role
// =============================================================================

/// Role of the staff member issuing a command.
///
/// Privileged operations (undoing a recorded game, removing a non-idle
/// session, deleting transactions) require Manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Manager,
    Cashier,
}

impl StaffRole {
    #[inline]
    pub const fn is_privileged(&self) -> bool {
        matches!(self, StaffRole::Manager)
    }
}

// =============================================================================
// Session State
// =============================================================================

/// Lifecycle state of a session, stored rather than derived.
///
/// Invariant: `Active` exactly when the session has recorded games or open
/// market purchases. Checkout resets the session back to `Idle` instead of
/// deleting it, so the player stays visible in the waiting list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Checked in, nothing billable yet ("waiting" in the dashboard).
    Idle,
    /// Has games or purchases to bill.
    Active,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Idle
    }
}

// =============================================================================
// Market Line
// =============================================================================

/// One purchased market item inside a session.
///
/// Uses the snapshot pattern: the price is frozen from the catalog when the
/// line is first added, so later catalog edits don't change an open bill.
/// Quantity is always > 0 - a line that would drop to zero is removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MarketLine {
    /// Unit price at time of first add (frozen).
    pub price_units: i64,
    /// Count purchased; invariant > 0.
    pub quantity: i64,
}

impl MarketLine {
    /// Returns the unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_units(self.price_units)
    }

    /// Returns quantity × price.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.price().multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Game Timing
// =============================================================================

/// Expected duration range of one game on a table, in minutes.
///
/// Drives the leak estimator: gaps longer than `max_minutes` plus the grace
/// margin count as idle time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GameTiming {
    pub min_minutes: i64,
    pub max_minutes: i64,
}

impl GameTiming {
    /// Midpoint of the range, used as the per-game estimate when counting
    /// how many games fit into an idle gap.
    #[inline]
    pub fn avg_minutes(&self) -> f64 {
        (self.min_minutes + self.max_minutes) as f64 / 2.0
    }

    /// Gap length above which the table counts as idle.
    #[inline]
    pub const fn idle_threshold_minutes(&self) -> i64 {
        self.max_minutes + GAP_GRACE_MINUTES
    }
}

impl Default for GameTiming {
    fn default() -> Self {
        GameTiming {
            min_minutes: 8,
            max_minutes: 15,
        }
    }
}

// =============================================================================
// Hall Settings
// =============================================================================

/// Per-hall configuration snapshot.
///
/// Pricing and audit functions take this as an explicit argument - nothing
/// in baize-core reads ambient state, so every computation is re-derivable
/// from a `(Session, HallSettings)` pair.
///
/// Synced through the store like any other collection; a settings change on
/// one terminal reaches the others as a whole-document snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HallSettings {
    /// Current price of one game. Sessions snapshot this at creation and
    /// keep their rate even if it changes mid-visit.
    pub price_per_game_units: i64,

    /// Tiered discounts: games-played threshold → discount amount. The
    /// highest qualifying tier applies, not a cumulative sum.
    pub discount_tiers: BTreeMap<i64, i64>,

    /// Number of physical tables in the hall.
    pub table_count: u32,

    /// Expected game duration used when a table has no override.
    pub default_timing: GameTiming,

    /// Per-table duration overrides (snooker tables run longer games).
    pub table_timings: BTreeMap<u32, GameTiming>,

    /// Offset of hall local time from UTC, in minutes. Business days open
    /// at 08:00 local.
    pub utc_offset_minutes: i32,
}

impl HallSettings {
    /// Returns the current per-game price as Money.
    #[inline]
    pub fn price_per_game(&self) -> Money {
        Money::from_units(self.price_per_game_units)
    }

    /// Timing for a table, falling back to the hall default.
    pub fn timing_for(&self, table: u32) -> GameTiming {
        self.table_timings
            .get(&table)
            .copied()
            .unwrap_or(self.default_timing)
    }
}

impl Default for HallSettings {
    fn default() -> Self {
        HallSettings {
            price_per_game_units: 1000,
            discount_tiers: BTreeMap::new(),
            table_count: 8,
            default_timing: GameTiming::default(),
            table_timings: BTreeMap::new(),
            utc_offset_minutes: 0,
        }
    }
}

// =============================================================================
// Snapshot Tolerance
// =============================================================================
// The external store enforces no schema: snapshots written by older clients
// can carry missing, null, or mistyped fields. Collection reads coerce those
// to empty rather than failing the whole snapshot.

/// Deserializes a JSON value into a Vec, coercing anything that is not an
/// array (missing, null, scalar) to empty and skipping malformed elements.
pub(crate) fn vec_or_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect()),
        _ => Ok(Vec::new()),
    }
}

/// Deserializes a JSON value into a map, coercing anything that is not an
/// object to empty and skipping malformed entries.
pub(crate) fn map_or_empty<'de, D, V>(
    deserializer: D,
) -> Result<BTreeMap<String, V>, D::Error>
where
    D: serde::Deserializer<'de>,
    V: serde::de::DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Object(entries) => Ok(entries
            .into_iter()
            .filter_map(|(k, v)| serde_json::from_value(v).ok().map(|v| (k, v)))
            .collect()),
        _ => Ok(BTreeMap::new()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
