//! # Transaction Ledger
//!
//! Append-only log of completed checkouts. One transaction per checkout
//! event, carrying the full audit trail: per-game timestamps and tables,
//! market lines, discount, collector, settlement state.
//!
//! ## Checkout Flow
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                          finalize()                                  │
//! │                                                                      │
//! │  Session snapshot ──► pricing::quote ──► Transaction                 │
//! │        │                                    │                        │
//! │        │                                    ├── appended (never      │
//! │        │                                    │   updated in place     │
//! │        │                                    │   outside settlement)  │
//! │        ▼                                    ▼                        │
//! │  reset_after_checkout            game_starts / game_tables copied    │
//! │  (session survives, Idle)        VERBATIM - the durable record the   │
//! │                                  table audit later replays           │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Transactions are the durable record; sessions are mutable and reusable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing;
use crate::session::Session;
use crate::types::{map_or_empty, vec_or_empty, HallSettings, MarketLine, PaymentMethod};

// =============================================================================
// Transaction
// =============================================================================

/// One completed checkout.
///
/// Immutable once written, with two sanctioned exceptions owned by the
/// debt settlement engine: flipping `is_settled` (which also rewrites
/// `timestamp`), and reducing `total_paid_units` when a debt is partially
/// covered (spawning a settled sibling for the paid remainder).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Transaction {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Session this checkout came from. Sessions are reused, so this is a
    /// provenance hint, not a foreign key.
    pub session_id: String,

    /// Payer, copied from the session.
    pub player_name: String,

    /// Checkout instant - EXCEPT for settled debts, where settlement
    /// rewrites this to the collection instant so the money counts toward
    /// the day it was actually received. Reports over `timestamp` mix
    /// "incurred" and "collected" semantics by design.
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,

    /// Games subtotal at checkout (games × frozen rate).
    pub amount_units: i64,

    /// Market purchases subtotal at checkout.
    pub market_total_units: i64,

    /// Tiered discount applied (Credit only, zero otherwise).
    pub discount_units: i64,

    /// `max(0, amount + market − discount)` at checkout.
    pub expected_total_units: i64,

    /// Operator-entered amount. For an unsettled debt this is the amount
    /// still owed; partial settlement reduces it.
    pub total_paid_units: i64,

    pub payment_method: PaymentMethod,

    /// True immediately for Cash/Credit; Debt stays false until settled.
    pub is_settled: bool,

    /// True only on the paid-remainder sibling created by a partial
    /// settlement split.
    #[serde(default)]
    pub is_partial_settlement: bool,

    /// Per-game start instants, copied verbatim from the session.
    #[serde(default, deserialize_with = "vec_or_empty")]
    #[ts(as = "Vec<String>")]
    pub game_starts: Vec<DateTime<Utc>>,

    /// Per-game tables, index-aligned with `game_starts`.
    #[serde(default, deserialize_with = "vec_or_empty")]
    pub game_tables: Vec<u32>,

    /// Market lines snapshot at checkout.
    #[serde(default, deserialize_with = "map_or_empty")]
    pub market_items: BTreeMap<String, MarketLine>,

    /// Staff member who collected the payment.
    pub collected_by: String,

    /// Free-text note from the operator.
    pub note: Option<String>,
}

impl Transaction {
    /// Returns the amount recorded against this transaction as Money.
    #[inline]
    pub fn total_paid(&self) -> Money {
        Money::from_units(self.total_paid_units)
    }

    /// An unsettled deferred payment awaiting the settlement engine.
    #[inline]
    pub fn is_outstanding_debt(&self) -> bool {
        self.payment_method == PaymentMethod::Debt && !self.is_settled
    }
}

// =============================================================================
// Transaction Ledger
// =============================================================================

/// The hall's transaction log, synced as the `transactions` collection.
#[derive(Debug, Default)]
pub struct TransactionLedger {
    pub(crate) transactions: Vec<Transaction>,
}

impl TransactionLedger {
    pub fn new() -> Self {
        TransactionLedger::default()
    }

    /// Serializes the collection for the store.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(&self.transactions)
            .unwrap_or_else(|_| serde_json::Value::Array(vec![]))
    }

    /// Replaces local transactions with a remote snapshot (last-write-wins
    /// overwrite); non-array snapshots coerce to empty.
    pub fn apply_snapshot(&mut self, value: serde_json::Value) {
        self.transactions = match value {
            serde_json::Value::Array(items) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        };
    }

    /// Checks out a session: quotes it, appends the transaction, resets
    /// the session (games and purchases zeroed, row preserved).
    ///
    /// The operator-entered `paid` amount is recorded as-is even when it
    /// differs from the quote - the mismatch is the command layer's
    /// warning, not our veto.
    #[allow(clippy::too_many_arguments)]
    pub fn finalize(
        &mut self,
        session: &mut Session,
        settings: &HallSettings,
        method: PaymentMethod,
        paid: Money,
        collected_by: &str,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> CoreResult<Transaction> {
        let quote = pricing::quote(session, settings, method)?;

        let transaction = Transaction {
            id: Uuid::new_v4().to_string(),
            session_id: session.id.clone(),
            player_name: session.player_name.clone(),
            timestamp: now,
            amount_units: quote.subtotal_units,
            market_total_units: quote.market_total_units,
            discount_units: quote.discount_units,
            expected_total_units: quote.expected_total_units,
            total_paid_units: paid.units(),
            payment_method: method,
            is_settled: method.settles_immediately(),
            is_partial_settlement: false,
            game_starts: session.game_starts.clone(),
            game_tables: session.game_tables.clone(),
            market_items: session.market_items.clone(),
            collected_by: collected_by.to_string(),
            note,
        };

        self.transactions.push(transaction.clone());
        session.reset_after_checkout();
        Ok(transaction)
    }

    /// Looks up a transaction by id.
    pub fn get(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    /// Hard-deletes one transaction (audit correction; Manager-gated at
    /// the command layer).
    pub fn remove(&mut self, id: &str) -> CoreResult<()> {
        let before = self.transactions.len();
        self.transactions.retain(|t| t.id != id);
        if self.transactions.len() == before {
            return Err(CoreError::TransactionNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Bulk hard-delete, used by the table audit view to purge erroneous
    /// game records. Returns how many were removed; unknown ids are
    /// skipped silently.
    pub fn remove_many(&mut self, ids: &HashSet<String>) -> usize {
        let before = self.transactions.len();
        self.transactions.retain(|t| !ids.contains(&t.id));
        before - self.transactions.len()
    }

    /// All transactions whose `timestamp` falls in `[start, end)`.
    pub fn in_window<'a>(
        &'a self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Iterator<Item = &'a Transaction> {
        self.transactions
            .iter()
            .filter(move |t| t.timestamp >= start && t.timestamp < end)
    }

    /// Unsettled deferred payments, in ledger order.
    pub fn unsettled_debts(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter().filter(|t| t.is_outstanding_debt())
    }

    /// Iterates all transactions in append order.
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, minute, 0).unwrap()
    }

    fn played_session(games: i64) -> Session {
        let mut session = Session::new("Bat", Money::from_units(1000), t(0));
        for i in 0..games {
            session.record_game((i % 3 + 1) as u32, t(i as u32 * 12 + 1));
        }
        session
    }

    #[test]
    fn test_finalize_captures_and_resets() {
        let mut ledger = TransactionLedger::new();
        let settings = HallSettings::default();
        let mut session = played_session(3);
        session.adjust_purchase("cola", 2, Money::from_units(500));
        let original_id = session.id.clone();
        let original_start = session.start_time;
        let expected_starts = session.game_starts.clone();
        let expected_tables = session.game_tables.clone();

        let txn = ledger
            .finalize(
                &mut session,
                &settings,
                PaymentMethod::Cash,
                Money::from_units(4000),
                "staff-1",
                Some("regular".to_string()),
                t(40),
            )
            .unwrap();

        // Transaction captured the session verbatim.
        assert_eq!(txn.amount_units, 3000);
        assert_eq!(txn.market_total_units, 1000);
        assert_eq!(txn.expected_total_units, 4000);
        assert_eq!(txn.total_paid_units, 4000);
        assert_eq!(txn.game_starts, expected_starts);
        assert_eq!(txn.game_tables, expected_tables);
        assert_eq!(txn.market_items["cola"].quantity, 2);
        assert!(txn.is_settled);
        assert!(!txn.is_partial_settlement);

        // Session reset but preserved: same row, same player, same
        // check-in time - no re-check-in needed for the next visit.
        assert_eq!(session.id, original_id);
        assert_eq!(session.player_name, "Bat");
        assert_eq!(session.start_time, original_start);
        assert_eq!(session.games_played, 0);
        assert!(session.game_starts.is_empty());
        assert!(session.market_items.is_empty());
        assert!(session.is_idle());

        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_debt_checkout_stays_unsettled() {
        let mut ledger = TransactionLedger::new();
        let settings = HallSettings::default();
        let mut session = played_session(2);

        let txn = ledger
            .finalize(
                &mut session,
                &settings,
                PaymentMethod::Debt,
                Money::from_units(2000),
                "staff-1",
                None,
                t(30),
            )
            .unwrap();

        assert!(!txn.is_settled);
        assert!(txn.is_outstanding_debt());
    }

    #[test]
    fn test_underpayment_recorded_not_blocked() {
        let mut ledger = TransactionLedger::new();
        let settings = HallSettings::default();
        let mut session = played_session(3);

        let txn = ledger
            .finalize(
                &mut session,
                &settings,
                PaymentMethod::Cash,
                Money::from_units(2500), // expected is 3000
                "staff-1",
                None,
                t(40),
            )
            .unwrap();

        assert_eq!(txn.expected_total_units, 3000);
        assert_eq!(txn.total_paid_units, 2500);
    }

    #[test]
    fn test_remove_and_bulk_remove() {
        let mut ledger = TransactionLedger::new();
        let settings = HallSettings::default();
        let mut ids = Vec::new();
        for name in ["a", "b", "c"] {
            let mut session = Session::new(name, Money::from_units(1000), t(0));
            session.record_game(1, t(1));
            let txn = ledger
                .finalize(
                    &mut session,
                    &settings,
                    PaymentMethod::Cash,
                    Money::from_units(1000),
                    "staff-1",
                    None,
                    t(10),
                )
                .unwrap();
            ids.push(txn.id);
        }

        ledger.remove(&ids[0]).unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(matches!(
            ledger.remove(&ids[0]),
            Err(CoreError::TransactionNotFound(_))
        ));

        let purge: HashSet<String> =
            [ids[1].clone(), "unknown".to_string()].into_iter().collect();
        assert_eq!(ledger.remove_many(&purge), 1);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.get(&ids[2]).is_some());
    }

    #[test]
    fn test_window_filter() {
        let mut ledger = TransactionLedger::new();
        let settings = HallSettings::default();
        for minute in [5u32, 25, 45] {
            let mut session =
                Session::new(&format!("p{}", minute), Money::from_units(1000), t(0));
            session.record_game(1, t(minute));
            ledger
                .finalize(
                    &mut session,
                    &settings,
                    PaymentMethod::Cash,
                    Money::from_units(1000),
                    "staff-1",
                    None,
                    t(minute),
                )
                .unwrap();
        }

        let hits: Vec<_> = ledger.in_window(t(10), t(45)).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].timestamp, t(25));
    }

    #[test]
    fn test_snapshot_tolerates_drift() {
        // Missing arrays and flags from an older snapshot shape.
        let value = serde_json::json!([{
            "id": "t1",
            "session_id": "s1",
            "player_name": "Bat",
            "timestamp": "2026-03-14T12:00:00Z",
            "amount_units": 1000,
            "market_total_units": 0,
            "discount_units": 0,
            "expected_total_units": 1000,
            "total_paid_units": 1000,
            "payment_method": "cash",
            "is_settled": true,
            "game_starts": null,
            "collected_by": "staff-1",
            "note": null
        }]);

        let mut ledger = TransactionLedger::new();
        ledger.apply_snapshot(value);
        assert_eq!(ledger.len(), 1);
        let txn = ledger.iter().next().unwrap();
        assert!(txn.game_starts.is_empty());
        assert!(txn.game_tables.is_empty());
        assert!(txn.market_items.is_empty());
        assert!(!txn.is_partial_settlement);
    }
}
