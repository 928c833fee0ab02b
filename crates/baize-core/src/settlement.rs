//! # Debt Settlement Engine
//!
//! Collects deferred-payment (Debt) checkouts after the fact. Outstanding
//! transactions group by payer; a settlement walks the payer's unpaid
//! transactions oldest-first and pays them down FIFO.
//!
//! ## Settlement Walk
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │        PARTIAL settle 600 against debts [500 @t1, 300 @t2, 200 @t3]  │
//! │                                                                      │
//! │  500 @t1  ── remaining 600 ≥ 500 ──► settled, timestamp := now       │
//! │                remaining = 100                                       │
//! │                                                                      │
//! │  300 @t2  ── remaining 100 < 300 ──► SPLIT:                          │
//! │                sibling  { 100, settled, partial, timestamp now }     │
//! │                original { 200, still unsettled, keeps t2 }           │
//! │                remaining = 0, stop                                   │
//! │                                                                      │
//! │  200 @t3  ── untouched                                               │
//! │                                                                      │
//! │  Money is conserved exactly: 500 + (100 + 200) + 200 before = after  │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! FIFO payoff order is a policy decision (oldest debt retires first), not
//! an accident of storage order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::ledger::TransactionLedger;
use crate::money::Money;

// =============================================================================
// Debt Groups
// =============================================================================

/// A payer's outstanding debt, summed over their unsettled Debt
/// transactions. `total_units` sums `total_paid_units`, which for an
/// uncollected debt is the amount owed.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DebtGroup {
    pub player_name: String,
    pub total_units: i64,
    pub transaction_count: usize,
    /// Timestamp of the oldest unpaid transaction - the first one a
    /// settlement will retire.
    #[ts(as = "String")]
    pub oldest_at: DateTime<Utc>,
}

impl DebtGroup {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_units(self.total_units)
    }
}

/// Groups all outstanding debts by payer, sorted by player name.
pub fn debt_groups(ledger: &TransactionLedger) -> Vec<DebtGroup> {
    let mut groups: Vec<DebtGroup> = Vec::new();

    for txn in ledger.unsettled_debts() {
        match groups.iter_mut().find(|g| g.player_name == txn.player_name) {
            Some(group) => {
                group.total_units += txn.total_paid_units;
                group.transaction_count += 1;
                if txn.timestamp < group.oldest_at {
                    group.oldest_at = txn.timestamp;
                }
            }
            None => groups.push(DebtGroup {
                player_name: txn.player_name.clone(),
                total_units: txn.total_paid_units,
                transaction_count: 1,
                oldest_at: txn.timestamp,
            }),
        }
    }

    groups.sort_by(|a, b| a.player_name.cmp(&b.player_name));
    groups
}

// =============================================================================
// Settlement
// =============================================================================

/// How much of the group to settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SettleMode {
    /// The whole outstanding balance.
    Full,
    /// An operator-entered amount, positive and capped to the balance.
    Partial,
}

/// Record of a partial-coverage split.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SplitRecord {
    /// The transaction that was partially covered; keeps its original
    /// timestamp and stays unsettled with the uncovered remainder.
    pub original_id: String,
    /// The settled sibling holding the paid remainder.
    pub sibling_id: String,
    pub sibling_units: i64,
}

/// What a settlement did, for the command layer's response and logs.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SettlementOutcome {
    pub player_name: String,
    pub amount_applied_units: i64,
    /// Transactions retired whole, oldest first.
    pub settled_ids: Vec<String>,
    /// Present when the walk ended inside a transaction.
    pub split: Option<SplitRecord>,
}

/// Settles a payer's outstanding debt, oldest transaction first.
///
/// Full mode settles the entire balance. Partial mode applies the
/// operator's `amount`: it must be positive (typed error otherwise, no
/// mutation) and is capped to the balance. A transaction only partially
/// covered is split - a settled sibling holds the paid remainder while the
/// original keeps its timestamp and the rest of the debt. Transactions past
/// the point where the amount runs out are untouched.
///
/// Retiring a transaction rewrites its `timestamp` to `now` so the money
/// counts toward the business day it was collected.
pub fn settle(
    ledger: &mut TransactionLedger,
    player_name: &str,
    mode: SettleMode,
    amount: Money,
    now: DateTime<Utc>,
) -> CoreResult<SettlementOutcome> {
    // Oldest-first index walk over the payer's outstanding transactions.
    let mut order: Vec<usize> = ledger
        .transactions
        .iter()
        .enumerate()
        .filter(|(_, t)| t.is_outstanding_debt() && t.player_name == player_name)
        .map(|(i, _)| i)
        .collect();
    order.sort_by_key(|&i| ledger.transactions[i].timestamp);

    if order.is_empty() {
        return Err(CoreError::NoOutstandingDebt(player_name.to_string()));
    }

    let group_total: Money = order
        .iter()
        .map(|&i| ledger.transactions[i].total_paid())
        .sum();

    let amount = match mode {
        SettleMode::Full => group_total,
        SettleMode::Partial => {
            if !amount.is_positive() {
                return Err(CoreError::InvalidSettlementAmount(amount));
            }
            amount.min(group_total)
        }
    };

    let mut remaining = amount;
    let mut settled_ids = Vec::new();
    let mut split = None;
    let mut sibling = None;

    for &i in &order {
        if remaining.is_zero() {
            break;
        }

        let txn = &mut ledger.transactions[i];
        if remaining >= txn.total_paid() {
            // Whole transaction covered: retire it on today's date.
            remaining -= txn.total_paid();
            txn.is_settled = true;
            txn.timestamp = now;
            settled_ids.push(txn.id.clone());
        } else {
            // Partial coverage: split off a settled sibling for the paid
            // remainder; the original keeps its date and the open rest.
            let mut paid_half = txn.clone();
            paid_half.id = Uuid::new_v4().to_string();
            paid_half.total_paid_units = remaining.units();
            paid_half.is_settled = true;
            paid_half.is_partial_settlement = true;
            paid_half.timestamp = now;

            txn.total_paid_units -= remaining.units();

            split = Some(SplitRecord {
                original_id: txn.id.clone(),
                sibling_id: paid_half.id.clone(),
                sibling_units: paid_half.total_paid_units,
            });
            sibling = Some(paid_half);
            remaining = Money::zero();
        }
    }

    if let Some(paid_half) = sibling {
        ledger.transactions.push(paid_half);
    }

    Ok(SettlementOutcome {
        player_name: player_name.to_string(),
        amount_applied_units: amount.units(),
        settled_ids,
        split,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
