//! # Debt Commands
//!
//! The debts screen: outstanding balances grouped by payer, and full or
//! partial settlement against the oldest debts first.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use baize_core::settlement::{self, DebtGroup, SettleMode, SettlementOutcome};
use baize_core::{validation, Money};

use crate::error::ApiError;
use crate::service::HallService;
use crate::COLLECTION_TRANSACTIONS;

// =============================================================================
// DTOs
// =============================================================================

/// Settlement result plus the payer's remaining balance for the screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReceipt {
    pub outcome: SettlementOutcome,
    pub remaining_units: i64,
}

// =============================================================================
// Commands
// =============================================================================

/// Outstanding debt groups, one per payer, sorted by name.
pub fn list_debts(service: &HallService) -> Vec<DebtGroup> {
    service
        .state()
        .with_data(|data| settlement::debt_groups(&data.transactions))
}

/// Settles a payer's debt.
///
/// `Full` ignores `amount_units` and retires the whole balance. `Partial`
/// applies the operator's amount: rejected synchronously when ≤ 0, capped
/// to the balance, paid oldest-debt-first with a split when the amount
/// runs out inside a transaction.
pub async fn settle_debt(
    service: &HallService,
    player_name: &str,
    mode: SettleMode,
    amount_units: i64,
) -> Result<SettlementReceipt, ApiError> {
    debug!(player_name = %player_name, ?mode, amount_units, "settle_debt command");

    if mode == SettleMode::Partial {
        validation::validate_settlement_amount(amount_units)
            .map_err(|e| ApiError::validation(e.to_string()))?;
    }

    let (outcome, remaining_units) = service.state().with_data_mut(|data| {
        let outcome = settlement::settle(
            &mut data.transactions,
            player_name,
            mode,
            Money::from_units(amount_units),
            Utc::now(),
        )?;
        let remaining_units = settlement::debt_groups(&data.transactions)
            .into_iter()
            .find(|g| g.player_name == player_name)
            .map(|g| g.total_units)
            .unwrap_or(0);
        Ok::<_, ApiError>((outcome, remaining_units))
    })?;

    service.persist(COLLECTION_TRANSACTIONS).await;

    info!(
        player_name = %player_name,
        applied = outcome.amount_applied_units,
        settled = outcome.settled_ids.len(),
        split = outcome.split.is_some(),
        remaining = remaining_units,
        "debt settled"
    );

    Ok(SettlementReceipt {
        outcome,
        remaining_units,
    })
}
