//! # Checkout Commands
//!
//! Quote and finalize. A checkout appends exactly one transaction and
//! resets the session; the operator-entered amount is recorded as-is, with
//! any difference from the quote surfaced as a warning in the receipt.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use baize_core::{pricing, validation, CheckoutQuote, Money, PaymentMethod, PaymentMismatch};

use crate::error::ApiError;
use crate::service::HallService;
use crate::{COLLECTION_SESSIONS, COLLECTION_TRANSACTIONS};

// =============================================================================
// DTOs
// =============================================================================

/// What the dashboard shows after a checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    pub transaction_id: String,
    pub player_name: String,
    pub method: PaymentMethod,
    pub games_played: i64,
    pub subtotal_units: i64,
    pub market_total_units: i64,
    pub discount_units: i64,
    pub expected_total_units: i64,
    pub paid_units: i64,
    /// Non-`Exact` values render as the over/underpayment warning.
    pub mismatch: PaymentMismatch,
    pub is_settled: bool,
}

// =============================================================================
// Commands
// =============================================================================

/// Prices a session under a payment method without mutating anything.
/// The dashboard re-quotes on every method toggle.
pub fn quote_checkout(
    service: &HallService,
    session_id: &str,
    method: PaymentMethod,
) -> Result<CheckoutQuote, ApiError> {
    service.state().with_data(|data| {
        let session = data
            .sessions
            .get(session_id)
            .ok_or_else(|| ApiError::not_found("Session", session_id))?;
        pricing::quote(session, &data.settings, method).map_err(ApiError::from)
    })
}

/// Finalizes a checkout: one transaction appended, session reset in place.
pub async fn checkout(
    service: &HallService,
    session_id: &str,
    method: PaymentMethod,
    paid_units: i64,
    collected_by: &str,
    note: Option<String>,
) -> Result<CheckoutReceipt, ApiError> {
    debug!(session_id = %session_id, ?method, paid_units, "checkout command");
    validation::validate_paid_amount(paid_units)
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let transaction = service.state().with_data_mut(|data| {
        let settings = data.settings.clone();
        let session = data.sessions.get_mut(session_id)?;
        data.transactions.finalize(
            session,
            &settings,
            method,
            Money::from_units(paid_units),
            collected_by,
            note,
            Utc::now(),
        )
    })?;

    service.persist(COLLECTION_SESSIONS).await;
    service.persist(COLLECTION_TRANSACTIONS).await;

    let mismatch = pricing::payment_mismatch(
        Money::from_units(transaction.expected_total_units),
        Money::from_units(transaction.total_paid_units),
    );
    if mismatch != PaymentMismatch::Exact {
        // Permitted - the entered amount is authoritative - but worth a
        // trace for end-of-day reconciliation.
        warn!(
            transaction_id = %transaction.id,
            expected = transaction.expected_total_units,
            paid = transaction.total_paid_units,
            "checkout amount differs from quote"
        );
    }

    info!(
        transaction_id = %transaction.id,
        player_name = %transaction.player_name,
        ?method,
        expected = transaction.expected_total_units,
        paid = transaction.total_paid_units,
        "checkout finalized"
    );

    Ok(CheckoutReceipt {
        transaction_id: transaction.id,
        player_name: transaction.player_name,
        method,
        games_played: transaction.game_starts.len() as i64,
        subtotal_units: transaction.amount_units,
        market_total_units: transaction.market_total_units,
        discount_units: transaction.discount_units,
        expected_total_units: transaction.expected_total_units,
        paid_units: transaction.total_paid_units,
        mismatch,
        is_settled: transaction.is_settled,
    })
}
