//! # Audit Commands
//!
//! The table-audit screen: per-table efficiency reports and the
//! played-together match view for a chosen business day, plus the
//! manager-gated purge of erroneous game records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use baize_core::audit::{self, MatchSession, TableAuditReport};
use baize_core::StaffRole;

use crate::commands::session::GatedActionResponse;
use crate::error::ApiError;
use crate::service::HallService;
use crate::COLLECTION_TRANSACTIONS;

// =============================================================================
// DTOs
// =============================================================================

/// A business day's audit across all tables, with hall-level rollups.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayAuditReport {
    pub date: NaiveDate,
    pub tables: Vec<TableAuditReport>,
    pub total_recorded_games: i64,
    pub total_missing_games: i64,
    pub total_estimated_loss_units: i64,
}

// =============================================================================
// Commands
// =============================================================================

/// Audits every table for `date`'s business day (08:00 local → 08:00 next
/// day). A pure read - estimates are heuristic and never touch the ledger.
pub fn table_report(service: &HallService, date: NaiveDate) -> DayAuditReport {
    debug!(%date, "table_report command");

    let tables = service.state().with_data(|data| {
        let (start, end) = audit::business_day_window(date, data.settings.utc_offset_minutes);
        audit::audit_day(data.transactions.in_window(start, end), &data.settings)
    });

    DayAuditReport {
        date,
        total_recorded_games: tables.iter().map(|t| t.recorded_games).sum(),
        total_missing_games: tables.iter().map(|t| t.missing_games).sum(),
        total_estimated_loss_units: tables.iter().map(|t| t.estimated_loss_units).sum(),
        tables,
    }
}

/// Match sessions (games played together) for `date`'s business day.
pub fn match_report(service: &HallService, date: NaiveDate) -> Vec<MatchSession> {
    debug!(%date, "match_report command");

    service.state().with_data(|data| {
        let (start, end) = audit::business_day_window(date, data.settings.utc_offset_minutes);
        audit::match_sessions(audit::game_events(data.transactions.in_window(start, end)))
    })
}

/// Hard-deletes a set of transactions flagged as erroneous in the audit
/// view. Manager only - a non-privileged call is suppressed as a no-op.
pub async fn purge_game_records(
    service: &HallService,
    transaction_ids: Vec<String>,
    role: StaffRole,
) -> Result<GatedActionResponse, ApiError> {
    debug!(count = transaction_ids.len(), ?role, "purge_game_records command");

    if !role.is_privileged() {
        warn!(?role, "unauthorized purge suppressed");
        return Ok(GatedActionResponse { applied: false });
    }

    let ids: HashSet<String> = transaction_ids.into_iter().collect();
    let removed = service
        .state()
        .with_data_mut(|data| data.transactions.remove_many(&ids));

    if removed > 0 {
        service.persist(COLLECTION_TRANSACTIONS).await;
    }
    info!(removed, "audit purge complete");
    Ok(GatedActionResponse { applied: removed > 0 })
}

/// Hard-deletes one transaction by id (audit correction). Manager only.
pub async fn remove_transaction(
    service: &HallService,
    transaction_id: &str,
    role: StaffRole,
) -> Result<GatedActionResponse, ApiError> {
    debug!(transaction_id = %transaction_id, ?role, "remove_transaction command");

    if !role.is_privileged() {
        warn!(?role, "unauthorized transaction delete suppressed");
        return Ok(GatedActionResponse { applied: false });
    }

    service
        .state()
        .with_data_mut(|data| data.transactions.remove(transaction_id))?;
    service.persist(COLLECTION_TRANSACTIONS).await;
    info!(transaction_id = %transaction_id, "transaction removed");
    Ok(GatedActionResponse { applied: true })
}
