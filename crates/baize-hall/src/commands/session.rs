//! # Session Commands
//!
//! Check-in, the two-phase game flow, purchases, and session removal.
//! Commands validate input, call baize-core under the state lock, persist
//! the touched collection, and shape a DTO for the dashboard.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use baize_core::{
    pricing, validation, CoreError, Money, PendingGameRequest, Session, SessionState, StaffRole,
};

use crate::error::ApiError;
use crate::service::HallService;
use crate::COLLECTION_SESSIONS;

// =============================================================================
// DTOs
// =============================================================================

/// Session row for the dashboard list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    pub id: String,
    pub player_name: String,
    pub state: SessionState,
    pub games_played: i64,
    pub subtotal_units: i64,
    pub market_total_units: i64,
    /// Whether the Credit option should be enabled for this session.
    pub credit_eligible: bool,
    pub started_at: String,
    pub first_game_at: Option<String>,
}

impl SessionDto {
    fn from_session(session: &Session) -> Self {
        let subtotal = pricing::games_subtotal(session);
        SessionDto {
            id: session.id.clone(),
            player_name: session.player_name.clone(),
            state: session.state,
            games_played: session.games_played,
            subtotal_units: subtotal.units(),
            market_total_units: pricing::market_total(session).units(),
            credit_eligible: pricing::credit_allowed(session.games_played, subtotal),
            started_at: session.start_time.to_rfc3339(),
            first_game_at: session.earliest_game_at().map(|t| t.to_rfc3339()),
        }
    }
}

/// Outcome of a role-gated action that no-ops instead of erroring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatedActionResponse {
    pub applied: bool,
}

// =============================================================================
// Commands
// =============================================================================

/// Checks in a player, opening an idle session at the current tariff.
pub async fn check_in(service: &HallService, player_name: &str) -> Result<SessionDto, ApiError> {
    debug!(player_name = %player_name, "check_in command");
    let player_name = validation::validate_player_name(player_name)
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let session = service.state().with_data_mut(|data| {
        let price = data.settings.price_per_game();
        data.sessions.start_session(&player_name, price, Utc::now())
    })?;

    service.persist(COLLECTION_SESSIONS).await;
    info!(session_id = %session.id, player_name = %player_name, "player checked in");
    Ok(SessionDto::from_session(&session))
}

/// Phase one of adding a game: park the increment until a table is chosen.
pub async fn request_game(service: &HallService, session_id: &str) -> Result<(), ApiError> {
    debug!(session_id = %session_id, "request_game command");
    service
        .state()
        .with_data_mut(|data| data.sessions.request_game(session_id, 1))?;
    Ok(())
}

/// Phase two: commit the pending increment onto the chosen table.
pub async fn choose_table(service: &HallService, table: u32) -> Result<SessionDto, ApiError> {
    debug!(table = table, "choose_table command");

    let session = service.state().with_data_mut(|data| {
        validation::validate_table_number(table, data.settings.table_count)
            .map_err(CoreError::from)?;
        data.sessions.commit_game(table, Utc::now())
    })?;

    service.persist(COLLECTION_SESSIONS).await;
    info!(
        session_id = %session.id,
        table = table,
        games_played = session.games_played,
        "game recorded"
    );
    Ok(SessionDto::from_session(&session))
}

/// Abandons an unanswered table choice.
pub async fn cancel_game_request(service: &HallService) {
    service
        .state()
        .with_data_mut(|data| data.sessions.cancel_request());
}

/// Current pending request, for rendering the table picker.
pub fn pending_game_request(service: &HallService) -> PendingGameRequest {
    service
        .state()
        .with_data(|data| data.sessions.pending().clone())
}

/// Removes the most recent game record (mis-click correction).
///
/// Manager only. A non-privileged call is an authorization violation -
/// silently no-oped and logged, per the error-handling policy: the UI
/// hides the button, so reaching here is a reachability bug, not a user
/// mistake worth a dialog.
pub async fn undo_game(
    service: &HallService,
    session_id: &str,
    role: StaffRole,
) -> Result<GatedActionResponse, ApiError> {
    debug!(session_id = %session_id, ?role, "undo_game command");

    let result = service
        .state()
        .with_data_mut(|data| data.sessions.undo_game(session_id, role));

    match result {
        Ok(applied) => {
            if applied {
                service.persist(COLLECTION_SESSIONS).await;
            }
            Ok(GatedActionResponse { applied })
        }
        Err(CoreError::NotAuthorized { action }) => {
            warn!(session_id = %session_id, ?role, action, "unauthorized undo suppressed");
            Ok(GatedActionResponse { applied: false })
        }
        Err(e) => Err(e.into()),
    }
}

/// Adjusts a market purchase. The item's current catalog price freezes
/// into the session line on first add.
pub async fn adjust_purchase(
    service: &HallService,
    session_id: &str,
    item: &str,
    delta: i64,
) -> Result<SessionDto, ApiError> {
    debug!(session_id = %session_id, item = %item, delta = delta, "adjust_purchase command");
    let item = validation::validate_item_name(item)
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let session = service.state().with_data_mut(|data| {
        // Decrements only touch existing lines; the price lookup matters
        // on first add, where a missing catalog entry is a real error.
        let unit_price = match data.catalog.price_of(&item) {
            Some(price) => price,
            None if delta > 0 && data
                .sessions
                .get(session_id)
                .is_some_and(|s| !s.market_items.contains_key(&item)) =>
            {
                return Err(ApiError::not_found("Market item", &item));
            }
            None => Money::zero(),
        };

        data.sessions
            .adjust_purchase(session_id, &item, delta, unit_price)
            .map_err(ApiError::from)?;
        data.sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("Session", session_id))
    })?;

    service.persist(COLLECTION_SESSIONS).await;
    Ok(SessionDto::from_session(&session))
}

/// Removes a session. Managers unconditionally; cashiers only an idle one
/// - an active-session removal by a cashier is suppressed as a no-op.
pub async fn remove_session(
    service: &HallService,
    session_id: &str,
    role: StaffRole,
) -> Result<GatedActionResponse, ApiError> {
    debug!(session_id = %session_id, ?role, "remove_session command");

    let result = service
        .state()
        .with_data_mut(|data| data.sessions.remove_session(session_id, role));

    match result {
        Ok(()) => {
            service.persist(COLLECTION_SESSIONS).await;
            info!(session_id = %session_id, "session removed");
            Ok(GatedActionResponse { applied: true })
        }
        Err(CoreError::NotAuthorized { action }) => {
            warn!(session_id = %session_id, ?role, action, "unauthorized removal suppressed");
            Ok(GatedActionResponse { applied: false })
        }
        Err(e) => Err(e.into()),
    }
}

/// Sessions in dashboard order (active first, then waiting).
pub fn list_sessions(service: &HallService) -> Vec<SessionDto> {
    service.state().with_data(|data| {
        data.sessions
            .display_order()
            .into_iter()
            .map(SessionDto::from_session)
            .collect()
    })
}
