//! # Session Ledger
//!
//! One live session per player currently in the hall, accumulating games
//! (which table, when) and incidental market purchases until checkout.
//!
//! ## Session Lifecycle
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                        Session Lifecycle                             │
//! │                                                                      │
//! │  check-in ──► Session { Idle, 0 games }                              │
//! │                   │                                                  │
//! │                   │  request_game ──► AwaitingTable ──► commit_game  │
//! │                   ▼                                                  │
//! │               Session { Active, games/purchases accumulating }       │
//! │                   │                                                  │
//! │                   │  checkout (ledger::finalize)                     │
//! │                   ▼                                                  │
//! │               Session { Idle again - same id, same player }          │
//! │                   │                                                  │
//! │                   │  remove_session (explicit, role-gated)           │
//! │                   ▼                                                  │
//! │                 gone                                                 │
//! │                                                                      │
//! │  Checkout RESETS the session rather than deleting it, so the player  │
//! │  stays in the waiting list without re-checking-in.                   │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Two-Phase Game Recording
//! Adding a game requires a table number, chosen in a second step:
//! `request_game` parks an explicit [`PendingGameRequest`] on the ledger,
//! `commit_game` consumes it with the chosen table. There is no hidden
//! modal state - the pending request is a value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{map_or_empty, vec_or_empty, MarketLine, SessionState, StaffRole};

// =============================================================================
// Session
// =============================================================================

/// A player's live session.
///
/// `game_starts` and `game_tables` are index-aligned parallel arrays: entry
/// *i* records "a game began at `game_starts[i]` on table `game_tables[i]`".
/// `games_played` always equals their length. At checkout both arrays are
/// copied verbatim into the transaction - that copy is what the table audit
/// later replays.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Session {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Natural key: at most one live session per player name.
    pub player_name: String,

    /// When the player checked in. Survives checkout resets.
    #[ts(as = "String")]
    pub start_time: DateTime<Utc>,

    /// Start instant of each recorded game, in record order.
    #[serde(default, deserialize_with = "vec_or_empty")]
    #[ts(as = "Vec<String>")]
    pub game_starts: Vec<DateTime<Utc>>,

    /// Table of each recorded game; index-aligned with `game_starts`.
    #[serde(default, deserialize_with = "vec_or_empty")]
    pub game_tables: Vec<u32>,

    /// Count of recorded games; invariant: `game_starts.len()`.
    pub games_played: i64,

    /// Per-game rate frozen at session creation. Later changes to the hall
    /// tariff do not reprice an open session.
    pub price_per_game_units: i64,

    /// Open market purchases, keyed by item name.
    #[serde(default, deserialize_with = "map_or_empty")]
    pub market_items: BTreeMap<String, MarketLine>,

    /// Stored lifecycle state; Active ⇔ games or purchases present.
    #[serde(default)]
    pub state: SessionState,
}

impl Session {
    /// Creates an idle session for a freshly checked-in player.
    pub fn new(player_name: &str, price_per_game: Money, now: DateTime<Utc>) -> Self {
        Session {
            id: Uuid::new_v4().to_string(),
            player_name: player_name.to_string(),
            start_time: now,
            game_starts: Vec::new(),
            game_tables: Vec::new(),
            games_played: 0,
            price_per_game_units: price_per_game.units(),
            market_items: BTreeMap::new(),
            state: SessionState::Idle,
        }
    }

    /// Returns the frozen per-game rate as Money.
    #[inline]
    pub fn price_per_game(&self) -> Money {
        Money::from_units(self.price_per_game_units)
    }

    /// Timestamp of the first recorded game, if any. Drives the
    /// oldest-active-first display ordering.
    #[inline]
    pub fn earliest_game_at(&self) -> Option<DateTime<Utc>> {
        self.game_starts.first().copied()
    }

    /// True when the session has nothing billable.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.state == SessionState::Idle
    }

    /// Appends one game record and bumps the counter.
    pub(crate) fn record_game(&mut self, table: u32, now: DateTime<Utc>) {
        self.game_starts.push(now);
        self.game_tables.push(table);
        self.games_played += 1;
        self.refresh_state();
    }

    /// Pops the most recent game record. Returns false (no-op) at zero.
    pub(crate) fn undo_game(&mut self) -> bool {
        if self.game_starts.is_empty() {
            return false;
        }
        self.game_starts.pop();
        self.game_tables.pop();
        self.games_played -= 1;
        self.refresh_state();
        true
    }

    /// Adjusts a market line by `delta`.
    ///
    /// A new line freezes `unit_price` (looked up from the catalog by the
    /// caller); an existing line keeps its frozen price. Quantity dropping
    /// to ≤ 0 removes the line entirely - zero-quantity lines are never
    /// kept.
    pub(crate) fn adjust_purchase(&mut self, item: &str, delta: i64, unit_price: Money) {
        match self.market_items.get_mut(item) {
            Some(line) => {
                line.quantity += delta;
                if line.quantity <= 0 {
                    self.market_items.remove(item);
                }
            }
            None if delta > 0 => {
                self.market_items.insert(
                    item.to_string(),
                    MarketLine {
                        price_units: unit_price.units(),
                        quantity: delta,
                    },
                );
            }
            None => {}
        }
        self.refresh_state();
    }

    /// Zeroes games and purchases after checkout, keeping the row, player
    /// name and check-in time intact. Active → Idle.
    pub(crate) fn reset_after_checkout(&mut self) {
        self.game_starts.clear();
        self.game_tables.clear();
        self.games_played = 0;
        self.market_items.clear();
        self.state = SessionState::Idle;
    }

    fn refresh_state(&mut self) {
        self.state = if self.games_played > 0 || !self.market_items.is_empty() {
            SessionState::Active
        } else {
            SessionState::Idle
        };
    }
}

// =============================================================================
// Pending Game Request
// =============================================================================

/// Explicit state of the two-phase "add a game" flow.
///
/// The table choice is a required sub-step, modeled as a value instead of
/// callback-driven modal state: request → `AwaitingTable` → commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingGameRequest {
    /// Nothing in flight.
    None,
    /// A game increment waiting for its table number.
    AwaitingTable { session_id: String, delta: i64 },
}

impl Default for PendingGameRequest {
    fn default() -> Self {
        PendingGameRequest::None
    }
}

// =============================================================================
// Session Ledger
// =============================================================================

/// All live sessions of one hall, plus the terminal-local pending game
/// request.
///
/// The sessions vector is what syncs as the `sessions` collection snapshot;
/// the pending request is per-terminal UI flow state and never leaves the
/// process.
#[derive(Debug, Default)]
pub struct SessionLedger {
    sessions: Vec<Session>,
    pending: PendingGameRequest,
}

impl SessionLedger {
    pub fn new() -> Self {
        SessionLedger::default()
    }

    /// Serializes the sessions collection for the store.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(&self.sessions).unwrap_or_else(|_| serde_json::Value::Array(vec![]))
    }

    /// Replaces local sessions with a remote snapshot (last-write-wins
    /// overwrite). Anything that is not an array of sessions coerces to
    /// empty; the pending request is terminal-local and survives.
    pub fn apply_snapshot(&mut self, value: serde_json::Value) {
        self.sessions = match value {
            serde_json::Value::Array(items) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        };
    }

    /// Checks in a player.
    ///
    /// Fails with [`CoreError::SessionExists`] if the name already has a
    /// live session - player names are the natural key.
    pub fn start_session(
        &mut self,
        player_name: &str,
        price_per_game: Money,
        now: DateTime<Utc>,
    ) -> CoreResult<Session> {
        if self
            .sessions
            .iter()
            .any(|s| s.player_name == player_name)
        {
            return Err(CoreError::SessionExists(player_name.to_string()));
        }

        let session = Session::new(player_name, price_per_game, now);
        self.sessions.push(session.clone());
        Ok(session)
    }

    /// Looks up a session by id.
    pub fn get(&self, session_id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == session_id)
    }

    /// Mutable lookup for checkout (the transaction ledger resets the
    /// session it finalizes).
    pub fn get_mut(&mut self, session_id: &str) -> CoreResult<&mut Session> {
        self.sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()))
    }

    /// Phase one of recording a game: park the increment until a table is
    /// chosen. A newer request replaces an unanswered one.
    pub fn request_game(&mut self, session_id: &str, delta: i64) -> CoreResult<()> {
        if self.get(session_id).is_none() {
            return Err(CoreError::SessionNotFound(session_id.to_string()));
        }
        self.pending = PendingGameRequest::AwaitingTable {
            session_id: session_id.to_string(),
            delta,
        };
        Ok(())
    }

    /// Discards an unanswered table choice.
    pub fn cancel_request(&mut self) {
        self.pending = PendingGameRequest::None;
    }

    /// Current pending request, for the dashboard's table picker.
    pub fn pending(&self) -> &PendingGameRequest {
        &self.pending
    }

    /// Phase two: commits the pending increment onto `table` at `now`.
    pub fn commit_game(&mut self, table: u32, now: DateTime<Utc>) -> CoreResult<Session> {
        let (session_id, delta) = match std::mem::take(&mut self.pending) {
            PendingGameRequest::AwaitingTable { session_id, delta } => (session_id, delta),
            PendingGameRequest::None => return Err(CoreError::NoPendingGameRequest),
        };

        let session = self.get_mut(&session_id)?;
        for _ in 0..delta.max(1) {
            session.record_game(table, now);
        }
        Ok(session.clone())
    }

    /// Removes the most recent game record. Manager only; at zero games it
    /// is a no-op (returns false).
    pub fn undo_game(&mut self, session_id: &str, role: StaffRole) -> CoreResult<bool> {
        if !role.is_privileged() {
            return Err(CoreError::NotAuthorized {
                action: "undo recorded game",
            });
        }
        Ok(self.get_mut(session_id)?.undo_game())
    }

    /// Adjusts a market purchase line; see [`Session::adjust_purchase`].
    pub fn adjust_purchase(
        &mut self,
        session_id: &str,
        item: &str,
        delta: i64,
        unit_price: Money,
    ) -> CoreResult<()> {
        self.get_mut(session_id)?.adjust_purchase(item, delta, unit_price);
        Ok(())
    }

    /// Removes a session outright.
    ///
    /// Managers may remove any session; cashiers only an idle one -
    /// anything else is an authorization violation the command layer
    /// swallows into a logged no-op.
    pub fn remove_session(&mut self, session_id: &str, role: StaffRole) -> CoreResult<()> {
        let session = self
            .get(session_id)
            .ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()))?;

        if !role.is_privileged() && !session.is_idle() {
            return Err(CoreError::NotAuthorized {
                action: "remove active session",
            });
        }

        self.sessions.retain(|s| s.id != session_id);
        if let PendingGameRequest::AwaitingTable { session_id: pending_id, .. } = &self.pending {
            if pending_id == session_id {
                self.pending = PendingGameRequest::None;
            }
        }
        Ok(())
    }

    /// Sessions in dashboard order: active before waiting; active sorted by
    /// earliest game ascending (longest-playing first), waiting by check-in
    /// time descending (newest arrival first).
    pub fn display_order(&self) -> Vec<&Session> {
        let mut active: Vec<&Session> = self.sessions.iter().filter(|s| !s.is_idle()).collect();
        let mut waiting: Vec<&Session> = self.sessions.iter().filter(|s| s.is_idle()).collect();

        active.sort_by_key(|s| s.earliest_game_at());
        waiting.sort_by(|a, b| b.start_time.cmp(&a.start_time));

        active.extend(waiting);
        active
    }

    /// Iterates sessions in storage order.
    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.iter()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
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

    fn ledger_with_player(name: &str) -> (SessionLedger, String) {
        let mut ledger = SessionLedger::new();
        let id = ledger
            .start_session(name, Money::from_units(1000), t(0))
            .unwrap()
            .id
            .clone();
        (ledger, id)
    }

    #[test]
    fn test_duplicate_player_rejected() {
        let (mut ledger, _) = ledger_with_player("Bat");
        let err = ledger
            .start_session("Bat", Money::from_units(1000), t(1))
            .unwrap_err();
        assert!(matches!(err, CoreError::SessionExists(_)));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_two_phase_game_recording() {
        let (mut ledger, id) = ledger_with_player("Bat");

        // Commit without a request fails.
        assert!(matches!(
            ledger.commit_game(2, t(1)),
            Err(CoreError::NoPendingGameRequest)
        ));

        ledger.request_game(&id, 1).unwrap();
        assert!(matches!(
            ledger.pending(),
            PendingGameRequest::AwaitingTable { .. }
        ));

        let session = ledger.commit_game(2, t(1)).unwrap();
        assert_eq!(session.games_played, 1);
        assert_eq!(session.game_tables, vec![2]);
        assert_eq!(session.game_starts, vec![t(1)]);
        assert_eq!(session.state, SessionState::Active);

        // Request is consumed.
        assert_eq!(*ledger.pending(), PendingGameRequest::None);
    }

    #[test]
    fn test_cancel_request() {
        let (mut ledger, id) = ledger_with_player("Bat");
        ledger.request_game(&id, 1).unwrap();
        ledger.cancel_request();
        assert!(matches!(
            ledger.commit_game(2, t(1)),
            Err(CoreError::NoPendingGameRequest)
        ));
    }

    #[test]
    fn test_undo_requires_manager() {
        let (mut ledger, id) = ledger_with_player("Bat");
        ledger.request_game(&id, 1).unwrap();
        ledger.commit_game(2, t(1)).unwrap();

        assert!(matches!(
            ledger.undo_game(&id, StaffRole::Cashier),
            Err(CoreError::NotAuthorized { .. })
        ));
        assert_eq!(ledger.get(&id).unwrap().games_played, 1);

        assert!(ledger.undo_game(&id, StaffRole::Manager).unwrap());
        let session = ledger.get(&id).unwrap();
        assert_eq!(session.games_played, 0);
        assert!(session.game_starts.is_empty());
        assert_eq!(session.state, SessionState::Idle);

        // Already at zero: no-op, not an error.
        assert!(!ledger.undo_game(&id, StaffRole::Manager).unwrap());
    }

    #[test]
    fn test_purchase_freezes_price_and_drops_empty_lines() {
        let (mut ledger, id) = ledger_with_player("Bat");

        ledger
            .adjust_purchase(&id, "cola", 2, Money::from_units(500))
            .unwrap();
        // Catalog price changed; existing line keeps the frozen rate.
        ledger
            .adjust_purchase(&id, "cola", 1, Money::from_units(700))
            .unwrap();

        let line = &ledger.get(&id).unwrap().market_items["cola"];
        assert_eq!(line.quantity, 3);
        assert_eq!(line.price_units, 500);

        ledger
            .adjust_purchase(&id, "cola", -3, Money::zero())
            .unwrap();
        let session = ledger.get(&id).unwrap();
        assert!(session.market_items.is_empty());
        assert_eq!(session.state, SessionState::Idle);

        // Decrement of an absent line does nothing.
        ledger
            .adjust_purchase(&id, "ghost", -1, Money::zero())
            .unwrap();
        assert!(ledger.get(&id).unwrap().market_items.is_empty());
    }

    #[test]
    fn test_remove_session_role_gate() {
        let (mut ledger, id) = ledger_with_player("Bat");
        ledger.request_game(&id, 1).unwrap();
        ledger.commit_game(1, t(1)).unwrap();

        // Cashier cannot remove an active session.
        assert!(matches!(
            ledger.remove_session(&id, StaffRole::Cashier),
            Err(CoreError::NotAuthorized { .. })
        ));
        assert_eq!(ledger.len(), 1);

        // Manager can, unconditionally.
        ledger.remove_session(&id, StaffRole::Manager).unwrap();
        assert!(ledger.is_empty());

        // Cashier can remove an idle session.
        let (mut ledger, id) = ledger_with_player("Saran");
        ledger.remove_session(&id, StaffRole::Cashier).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_display_order_policy() {
        let mut ledger = SessionLedger::new();
        // Waiting players checked in at t0 and t5.
        ledger
            .start_session("early-waiter", Money::from_units(1000), t(0))
            .unwrap();
        ledger
            .start_session("late-waiter", Money::from_units(1000), t(5))
            .unwrap();
        // Active players: first game at t20 and t10.
        let a1 = ledger
            .start_session("active-late", Money::from_units(1000), t(6))
            .unwrap()
            .id
            .clone();
        let a2 = ledger
            .start_session("active-early", Money::from_units(1000), t(7))
            .unwrap()
            .id
            .clone();
        ledger.request_game(&a1, 1).unwrap();
        ledger.commit_game(1, t(20)).unwrap();
        ledger.request_game(&a2, 1).unwrap();
        ledger.commit_game(2, t(10)).unwrap();

        let names: Vec<&str> = ledger
            .display_order()
            .iter()
            .map(|s| s.player_name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["active-early", "active-late", "late-waiter", "early-waiter"]
        );
    }

    #[test]
    fn test_snapshot_overwrite_is_defensive() {
        let mut ledger = SessionLedger::new();
        ledger
            .start_session("Bat", Money::from_units(1000), t(0))
            .unwrap();

        // Round-trip.
        let snap = ledger.snapshot();
        let mut other = SessionLedger::new();
        other.apply_snapshot(snap);
        assert_eq!(other.len(), 1);
        assert_eq!(other.iter().next().unwrap().player_name, "Bat");

        // Malformed snapshots coerce to empty instead of failing.
        other.apply_snapshot(serde_json::json!({"not": "an array"}));
        assert!(other.is_empty());
        other.apply_snapshot(serde_json::Value::Null);
        assert!(other.is_empty());
    }

    #[test]
    fn test_session_tolerates_missing_arrays() {
        // Snapshot written by an older client: no game logs, no market map.
        let value = serde_json::json!({
            "id": "abc",
            "player_name": "Bat",
            "start_time": "2026-03-14T12:00:00Z",
            "games_played": 0,
            "price_per_game_units": 1000,
            "game_tables": "corrupted"
        });
        let session: Session = serde_json::from_value(value).unwrap();
        assert!(session.game_starts.is_empty());
        assert!(session.game_tables.is_empty());
        assert!(session.market_items.is_empty());
        assert_eq!(session.state, SessionState::Idle);
    }
}
