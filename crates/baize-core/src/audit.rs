//! # Table Audit / Leak Estimator
//!
//! Rebuilds each table's game timeline for a business day out of the
//! transaction log, then estimates revenue leaked through unrecorded games
//! from anomalously long idle gaps.
//!
//! ## Reconstruction
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │          transactions in the 08:00 → 08:00 business day              │
//! │                                                                      │
//! │  each transaction's game_starts[i] / game_tables[i]                  │
//! │        │   expand, drop table 0 (untracked)                          │
//! │        ▼                                                             │
//! │  (table, started_at, player, transaction) events                     │
//! │        │   partition by table, sort by time                          │
//! │        ▼                                                             │
//! │  table 1: ●────●────●──────────────────●────●                        │
//! │                      └── gap ──┘                                     │
//! │                                                                      │
//! │  gap > max_minutes + 3  ──►  idle: missing += ⌊gap / avg⌋            │
//! │  efficiency = round(recorded / (recorded + missing) × 100)           │
//! │  estimated_loss = missing × current price per game                   │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This is a heuristic estimate, not an exact reconciliation: a long gap
//! can be a genuinely empty table. The audit only reports - it never
//! mutates the ledger. (Purging bad game records is a separate,
//! manager-gated ledger operation.)

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::ledger::Transaction;
use crate::money::Money;
use crate::types::{GameTiming, HallSettings};
use crate::{BUSINESS_DAY_START_HOUR, MATCH_WINDOW_MINUTES, UNTRACKED_TABLE};

// =============================================================================
// Business Day Window
// =============================================================================

/// UTC bounds of a business day: 08:00 local on `date` to 08:00 local the
/// next day. Day-bounded reports everywhere in the system use this window,
/// never midnight-to-midnight - halls close long after midnight.
pub fn business_day_window(
    date: NaiveDate,
    utc_offset_minutes: i32,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let open_local = date.and_time(
        NaiveTime::from_hms_opt(BUSINESS_DAY_START_HOUR, 0, 0)
            .expect("constant hour is valid"),
    );
    let start = Utc.from_utc_datetime(&(open_local - Duration::minutes(utc_offset_minutes as i64)));
    (start, start + Duration::hours(24))
}

// =============================================================================
// Event Reconstruction
// =============================================================================

/// One game-start event, expanded from a transaction's parallel arrays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GameEvent {
    pub table: u32,
    #[ts(as = "String")]
    pub started_at: DateTime<Utc>,
    pub player_name: String,
    pub transaction_id: String,
}

/// Expands transactions into a flat event list, dropping untracked
/// (table 0) games. Index-aligned arrays are zipped, so a malformed
/// snapshot with uneven lengths degrades to the shorter prefix instead of
/// panicking.
pub fn game_events<'a>(transactions: impl Iterator<Item = &'a Transaction>) -> Vec<GameEvent> {
    let mut events = Vec::new();
    for txn in transactions {
        for (started_at, table) in txn.game_starts.iter().zip(txn.game_tables.iter()) {
            if *table == UNTRACKED_TABLE {
                continue;
            }
            events.push(GameEvent {
                table: *table,
                started_at: *started_at,
                player_name: txn.player_name.clone(),
                transaction_id: txn.id.clone(),
            });
        }
    }
    events
}

/// Partitions events by table, each table's timeline sorted ascending.
pub fn events_by_table(events: Vec<GameEvent>) -> BTreeMap<u32, Vec<GameEvent>> {
    let mut tables: BTreeMap<u32, Vec<GameEvent>> = BTreeMap::new();
    for event in events {
        tables.entry(event.table).or_default().push(event);
    }
    for timeline in tables.values_mut() {
        timeline.sort_by_key(|e| e.started_at);
    }
    tables
}

// =============================================================================
// Leak Estimation
// =============================================================================

/// A between-games gap long enough to count as idle time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct IdleGap {
    #[ts(as = "String")]
    pub after_game_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub next_game_at: DateTime<Utc>,
    pub gap_minutes: i64,
}

/// One table's audit for a business day.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TableAuditReport {
    pub table: u32,
    pub timing: GameTiming,
    pub recorded_games: i64,
    pub total_idle_minutes: i64,
    /// Estimated unrecorded games: Σ ⌊gap / avg game duration⌋ over idle
    /// gaps.
    pub missing_games: i64,
    /// `round(recorded / (recorded + missing) × 100)`; 100 for a silent
    /// table.
    pub efficiency_pct: i64,
    /// `missing_games × current price per game`.
    pub estimated_loss_units: i64,
    pub idle_gaps: Vec<IdleGap>,
}

/// Audits one table's sorted timeline against its expected game duration.
pub fn audit_table(
    table: u32,
    timeline: &[GameEvent],
    timing: GameTiming,
    price_per_game: Money,
) -> TableAuditReport {
    let mut total_idle_minutes = 0i64;
    let mut missing_games = 0i64;
    let mut idle_gaps = Vec::new();

    for pair in timeline.windows(2) {
        let gap_minutes = (pair[1].started_at - pair[0].started_at).num_minutes();
        if gap_minutes > timing.idle_threshold_minutes() {
            total_idle_minutes += gap_minutes;
            missing_games += (gap_minutes as f64 / timing.avg_minutes()).floor() as i64;
            idle_gaps.push(IdleGap {
                after_game_at: pair[0].started_at,
                next_game_at: pair[1].started_at,
                gap_minutes,
            });
        }
    }

    let recorded_games = timeline.len() as i64;
    let efficiency_pct = if recorded_games + missing_games == 0 {
        100
    } else {
        (recorded_games as f64 / (recorded_games + missing_games) as f64 * 100.0).round() as i64
    };

    TableAuditReport {
        table,
        timing,
        recorded_games,
        total_idle_minutes,
        missing_games,
        efficiency_pct,
        estimated_loss_units: price_per_game.multiply_quantity(missing_games).units(),
        idle_gaps,
    }
}

/// Full-day audit: one report per configured table, silent tables
/// included. Callers select the day by passing the transactions of a
/// [`business_day_window`] (`ledger.in_window(start, end)`).
pub fn audit_day<'a>(
    transactions: impl Iterator<Item = &'a Transaction>,
    settings: &HallSettings,
) -> Vec<TableAuditReport> {
    let tables = events_by_table(game_events(transactions));
    let empty: Vec<GameEvent> = Vec::new();

    (1..=settings.table_count)
        .map(|table| {
            let timeline = tables.get(&table).unwrap_or(&empty);
            audit_table(
                table,
                timeline,
                settings.timing_for(table),
                settings.price_per_game(),
            )
        })
        .collect()
}

// =============================================================================
// Match Sessions
// =============================================================================

/// Games played together: a run of games on one table within the match
/// window of each other, spanning at least two distinct players.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MatchSession {
    pub table: u32,
    #[ts(as = "String")]
    pub started_at: DateTime<Utc>,
    /// Distinct players in order of first appearance.
    pub players: Vec<String>,
    pub game_count: usize,
}

/// Derives match sessions from the same per-table reconstruction the audit
/// uses: consecutive events ≤ 3 minutes apart cluster; clusters with a
/// single player (solo practice) are dropped.
pub fn match_sessions(events: Vec<GameEvent>) -> Vec<MatchSession> {
    let mut matches = Vec::new();

    for (table, timeline) in events_by_table(events) {
        let mut cluster: Vec<&GameEvent> = Vec::new();

        for event in &timeline {
            let close = cluster.last().is_some_and(|prev| {
                (event.started_at - prev.started_at).num_minutes() <= MATCH_WINDOW_MINUTES
            });
            if cluster.is_empty() || close {
                cluster.push(event);
            } else {
                push_match(table, &cluster, &mut matches);
                cluster = vec![event];
            }
        }
        push_match(table, &cluster, &mut matches);
    }

    matches.sort_by_key(|m| m.started_at);
    matches
}

fn push_match(table: u32, cluster: &[&GameEvent], out: &mut Vec<MatchSession>) {
    let mut players: Vec<String> = Vec::new();
    for event in cluster {
        if !players.contains(&event.player_name) {
            players.push(event.player_name.clone());
        }
    }
    if players.len() < 2 {
        return;
    }
    out.push(MatchSession {
        table,
        started_at: cluster[0].started_at,
        players,
        game_count: cluster.len(),
    });
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::types::PaymentMethod;
    use crate::TransactionLedger;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, hour, minute, 0).unwrap()
    }

    fn txn_with_games(player: &str, games: &[(u32, DateTime<Utc>)]) -> Transaction {
        let mut session = Session::new(player, Money::from_units(1000), at(9, 0));
        for (table, started) in games {
            session.record_game(*table, *started);
        }
        let mut ledger = TransactionLedger::new();
        ledger
            .finalize(
                &mut session,
                &HallSettings::default(),
                PaymentMethod::Cash,
                Money::from_units(1000 * games.len() as i64),
                "staff-1",
                None,
                games.last().map(|g| g.1).unwrap_or_else(|| at(9, 0)),
            )
            .unwrap()
    }

    #[test]
    fn test_business_day_window() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();

        // UTC hall: 08:00 on the 14th to 08:00 on the 15th.
        let (start, end) = business_day_window(date, 0);
        assert_eq!(start, at(8, 0));
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 3, 15, 8, 0, 0).unwrap());

        // UTC+8 hall opens at midnight UTC.
        let (start, _) = business_day_window(date, 8 * 60);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_event_round_trip() {
        // Expanding a transaction reproduces exactly its (table, time)
        // pairs - no loss, no duplication.
        let games = vec![
            (1u32, at(10, 0)),
            (2, at(10, 20)),
            (1, at(10, 40)),
            (3, at(11, 0)),
        ];
        let txn = txn_with_games("Bat", &games);

        let events = game_events(std::iter::once(&txn));
        let pairs: Vec<(u32, DateTime<Utc>)> =
            events.iter().map(|e| (e.table, e.started_at)).collect();
        assert_eq!(pairs, games);

        // Empty transaction expands to nothing.
        let empty = txn_with_games("Idle", &[]);
        assert!(game_events(std::iter::once(&empty)).is_empty());
    }

    #[test]
    fn test_untracked_table_filtered() {
        let txn = txn_with_games("Bat", &[(0, at(10, 0)), (2, at(10, 20))]);
        let events = game_events(std::iter::once(&txn));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].table, 2);
    }

    #[test]
    fn test_gap_boundary() {
        let timing = GameTiming {
            min_minutes: 10,
            max_minutes: 15,
        };
        let price = Money::from_units(1000);

        // 18-minute gap == max + grace: not idle.
        let txn = txn_with_games("Bat", &[(1, at(10, 0)), (1, at(10, 18))]);
        let tables = events_by_table(game_events(std::iter::once(&txn)));
        let report = audit_table(1, &tables[&1], timing, price);
        assert_eq!(report.missing_games, 0);
        assert_eq!(report.total_idle_minutes, 0);
        assert!(report.idle_gaps.is_empty());
        assert_eq!(report.efficiency_pct, 100);

        // 19-minute gap: idle, ⌊19 / 12.5⌋ = 1 missing game.
        let txn = txn_with_games("Bat", &[(1, at(10, 0)), (1, at(10, 19))]);
        let tables = events_by_table(game_events(std::iter::once(&txn)));
        let report = audit_table(1, &tables[&1], timing, price);
        assert_eq!(report.missing_games, 1);
        assert_eq!(report.total_idle_minutes, 19);
        assert_eq!(report.idle_gaps.len(), 1);
        assert_eq!(report.estimated_loss_units, 1000);
        // 2 recorded, 1 missing: round(2/3 × 100) = 67.
        assert_eq!(report.efficiency_pct, 67);
    }

    #[test]
    fn test_long_gap_counts_multiple_games() {
        let timing = GameTiming {
            min_minutes: 10,
            max_minutes: 15,
        };
        // 40-minute gap: ⌊40 / 12.5⌋ = 3 estimated games.
        let txn = txn_with_games("Bat", &[(1, at(10, 0)), (1, at(10, 40))]);
        let tables = events_by_table(game_events(std::iter::once(&txn)));
        let report = audit_table(1, &tables[&1], timing, Money::from_units(1500));
        assert_eq!(report.missing_games, 3);
        assert_eq!(report.estimated_loss_units, 4500);
    }

    #[test]
    fn test_audit_day_covers_every_table() {
        let settings = HallSettings {
            table_count: 3,
            ..HallSettings::default()
        };
        let txn = txn_with_games("Bat", &[(2, at(10, 0)), (2, at(10, 12))]);
        let transactions = vec![txn];

        let reports = audit_day(transactions.iter(), &settings);
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].table, 1);
        assert_eq!(reports[0].recorded_games, 0);
        assert_eq!(reports[0].efficiency_pct, 100);
        assert_eq!(reports[1].recorded_games, 2);
        assert_eq!(reports[2].recorded_games, 0);
    }

    #[test]
    fn test_cross_transaction_timeline() {
        // Events from different checkouts interleave on one table.
        let a = txn_with_games("Bat", &[(1, at(10, 0)), (1, at(10, 30))]);
        let b = txn_with_games("Saran", &[(1, at(10, 12))]);
        let timing = GameTiming {
            min_minutes: 10,
            max_minutes: 15,
        };

        let tables = events_by_table(game_events([&a, &b].into_iter()));
        let report = audit_table(1, &tables[&1], timing, Money::from_units(1000));
        // Sorted: 10:00, 10:12, 10:30 - both gaps ≤ 18, nothing idle.
        assert_eq!(report.recorded_games, 3);
        assert_eq!(report.missing_games, 0);
    }

    #[test]
    fn test_match_sessions_cluster_distinct_players() {
        // Bat and Saran trade games on table 1 within 3 minutes of each
        // other; a lone practice game sits far apart on table 2.
        let a = txn_with_games("Bat", &[(1, at(10, 0)), (1, at(10, 4)), (2, at(12, 0))]);
        let b = txn_with_games("Saran", &[(1, at(10, 2)), (1, at(10, 6))]);

        let matches = match_sessions(game_events([&a, &b].into_iter()));
        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert_eq!(m.table, 1);
        assert_eq!(m.started_at, at(10, 0));
        assert_eq!(m.players, vec!["Bat".to_string(), "Saran".to_string()]);
        assert_eq!(m.game_count, 4);
    }

    #[test]
    fn test_solo_cluster_not_a_match() {
        let a = txn_with_games("Bat", &[(1, at(10, 0)), (1, at(10, 2)), (1, at(10, 4))]);
        let matches = match_sessions(game_events(std::iter::once(&a)));
        assert!(matches.is_empty());
    }
}
