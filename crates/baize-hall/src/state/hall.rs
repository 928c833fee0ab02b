//! # Hall State
//!
//! The one mutable state object of a terminal: session ledger, transaction
//! ledger, settings snapshot, and the market catalog read-model, behind a
//! single mutex.
//!
//! ## Thread Safety
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                      HallState Operations                            │
//! │                                                                      │
//! │  Dashboard Action        Command               State Change          │
//! │  ────────────────        ─────────             ────────────          │
//! │  Check in player ──────► check_in() ─────────► sessions.push         │
//! │  Click +1 game ────────► request_game() ─────► pending request       │
//! │  Pick table ───────────► choose_table() ─────► game recorded         │
//! │  Checkout ─────────────► checkout() ─────────► txn appended,         │
//! │                                                session reset         │
//! │  Remote snapshot ──────► apply_remote() ─────► collection overwrite  │
//! │                                                                      │
//! │  One Mutex over the whole HallData: commands are quick, mutate       │
//! │  multiple collections atomically (checkout touches sessions AND      │
//! │  transactions), and never hold the lock across an await.             │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex};
use tracing::warn;

use baize_core::{HallSettings, SessionLedger, TransactionLedger};

use super::catalog::MarketCatalog;
use crate::{COLLECTION_CATALOG, COLLECTION_SESSIONS, COLLECTION_SETTINGS, COLLECTION_TRANSACTIONS};

/// Everything a terminal knows about its hall.
#[derive(Debug, Default)]
pub struct HallData {
    pub sessions: SessionLedger,
    pub transactions: TransactionLedger,
    pub settings: HallSettings,
    pub catalog: MarketCatalog,
}

/// Shared, mutex-guarded hall state.
#[derive(Clone, Default)]
pub struct HallState {
    inner: Arc<Mutex<HallData>>,
}

impl HallState {
    pub fn new() -> Self {
        HallState::default()
    }

    /// Executes a function with read access to the hall data.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let count = state.with_data(|d| d.sessions.len());
    /// ```
    pub fn with_data<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&HallData) -> R,
    {
        let data = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&data)
    }

    /// Executes a function with write access to the hall data.
    pub fn with_data_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut HallData) -> R,
    {
        let mut data = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut data)
    }

    /// Applies a remote (or cached) collection snapshot: a wholesale
    /// overwrite of that collection, last write wins. Unknown collection
    /// names are logged and dropped - an older terminal may sync
    /// collections this build doesn't model.
    pub fn apply_snapshot(&self, collection: &str, value: serde_json::Value) {
        self.with_data_mut(|data| match collection {
            COLLECTION_SESSIONS => data.sessions.apply_snapshot(value),
            COLLECTION_TRANSACTIONS => data.transactions.apply_snapshot(value),
            COLLECTION_SETTINGS => {
                data.settings = serde_json::from_value(value).unwrap_or_default();
            }
            COLLECTION_CATALOG => data.catalog.apply_snapshot(value),
            other => warn!(collection = %other, "ignoring snapshot for unknown collection"),
        });
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
