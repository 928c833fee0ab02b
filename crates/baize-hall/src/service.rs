//! # Hall Service
//!
//! Wires one terminal together: hall state, the sync agent, and the
//! store subscriptions. Commands (see [`crate::commands`]) run against a
//! `HallService`.
//!
//! ## Startup Sequence
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                     HallService::bootstrap                           │
//! │                                                                      │
//! │  1. Hydrate from LocalCache ── terminal is usable offline            │
//! │  2. Pull current store values ── overwrite cache-hydrated state      │
//! │  3. spawn_sync ── live subscriptions; every push overwrites the      │
//! │     matching collection (echoes of our own writes are suppressed)    │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tracing::{info, warn};

use baize_store::{CollectionKey, LocalCache, SnapshotStore, StoreResult, SyncAgent};

use crate::state::HallState;
use crate::{COLLECTION_CATALOG, HALL_COLLECTIONS};

/// One terminal's handle on its hall. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct HallService {
    state: HallState,
    agent: SyncAgent,
    store: Arc<dyn SnapshotStore>,
    hall_id: String,
}

impl HallService {
    /// Assembles a service without hydration (tests drive state directly).
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        cache: LocalCache,
        hall_id: impl Into<String>,
    ) -> Self {
        let hall_id = hall_id.into();
        HallService {
            state: HallState::new(),
            agent: SyncAgent::new(store.clone(), cache, hall_id.clone()),
            store,
            hall_id,
        }
    }

    /// Full startup: hydrate from the local cache, then from the store's
    /// current values, then start live subscriptions.
    pub async fn bootstrap(
        store: Arc<dyn SnapshotStore>,
        cache: LocalCache,
        hall_id: impl Into<String>,
    ) -> StoreResult<Self> {
        let service = HallService::new(store, cache, hall_id);
        service.hydrate().await;
        service.spawn_sync()?;
        info!(hall_id = %service.hall_id, "hall service ready");
        Ok(service)
    }

    /// Cache first (works offline), store second (fresher wins - the cache
    /// is a fallback, not a second truth).
    async fn hydrate(&self) {
        for collection in HALL_COLLECTIONS {
            if let Some(value) = self.agent.cached(collection).await {
                self.state.apply_snapshot(collection, value);
            }
        }

        for collection in HALL_COLLECTIONS {
            let key = CollectionKey::new(self.hall_id.clone(), collection);
            match self.store.get(&key) {
                Ok(Some(value)) => self.state.apply_snapshot(collection, value),
                Ok(None) => {}
                Err(e) => warn!(key = %key, error = %e, "store read failed at startup"),
            }
        }

        // The shared catalog lives in the cross-hall partition.
        match self.store.get(&CollectionKey::global(COLLECTION_CATALOG)) {
            Ok(Some(value)) => self.state.apply_snapshot(COLLECTION_CATALOG, value),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "catalog read failed at startup"),
        }
    }

    /// Starts one subscription task per synced collection. Each incoming
    /// push either gets dropped (echo of our own write) or overwrites the
    /// matching collection wholesale.
    pub fn spawn_sync(&self) -> StoreResult<()> {
        for collection in HALL_COLLECTIONS {
            let mut subscription = self.agent.subscribe(collection)?;
            let state = self.state.clone();
            let agent = self.agent.clone();
            tokio::spawn(async move {
                while let Some(value) = subscription.recv().await {
                    if agent.should_apply_remote(collection) {
                        state.apply_snapshot(collection, value);
                    }
                }
            });
        }

        // Catalog: read-only for terminals, so no echo bookkeeping.
        let mut subscription = self
            .store
            .subscribe(&CollectionKey::global(COLLECTION_CATALOG))?;
        let state = self.state.clone();
        tokio::spawn(async move {
            while let Some(value) = subscription.recv().await {
                state.apply_snapshot(COLLECTION_CATALOG, value);
            }
        });

        Ok(())
    }

    /// Shared hall state for commands.
    pub fn state(&self) -> &HallState {
        &self.state
    }

    /// Snapshots one collection out of local state and queues it for the
    /// store (cache immediately, store after the debounce).
    pub async fn persist(&self, collection: &str) {
        let value = self.state.with_data(|data| match collection {
            crate::COLLECTION_SESSIONS => data.sessions.snapshot(),
            crate::COLLECTION_TRANSACTIONS => data.transactions.snapshot(),
            crate::COLLECTION_SETTINGS => {
                serde_json::to_value(&data.settings).unwrap_or(serde_json::Value::Null)
            }
            _ => serde_json::Value::Null,
        });
        self.agent.queue_write(collection, value).await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use baize_store::{CacheConfig, MemoryStore, GLOBAL_HALL_ID};
    use serde_json::json;
    use std::time::Duration;

    use crate::COLLECTION_SESSIONS;

    #[tokio::test]
    async fn test_bootstrap_pulls_store_values() {
        let store = Arc::new(MemoryStore::new());
        store
            .put(
                &CollectionKey::new("hall-1", COLLECTION_SESSIONS),
                json!([{
                    "id": "s1",
                    "player_name": "Bat",
                    "start_time": "2026-03-14T12:00:00Z",
                    "games_played": 0,
                    "price_per_game_units": 1000
                }]),
            )
            .unwrap();
        store
            .put(
                &CollectionKey::new(GLOBAL_HALL_ID, COLLECTION_CATALOG),
                json!({"cola": 500}),
            )
            .unwrap();

        let cache = LocalCache::open(CacheConfig::in_memory()).await.unwrap();
        let service = HallService::bootstrap(store, cache, "hall-1").await.unwrap();

        service.state().with_data(|d| {
            assert_eq!(d.sessions.len(), 1);
            assert_eq!(d.catalog.len(), 1);
        });
    }

    #[tokio::test]
    async fn test_remote_push_overwrites_local() {
        let store = Arc::new(MemoryStore::new());
        let cache = LocalCache::open(CacheConfig::in_memory()).await.unwrap();
        let service = HallService::bootstrap(store.clone(), cache, "hall-1")
            .await
            .unwrap();

        // Another terminal replaces the sessions collection.
        store
            .put(
                &CollectionKey::new("hall-1", COLLECTION_SESSIONS),
                json!([{
                    "id": "s9",
                    "player_name": "Saran",
                    "start_time": "2026-03-14T13:00:00Z",
                    "games_played": 0,
                    "price_per_game_units": 1000
                }]),
            )
            .unwrap();

        // Let the subscription task run.
        tokio::time::sleep(Duration::from_millis(100)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        service.state().with_data(|d| {
            assert_eq!(d.sessions.len(), 1);
            assert_eq!(d.sessions.iter().next().unwrap().player_name, "Saran");
        });
    }
}
