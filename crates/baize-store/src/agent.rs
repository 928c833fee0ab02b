//! # Sync Agent
//!
//! The debounce-and-snapshot loop between local hall state and the
//! snapshot store. Mutations mark a collection dirty; the agent writes the
//! local cache immediately, then pushes one collapsed full-snapshot write
//! to the store after a short debounce.
//!
//! ## Write Path
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                     queue_write("sessions", …)                       │
//! │                                                                      │
//! │  1. LocalCache.put ── immediately, unconditionally                   │
//! │  2. pending["sessions"] = snapshot   (newer write replaces older -   │
//! │     rapid mutations collapse into one store put)                     │
//! │  3. after debounce: expected_echoes += 1, store.put(full snapshot)   │
//! │                                                                      │
//! │  The put comes back to our own subscription. should_apply_remote     │
//! │  consumes one expected echo and drops it - otherwise the echo would  │
//! │  overwrite newer local state and loop.                               │
//! │                                                                      │
//! │  put FAILED? ── log it, forget the echo, keep local state as the     │
//! │  optimistic truth. No rollback, no retry queue: the next mutation's  │
//! │  debounced write carries the whole collection anyway.                │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::cache::LocalCache;
use crate::error::StoreResult;
use crate::snapshot::{CollectionKey, SnapshotStore, SnapshotSubscription};
use crate::DEFAULT_DEBOUNCE_MS;

// =============================================================================
// Agent State
// =============================================================================

#[derive(Default)]
struct AgentInner {
    /// Latest not-yet-pushed snapshot per collection.
    pending: HashMap<String, Value>,
    /// Collections with a flush task already sleeping.
    scheduled: HashSet<String>,
    /// Store echoes to swallow per collection.
    expected_echoes: HashMap<String, u32>,
}

// =============================================================================
// Sync Agent
// =============================================================================

/// Per-hall synchronization agent. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SyncAgent {
    store: Arc<dyn SnapshotStore>,
    cache: LocalCache,
    hall_id: String,
    debounce: Duration,
    inner: Arc<Mutex<AgentInner>>,
}

impl SyncAgent {
    pub fn new(store: Arc<dyn SnapshotStore>, cache: LocalCache, hall_id: impl Into<String>) -> Self {
        SyncAgent {
            store,
            cache,
            hall_id: hall_id.into(),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            inner: Arc::new(Mutex::new(AgentInner::default())),
        }
    }

    /// Overrides the debounce interval (tests use a short one).
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    fn key(&self, collection: &str) -> CollectionKey {
        CollectionKey::new(self.hall_id.clone(), collection)
    }

    /// Queues a full-collection snapshot for the store and caches it
    /// immediately.
    ///
    /// The cache write happens on every call; the store write is debounced
    /// and collapsed, so five rapid game clicks produce five cache writes
    /// but one store put carrying the final state.
    pub async fn queue_write(&self, collection: &str, value: Value) {
        let key = self.key(collection);

        // Durable local fallback first, regardless of remote health.
        if let Err(e) = self.cache.put(&key, &value).await {
            warn!(key = %key, error = %e, "cache write failed; continuing with in-memory state");
        }

        let spawn_flush = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.pending.insert(collection.to_string(), value);
            inner.scheduled.insert(collection.to_string())
        };

        if spawn_flush {
            let agent = self.clone();
            let collection = collection.to_string();
            tokio::spawn(async move {
                tokio::time::sleep(agent.debounce).await;
                agent.flush(&collection);
            });
        }
    }

    /// Pushes a collection's pending snapshot to the store, if any.
    fn flush(&self, collection: &str) {
        let value = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.scheduled.remove(collection);
            let value = inner.pending.remove(collection);
            if value.is_some() {
                *inner
                    .expected_echoes
                    .entry(collection.to_string())
                    .or_insert(0) += 1;
            }
            value
        };

        let Some(value) = value else { return };

        let key = self.key(collection);
        if let Err(e) = self.store.put(&key, value) {
            // Local optimistic state stays authoritative; the echo we
            // budgeted for will never arrive.
            error!(key = %key, error = %e, "snapshot push failed; keeping local state");
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(count) = inner.expected_echoes.get_mut(collection) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    inner.expected_echoes.remove(collection);
                }
            }
        } else {
            debug!(key = %key, "snapshot pushed");
        }
    }

    /// Decides whether an incoming snapshot for `collection` is a real
    /// remote change (apply it) or the echo of our own put (drop it).
    /// Consumes one expected echo per call that returns false.
    pub fn should_apply_remote(&self, collection: &str) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match inner.expected_echoes.get_mut(collection) {
            Some(count) if *count > 0 => {
                *count -= 1;
                if *count == 0 {
                    inner.expected_echoes.remove(collection);
                }
                debug!(collection = %collection, "own echo suppressed");
                false
            }
            _ => true,
        }
    }

    /// Subscribes to remote pushes for a collection of this hall.
    pub fn subscribe(&self, collection: &str) -> StoreResult<SnapshotSubscription> {
        self.store.subscribe(&self.key(collection))
    }

    /// Reads the cached snapshot for startup hydration, before the remote
    /// subscription has delivered anything.
    pub async fn cached(&self, collection: &str) -> Option<Value> {
        match self.cache.get(&self.key(collection)).await {
            Ok(value) => value,
            Err(e) => {
                warn!(collection = %collection, error = %e, "cache read failed at startup");
                None
            }
        }
    }

    /// Number of collections with an unpushed snapshot, for status views.
    pub fn pending_count(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.pending.len()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use crate::snapshot::MemoryStore;
    use serde_json::json;

    async fn test_agent() -> (Arc<MemoryStore>, SyncAgent) {
        let store = Arc::new(MemoryStore::new());
        let cache = LocalCache::open(CacheConfig::in_memory()).await.unwrap();
        let agent = SyncAgent::new(store.clone(), cache, "hall-1")
            .with_debounce(Duration::from_millis(50));
        (store, agent)
    }

    async fn settle() {
        // Sleeps past the 50ms test debounce so the flush task runs.
        tokio::time::sleep(Duration::from_millis(250)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_rapid_writes_collapse_into_one_put() {
        let (store, agent) = test_agent().await;
        let key = CollectionKey::new("hall-1", "sessions");
        let mut sub = store.subscribe(&key).unwrap();

        agent.queue_write("sessions", json!(1)).await;
        agent.queue_write("sessions", json!(2)).await;
        agent.queue_write("sessions", json!(3)).await;
        settle().await;

        // One store put, carrying the final value.
        assert_eq!(sub.try_recv(), Some(json!(3)));
        assert_eq!(sub.try_recv(), None);
        assert_eq!(store.get(&key).unwrap(), Some(json!(3)));
        assert_eq!(agent.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_own_echo_suppressed_remote_applied() {
        let (store, agent) = test_agent().await;
        let key = CollectionKey::new("hall-1", "sessions");
        let mut sub = agent.subscribe("sessions").unwrap();

        agent.queue_write("sessions", json!(1)).await;
        settle().await;

        // Our own put arrives on our subscription: one echo to swallow.
        let echo = sub.try_recv().unwrap();
        assert_eq!(echo, json!(1));
        assert!(!agent.should_apply_remote("sessions"));

        // Another terminal writes: genuinely remote, apply it.
        store.put(&key, json!(2)).unwrap();
        let remote = sub.try_recv().unwrap();
        assert_eq!(remote, json!(2));
        assert!(agent.should_apply_remote("sessions"));
    }

    #[tokio::test]
    async fn test_cache_written_immediately() {
        let (_store, agent) = test_agent().await;

        agent.queue_write("sessions", json!([1, 2])).await;

        // Before any flush, the cache already has it.
        assert_eq!(agent.cached("sessions").await, Some(json!([1, 2])));
    }

    #[tokio::test]
    async fn test_collections_flush_independently() {
        let (store, agent) = test_agent().await;

        agent.queue_write("sessions", json!("s")).await;
        agent.queue_write("transactions", json!("t")).await;
        settle().await;

        assert_eq!(
            store.get(&CollectionKey::new("hall-1", "sessions")).unwrap(),
            Some(json!("s"))
        );
        assert_eq!(
            store
                .get(&CollectionKey::new("hall-1", "transactions"))
                .unwrap(),
            Some(json!("t"))
        );
    }
}
