//! # Snapshot Store Contract
//!
//! The hosted document store, as the core consumes it: three operations
//! over whole-collection JSON values keyed by `(hall_id, collection)`.
//!
//! ## Contract
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                        SnapshotStore                                 │
//! │                                                                      │
//! │  get(key)            ──► current full value, if any                  │
//! │  put(key, value)     ──► REPLACE the stored value wholesale          │
//! │  subscribe(key)      ──► push of every subsequent full value         │
//! │                                                                      │
//! │  Last-write-wins, no merge, no cross-client ordering guarantee.      │
//! │  A subscriber also hears its own puts - callers that round-trip      │
//! │  local state through the store suppress that echo (see agent.rs).    │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::StoreResult;

// =============================================================================
// Collection Key
// =============================================================================

/// Addresses one stored collection: a hall (tenant) and a collection name.
///
/// The [`crate::GLOBAL_HALL_ID`] sentinel addresses the cross-hall
/// partition (shared market catalog, super-admin registry).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionKey {
    pub hall_id: String,
    pub collection: String,
}

impl CollectionKey {
    pub fn new(hall_id: impl Into<String>, collection: impl Into<String>) -> Self {
        CollectionKey {
            hall_id: hall_id.into(),
            collection: collection.into(),
        }
    }

    /// Key into the cross-hall partition.
    pub fn global(collection: impl Into<String>) -> Self {
        CollectionKey::new(crate::GLOBAL_HALL_ID, collection)
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.hall_id, self.collection)
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// Receiving end of a collection subscription. Dropping it unsubscribes -
/// the store prunes closed channels on the next push.
pub struct SnapshotSubscription {
    receiver: mpsc::UnboundedReceiver<Value>,
}

impl SnapshotSubscription {
    pub(crate) fn new(receiver: mpsc::UnboundedReceiver<Value>) -> Self {
        SnapshotSubscription { receiver }
    }

    /// Waits for the next full-value push. `None` once the store is gone.
    pub async fn recv(&mut self) -> Option<Value> {
        self.receiver.recv().await
    }

    /// Non-blocking poll, for drain loops and tests.
    pub fn try_recv(&mut self) -> Option<Value> {
        self.receiver.try_recv().ok()
    }
}

// =============================================================================
// Snapshot Store Trait
// =============================================================================

/// The two-and-a-half operations the whole system needs from its hosted
/// store. Implementations are thread-safe handles; cloning the handle (via
/// `Arc`) shares the underlying store.
pub trait SnapshotStore: Send + Sync {
    /// Reads the current full value for a key, if one was ever written.
    fn get(&self, key: &CollectionKey) -> StoreResult<Option<Value>>;

    /// Replaces the entire stored value for a key and pushes it to every
    /// live subscriber of that key - including the writer's own
    /// subscription, which is why the sync agent counts expected echoes.
    fn put(&self, key: &CollectionKey, value: Value) -> StoreResult<()>;

    /// Subscribes to subsequent full-value pushes for a key.
    fn subscribe(&self, key: &CollectionKey) -> StoreResult<SnapshotSubscription>;
}

// =============================================================================
// Memory Store
// =============================================================================

/// In-process [`SnapshotStore`]: a map plus fan-out channels.
///
/// Used by tests and by single-terminal halls running without a hosted
/// account. Faithful to the hosted contract: whole values, last write
/// wins, subscribers (self included) hear every put.
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<CollectionKey, Value>>,
    subscribers: Mutex<HashMap<CollectionKey, Vec<mpsc::UnboundedSender<Value>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn get(&self, key: &CollectionKey) -> StoreResult<Option<Value>> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn put(&self, key: &CollectionKey, value: Value) -> StoreResult<()> {
        {
            let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
            values.insert(key.clone(), value.clone());
        }

        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(senders) = subscribers.get_mut(key) {
            // Push to live subscribers; closed ones unsubscribe here.
            senders.retain(|tx| tx.send(value.clone()).is_ok());
        }

        debug!(key = %key, "snapshot stored");
        Ok(())
    }

    fn subscribe(&self, key: &CollectionKey) -> StoreResult<SnapshotSubscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.entry(key.clone()).or_default().push(tx);
        Ok(SnapshotSubscription::new(rx))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
