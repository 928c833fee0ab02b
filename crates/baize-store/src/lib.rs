//! # baize-store: Persistence Layer for Baize POS
//!
//! Three pieces, one contract:
//!
//! - [`snapshot`] - the [`SnapshotStore`] trait the hosted document store
//!   is consumed through (`get` / `put` / `subscribe`, whole-collection
//!   JSON snapshots keyed by hall), plus [`MemoryStore`] for tests and
//!   single-terminal halls.
//! - [`cache`] - [`LocalCache`], the on-device SQLite fallback written on
//!   every local mutation and read at startup before the remote store
//!   delivers its first snapshot.
//! - [`agent`] - [`SyncAgent`], the debounce-and-snapshot loop between
//!   local state and the store, with echo suppression.
//!
//! ## Consistency Contract
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │             Whole-snapshot, last-write-wins - BY DESIGN              │
//! │                                                                      │
//! │  Terminal A ──┐                                                      │
//! │               ├──► put(collection, FULL snapshot) ──► store          │
//! │  Terminal B ──┘                                            │         │
//! │                                                            ▼         │
//! │               subscribers get the FULL value, overwrite local state  │
//! │                                                                      │
//! │  • No deltas, no merge, no cross-client ordering guarantee.          │
//! │  • Concurrent edits to one collection can clobber each other.        │
//! │  • Acceptable for a handful of staff terminals per hall; do NOT      │
//! │    "fix" with CRDTs - the simplicity is the point.                   │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod agent;
pub mod cache;
pub mod error;
pub mod snapshot;

// =============================================================================
// Re-exports
// =============================================================================

pub use agent::SyncAgent;
pub use cache::{CacheConfig, LocalCache};
pub use error::{StoreError, StoreResult};
pub use snapshot::{CollectionKey, MemoryStore, SnapshotStore, SnapshotSubscription};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Sentinel hall id for the cross-hall partition: the super-admin's user
/// registry and the shared market catalog live under this key instead of a
/// real hall's.
pub const GLOBAL_HALL_ID: &str = "__global__";

/// Default debounce before a dirty collection is pushed to the store.
/// Rapid-fire mutations (clicking +1 game five times) collapse into one
/// snapshot write.
pub const DEFAULT_DEBOUNCE_MS: u64 = 400;
