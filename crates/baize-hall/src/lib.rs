//! # baize-hall: Command Layer for Baize POS
//!
//! The orchestration layer a dashboard shell drives. Commands run against
//! a [`HallService`], which owns the shared hall state and the store
//! wiring.
//!
//! ## Module Organization
//! ```text
//! baize_hall/
//! ├── lib.rs          ◄─── You are here (wiring, constants, tracing)
//! ├── service.rs      ◄─── HallService: bootstrap, sync loop, persist
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── hall.rs     ◄─── Mutex-guarded hall data + snapshot routing
//! │   └── catalog.rs  ◄─── Market catalog read-model
//! ├── commands/
//! │   ├── session.rs  ◄─── Check-in, games, purchases, removal
//! │   ├── checkout.rs ◄─── Quote + finalize
//! │   ├── debt.rs     ◄─── Debt groups + settlement
//! │   └── audit.rs    ◄─── Table reports, matches, purge
//! └── error.rs        ◄─── ApiError for the frontend
//! ```
//!
//! ## Concurrency Model
//! Single writer per terminal: every mutation runs synchronously under the
//! hall-state mutex in response to one user action. Multi-terminal
//! convergence is entirely the store's whole-snapshot, last-write-wins
//! contract (see `baize-store`) - no locks span terminals, no merging
//! happens anywhere.

pub mod commands;
pub mod error;
pub mod service;
pub mod state;

pub use error::{ApiError, ErrorCode};
pub use service::HallService;
pub use state::{HallData, HallState, MarketCatalog};

use tracing_subscriber::EnvFilter;

// =============================================================================
// Collection Names
// =============================================================================

/// Live sessions, one document per hall.
pub const COLLECTION_SESSIONS: &str = "sessions";

/// Transaction log, one document per hall.
pub const COLLECTION_TRANSACTIONS: &str = "transactions";

/// Hall settings document.
pub const COLLECTION_SETTINGS: &str = "settings";

/// Shared market catalog; lives in the cross-hall partition and is
/// read-only for terminals.
pub const COLLECTION_CATALOG: &str = "market_catalog";

/// Hall-partition collections a terminal syncs bidirectionally.
pub const HALL_COLLECTIONS: [&str; 3] = [
    COLLECTION_SESSIONS,
    COLLECTION_TRANSACTIONS,
    COLLECTION_SETTINGS,
];

// =============================================================================
// Tracing
// =============================================================================

/// Initializes tracing for a terminal process.
///
/// Default level INFO; override with `RUST_LOG` (e.g.
/// `RUST_LOG=baize_store=debug`). Safe to call once at startup, before
/// [`HallService::bootstrap`].
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}
