//! # Local Snapshot Cache
//!
//! On-device SQLite cache of collection snapshots, keyed
//! `(hall_id, collection)`. Written on every local mutation regardless of
//! remote sync success; read at startup so a terminal boots with
//! yesterday's state before the remote subscription delivers.
//!
//! ## Startup Sequence
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                        Terminal Startup                              │
//! │                                                                      │
//! │  LocalCache::open ──► WAL mode, schema ensured                       │
//! │        │                                                             │
//! │        ▼                                                             │
//! │  get("sessions"), get("transactions"), ... ──► hydrate hall state    │
//! │        │                                                             │
//! │        ▼                                                             │
//! │  remote subscription's first snapshot OVERWRITES the hydrated state  │
//! │  (last-write-wins; the cache is a fallback, not a second truth)      │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::snapshot::CollectionKey;

// =============================================================================
// Schema
// =============================================================================

/// One row per cached collection; idempotent setup, run at every open.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS snapshots (
    hall_id    TEXT NOT NULL,
    collection TEXT NOT NULL,
    payload    TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (hall_id, collection)
)
"#;

// =============================================================================
// Configuration
// =============================================================================

/// Cache database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = CacheConfig::new("/path/to/baize-cache.db").max_connections(2);
/// let cache = LocalCache::open(config).await?;
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Path to the SQLite file; created if missing.
    pub database_path: PathBuf,

    /// Pool size. A snapshot KV table needs very few connections.
    pub max_connections: u32,

    /// Connection acquire timeout.
    pub connect_timeout: Duration,
}

impl CacheConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CacheConfig {
            database_path: path.into(),
            max_connections: 2,
            connect_timeout: Duration::from_secs(30),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// In-memory cache for tests: isolated, gone on drop.
    pub fn in_memory() -> Self {
        CacheConfig {
            database_path: PathBuf::from(":memory:"),
            // In-memory SQLite lives per-connection; a second connection
            // would see an empty database.
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

// =============================================================================
// Local Cache
// =============================================================================

/// Handle to the on-device snapshot cache.
#[derive(Debug, Clone)]
pub struct LocalCache {
    pool: SqlitePool,
}

impl LocalCache {
    /// Opens (creating if missing) the cache database and ensures the
    /// schema. WAL mode for concurrent reads, NORMAL synchronous.
    pub async fn open(config: CacheConfig) -> StoreResult<Self> {
        info!(path = %config.database_path.display(), "Opening snapshot cache");

        let connect_url = if config.database_path == PathBuf::from(":memory:") {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite://{}?mode=rwc", config.database_path.display())
        };

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        sqlx::query(SCHEMA_SQL)
            .execute(&pool)
            .await
            .map_err(|e| StoreError::SchemaFailed(e.to_string()))?;

        Ok(LocalCache { pool })
    }

    /// Upserts one collection snapshot.
    pub async fn put(&self, key: &CollectionKey, value: &Value) -> StoreResult<()> {
        let payload = serde_json::to_string(value)?;
        let updated_at = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO snapshots (hall_id, collection, payload, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (hall_id, collection)
            DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at
            "#,
        )
        .bind(&key.hall_id)
        .bind(&key.collection)
        .bind(&payload)
        .bind(&updated_at)
        .execute(&self.pool)
        .await?;

        debug!(key = %key, bytes = payload.len(), "snapshot cached");
        Ok(())
    }

    /// Reads one cached snapshot. An unparseable payload (disk corruption,
    /// a much older client) reads as absent rather than failing startup.
    pub async fn get(&self, key: &CollectionKey) -> StoreResult<Option<Value>> {
        let payload: Option<String> = sqlx::query_scalar(
            r#"
            SELECT payload FROM snapshots
            WHERE hall_id = ?1 AND collection = ?2
            "#,
        )
        .bind(&key.hall_id)
        .bind(&key.collection)
        .fetch_optional(&self.pool)
        .await?;

        match payload {
            Some(text) => match serde_json::from_str(&text) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    warn!(key = %key, error = %e, "discarding unparseable cached snapshot");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Removes one cached snapshot.
    pub async fn remove(&self, key: &CollectionKey) -> StoreResult<()> {
        sqlx::query(
            r#"
            DELETE FROM snapshots WHERE hall_id = ?1 AND collection = ?2
            "#,
        )
        .bind(&key.hall_id)
        .bind(&key.collection)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Collection names cached for a hall, for startup hydration.
    pub async fn collections_for(&self, hall_id: &str) -> StoreResult<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT collection FROM snapshots WHERE hall_id = ?1 ORDER BY collection
            "#,
        )
        .bind(hall_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(names)
    }

    /// Closes the pool. Call on terminal shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
