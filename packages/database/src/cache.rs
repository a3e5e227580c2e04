//! Verdict cache stored in `DuckDB`.
//!
//! Values are serialized [`DebugResult`]s so a hit can be replayed with or
//! without the evidence trail.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use duckdb::Connection;
use openpaq_models::DebugResult;

use crate::DbError;

/// Key/value store for finished verdicts.
#[async_trait::async_trait]
pub trait ResultCache: Send + Sync {
    /// Returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the lookup fails.
    async fn get(&self, key: &str) -> Result<Option<String>, DbError>;

    /// Stores `value` under `key`, replacing any earlier value.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the write fails.
    async fn put(&self, key: &str, value: &str) -> Result<(), DbError>;
}

/// Looks up and deserializes a cached verdict.
///
/// # Errors
///
/// Returns [`DbError`] if the lookup fails or the stored value is not a
/// verdict.
pub async fn load_result(
    cache: &dyn ResultCache,
    key: &str,
) -> Result<Option<DebugResult>, DbError> {
    let Some(value) = cache.get(key).await? else {
        return Ok(None);
    };

    Ok(Some(serde_json::from_str(&value)?))
}

/// Serializes and stores a verdict.
///
/// # Errors
///
/// Returns [`DbError`] if serialization or the write fails.
pub async fn store_result(
    cache: &dyn ResultCache,
    key: &str,
    result: &DebugResult,
) -> Result<(), DbError> {
    let value = serde_json::to_string(result)?;
    cache.put(key, &value).await
}

/// [`ResultCache`] in a `DuckDB` table.
///
/// Queries run on the blocking pool.
#[derive(Clone)]
pub struct DuckDbResultCache {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for DuckDbResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbResultCache").finish_non_exhaustive()
    }
}

impl DuckDbResultCache {
    /// Opens (or creates) the cache database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or schema creation fails.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            crate::paths::ensure_dir(parent)?;
        }

        Self::new(Connection::open(path)?)
    }

    /// Creates a cache that lives only as long as the process.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or schema creation fails.
    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::new(Connection::open_in_memory()?)
    }

    /// Wraps an open connection, creating the cache table if needed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if schema creation fails.
    pub fn new(conn: Connection) -> Result<Self, DbError> {
        create_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS result_cache (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
        );",
    )?;
    Ok(())
}

#[async_trait::async_trait]
impl ResultCache for DuckDbResultCache {
    async fn get(&self, key: &str) -> Result<Option<String>, DbError> {
        let conn = self.conn.clone();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            let mut stmt = conn.prepare("SELECT value FROM result_cache WHERE key = ?")?;
            let mut rows = stmt.query(duckdb::params![key])?;

            let value: Option<String> = match rows.next()? {
                Some(row) => Some(row.get(0)?),
                None => None,
            };

            Ok(value)
        })
        .await?
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), DbError> {
        let conn = self.conn.clone();
        let key = key.to_string();
        let value = value.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            conn.execute(
                "INSERT OR REPLACE INTO result_cache (key, value) VALUES (?, ?)",
                duckdb::params![key, value],
            )?;
            Ok(())
        })
        .await?
    }
}
