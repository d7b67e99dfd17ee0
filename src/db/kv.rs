//! SQLite-backed key-value store for engine snapshots

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use super::{try_lock, DbPool};
use crate::engine::{KeyValueStore, StorageError};
#[cfg(feature = "profiling")]
use crate::profiling::EventType;

/// Persists snapshots in the `kv_store` table. Writes go through the shared
/// connection mutex, so they apply in call order.
#[derive(Clone)]
pub struct SqliteStore {
    db: DbPool,
}

impl SqliteStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

fn backend(e: rusqlite::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        #[cfg(feature = "profiling")]
        crate::profile_log!(EventType::DbQuery {
            operation: "select".into(),
            table: "kv_store".into(),
        });

        let conn = try_lock(&self.db).map_err(|_| StorageError::Unavailable)?;
        conn.query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .map_err(backend)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        #[cfg(feature = "profiling")]
        crate::profile_log!(EventType::DbQuery {
            operation: "upsert".into(),
            table: "kv_store".into(),
        });

        let conn = try_lock(&self.db).map_err(|_| StorageError::Unavailable)?;
        conn.execute(
            r#"
    INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
    ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
    "#,
            params![key, value, Utc::now().to_rfc3339()],
        )
        .map_err(backend)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let conn = try_lock(&self.db).map_err(|_| StorageError::Unavailable)?;
        conn.execute("DELETE FROM kv_store WHERE key = ?1", [key])
            .map_err(backend)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let conn = try_lock(&self.db).map_err(|_| StorageError::Unavailable)?;
        conn.execute("DELETE FROM kv_store", []).map_err(backend)?;
        Ok(())
    }
}
