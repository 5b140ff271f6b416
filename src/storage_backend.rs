//! Key-value backends: SQLite on disk, or a map in memory

use crate::error::{AssistantError, Result};
use crate::storage_traits::KvStore;
use async_trait::async_trait;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Which backend an assistant persists into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageKind {
    /// `driah.db` inside the data directory
    #[default]
    Sqlite,
    /// Nothing survives the process
    Memory,
}

/// Open the backend selected by `kind`
pub async fn open_store(kind: StorageKind, data_dir: &Path) -> Result<Arc<dyn KvStore>> {
    match kind {
        StorageKind::Sqlite => Ok(Arc::new(SqliteKvStore::open(data_dir).await?)),
        StorageKind::Memory => Ok(Arc::new(MemoryKvStore::new())),
    }
}

/// SQLite-backed key-value store
#[derive(Clone)]
pub struct SqliteKvStore {
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteKvStore")
            .field("pool", &"<SqlitePool>")
            .finish()
    }
}

impl SqliteKvStore {
    /// Open (creating if needed) `driah.db` under `data_dir`
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)?;

        let options = SqliteConnectOptions::new()
            .filename(data_dir.join("driah.db"))
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AssistantError::Migration(e.to_string()))?;

        tracing::debug!("Opened SQLite store in {}", data_dir.display());

        Ok(Self { pool })
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get::<String, _>("value")))
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// In-memory key-value store
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sqlite_round_trip_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = SqliteKvStore::open(dir.path()).await.unwrap();
            store.put("dictionary", "{}").await.unwrap();
            store.put("dictionary", "{\"a\":1}").await.unwrap();
        }

        let store = SqliteKvStore::open(dir.path()).await.unwrap();
        assert_eq!(
            store.get("dictionary").await.unwrap().as_deref(),
            Some("{\"a\":1}")
        );
        assert_eq!(store.get("chat_history").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_store_overwrites() {
        let store = MemoryKvStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.put("k", "one").await.unwrap();
        store.put("k", "two").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("two"));
        assert_eq!(store.backend_name(), "memory");
    }

    #[tokio::test]
    async fn open_store_picks_backend() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(StorageKind::Memory, dir.path()).await.unwrap();
        assert_eq!(store.backend_name(), "memory");

        let store = open_store(StorageKind::Sqlite, dir.path()).await.unwrap();
        assert_eq!(store.backend_name(), "sqlite");
        assert!(dir.path().join("driah.db").exists());
    }
}
