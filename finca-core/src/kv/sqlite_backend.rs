//! SQLite key-value backend
//!
//! Stores every key in a single `kv` table inside one database file,
//! which suits devices where many small files are inconvenient.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::traits::{check_key, BackendType, KeyValueStore};
use crate::error::KvError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS kv (
    key        TEXT PRIMARY KEY,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

/// SQLite backend implementation
pub struct SqliteBackend {
    path: PathBuf,
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    /// Opens (or creates) the database at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, KvError> {
        let path = path.as_ref().to_path_buf();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| KvError::io(parent, e))?;
        }

        let conn = Connection::open(&path)?;

        // WAL lets readers proceed while a write is in flight
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Returns the path to the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `f` with the connection on the blocking thread pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T, KvError>
    where
        F: FnOnce(&Connection) -> Result<T, KvError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| KvError::Poisoned)?;
            f(&conn)
        })
        .await
        .map_err(|e| KvError::Task(e.to_string()))?
    }
}

#[async_trait]
impl KeyValueStore for SqliteBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Sqlite
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        check_key(key)?;
        let key = key.to_string();
        self.with_conn(move |conn| {
            conn.query_row("SELECT value FROM kv WHERE key = ?1", [&key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
            .map_err(KvError::from)
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        check_key(key)?;
        let key = key.to_string();
        let value = value.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                updated_at = excluded.updated_at",
                params![key, value, chrono::Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<(), KvError> {
        check_key(key)?;
        let key = key.to_string();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM kv WHERE key = ?1", [&key])?;
            Ok(())
        })
        .await
    }

    async fn keys(&self) -> Result<Vec<String>, KvError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key FROM kv ORDER BY key")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut keys = Vec::new();
            for key in rows {
                keys.push(key?);
            }
            Ok(keys)
        })
        .await
    }
}
