// SQLite-backed key-value storage

use crate::error::{Result, StoreError};
use crate::storage::Storage;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use tracing::debug;

/// Key-value storage in a single SQLite table
pub struct SqliteStorage {
    db: Connection,
}

impl SqliteStorage {
    /// Open or create a database file at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = Connection::open(path.as_ref()).map_err(|e| sql_error("open database", e))?;
        Self::init(db)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().map_err(|e| sql_error("open database", e))?;
        Self::init(db)
    }

    fn init(db: Connection) -> Result<Self> {
        let storage = Self { db };
        storage.create_schema()?;
        Ok(storage)
    }

    fn create_schema(&self) -> Result<()> {
        debug!("Creating key-value schema");

        self.db
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS kv (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                "#,
            )
            .map_err(|e| sql_error("create schema", e))?;

        Ok(())
    }
}

impl Storage for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.db
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .map_err(|e| sql_error("read key", e))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .execute(
                "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![key, value, Utc::now().timestamp_millis()],
            )
            .map_err(|e| sql_error("write key", e))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.db
            .execute("DELETE FROM kv WHERE key = ?1", [key])
            .map_err(|e| sql_error("remove key", e))?;
        Ok(())
    }
}

fn sql_error(action: &str, err: rusqlite::Error) -> StoreError {
    StoreError::StorageUnavailable(format!("failed to {}: {}", action, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sqlite_storage_roundtrip() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        assert_eq!(storage.get("glassmorphism_todos").unwrap(), None);

        storage.set("glassmorphism_todos", "[]").unwrap();
        storage.set("glassmorphism_todos", r#"[{"id":"a"}]"#).unwrap();
        assert_eq!(
            storage.get("glassmorphism_todos").unwrap().as_deref(),
            Some(r#"[{"id":"a"}]"#)
        );

        storage.remove("glassmorphism_todos").unwrap();
        assert_eq!(storage.get("glassmorphism_todos").unwrap(), None);
    }

    #[test]
    fn test_sqlite_storage_persists_across_opens() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("glasstodo.db");

        {
            let storage = SqliteStorage::open(&db_path).unwrap();
            storage.set("glassmorphism_preferences", r#"{"theme":"dark"}"#).unwrap();
        }

        let storage = SqliteStorage::open(&db_path).unwrap();
        assert_eq!(
            storage.get("glassmorphism_preferences").unwrap().as_deref(),
            Some(r#"{"theme":"dark"}"#)
        );
    }
}
