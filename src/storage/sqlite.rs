//! SQLite storage implementation
//!
//! One database file backs all three storage roles: checkpoint store,
//! seen-item cache and item sink.

use crate::state::{Item, ItemStatus, Source};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{CheckpointStore, ItemSink, SeenCache, StorageError, StorageResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    ///
    /// Missing parent directories are created.
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // synchronous = FULL: a checkpoint write must survive power loss, not
        // just process death
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Counts items saved for a source
    pub fn count_items(&self, source_id: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM items WHERE source_id = ?1",
            params![source_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Counts ids remembered by the seen-item cache for a source
    pub fn count_seen(&self, source_id: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM seen_items WHERE source_id = ?1",
            params![source_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn is_seen(&self, source_id: &str, item_id: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM seen_items WHERE source_id = ?1 AND item_id = ?2",
                params![source_id, item_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

impl CheckpointStore for SqliteStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM checkpoints WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO checkpoints (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }
}

impl SeenCache for SqliteStorage {
    fn filter_new(&self, items: &[Item], source_id: &str) -> StorageResult<Vec<Item>> {
        let mut batch_ids = HashSet::new();
        let mut fresh = Vec::new();

        for item in items {
            if !batch_ids.insert(item.id.as_str()) {
                continue;
            }
            if !self.is_seen(source_id, &item.id)? {
                fresh.push(item.clone());
            }
        }

        Ok(fresh)
    }

    fn remember(&self, items: &[Item], source_id: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO seen_items (source_id, item_id, seen_at) VALUES (?1, ?2, ?3)",
            )?;
            for item in items {
                stmt.execute(params![source_id, item.id, now])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

impl ItemSink for SqliteStorage {
    fn save(&self, items: &[Item], source: &Source, status: ItemStatus) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO items (source_id, item_id, source_name, status, payload, saved_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for item in items {
                let payload = serde_json::to_string(item).map_err(|e| {
                    StorageError::Serialization(format!("item '{}': {}", item.id, e))
                })?;
                written += stmt.execute(params![
                    source.id,
                    item.id,
                    source.name,
                    status.to_db_string(),
                    payload,
                    now
                ])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }
}
