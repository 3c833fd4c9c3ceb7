//! Storage module for persisting harvest state
//!
//! This module handles all durable state of the harvester:
//! - the flat key-value checkpoint store (full-scan checkpoints, rotation offset)
//! - the seen-item cache used for duplicate suppression
//! - the item sink receiving harvested items

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{CheckpointStore, ItemSink, SeenCache, StorageError, StorageResult};

use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}
