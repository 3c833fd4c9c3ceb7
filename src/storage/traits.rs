//! Storage traits and error types
//!
//! These are the durable collaborators the harvest engine talks to. All
//! methods take `&self` so a single backend can play every role at once.

use crate::state::{Item, ItemStatus, Source};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable string key-value store holding checkpoints
///
/// Writes must be visible to later reads in the same invocation and to every
/// later invocation. No multi-key atomicity is assumed.
pub trait CheckpointStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
}

/// Cache of item ids already handed to the sink
pub trait SeenCache {
    /// Returns the items whose ids were never remembered for this source
    ///
    /// Input order is preserved and repeated ids within `items` are kept once.
    fn filter_new(&self, items: &[Item], source_id: &str) -> StorageResult<Vec<Item>>;

    /// Records the ids of `items` as seen for this source
    fn remember(&self, items: &[Item], source_id: &str) -> StorageResult<()>;
}

/// Destination for harvested items
pub trait ItemSink {
    /// Persists items, returning how many rows were written
    fn save(&self, items: &[Item], source: &Source, status: ItemStatus) -> StorageResult<usize>;
}
