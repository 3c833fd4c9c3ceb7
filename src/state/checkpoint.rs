//! Durable progress record of a resumable full scan
//!
//! The checkpoint store only knows flat string values. A [`Checkpoint`] is
//! written as one JSON document per `(source, scan kind)` key, so every save
//! replaces all fields at once and a crash can never leave a half-written
//! record behind.

use crate::storage::{CheckpointStore, StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of resumable scan a checkpoint belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanKind {
    FullScan,
}

impl ScanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullScan => "full-scan",
        }
    }
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store key of the checkpoint for one source
pub fn checkpoint_key(source_id: &str, kind: ScanKind) -> String {
    format!("{}:{}", kind.as_str(), source_id)
}

/// Progress of one full scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Whether a full scan is in progress
    pub active: bool,

    /// Id of the last item of the most recent page; empty means start of source
    pub cursor: String,

    /// Pages consumed across all sessions of this scan
    pub pages_scanned: u64,

    /// New (post-dedup) items collected across all sessions of this scan
    pub total_collected: u64,

    /// Cursor that fetched the page whose items are not yet recorded
    #[serde(default)]
    pub pending_cursor: Option<String>,

    /// Set when the source reported its end; cleared by a cold start
    #[serde(default)]
    pub completed: bool,
}

impl Checkpoint {
    /// A fresh scan positioned at the start of the source
    pub fn cold_start() -> Self {
        Self {
            active: true,
            ..Self::default()
        }
    }

    /// Loads the checkpoint, or the inactive default when none was stored
    pub fn load(store: &dyn CheckpointStore, key: &str) -> StorageResult<Self> {
        match store.get(key)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                StorageError::Serialization(format!("checkpoint '{}': {}", key, e))
            }),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, store: &dyn CheckpointStore, key: &str) -> StorageResult<()> {
        let raw = serde_json::to_string(self)
            .map_err(|e| StorageError::Serialization(format!("checkpoint '{}': {}", key, e)))?;
        store.set(key, &raw)
    }

    /// Cursor to fetch next: the in-flight page is replayed before moving on
    pub fn fetch_cursor(&self) -> &str {
        self.pending_cursor.as_deref().unwrap_or(&self.cursor)
    }

    pub fn is_replaying(&self) -> bool {
        self.pending_cursor.is_some()
    }

    /// Advances past a fetched page, marking it in flight
    ///
    /// A replayed page was already counted when it was first fetched.
    pub fn begin_page(&mut self, fetched_with: &str, last_id: &str) {
        if self.pending_cursor.is_none() {
            self.pages_scanned += 1;
        }
        self.pending_cursor = Some(fetched_with.to_string());
        self.cursor = last_id.to_string();
    }

    /// Records the new items of the in-flight page
    pub fn finish_page(&mut self, new_items: u64) {
        self.total_collected += new_items;
        self.pending_cursor = None;
    }

    /// Marks the scan exhausted, keeping the final counters for reporting
    pub fn exhaust(&mut self) {
        self.deactivate();
        self.completed = true;
    }

    /// Stops the scan without claiming the source was read to the end
    pub fn deactivate(&mut self) {
        self.active = false;
        self.pending_cursor = None;
    }

    /// Short form of the cursor for log lines
    pub fn short_cursor(&self) -> String {
        if self.cursor.is_empty() {
            "empty".to_string()
        } else if self.cursor.chars().count() > 8 {
            let head: String = self.cursor.chars().take(8).collect();
            format!("{}...", head)
        } else {
            self.cursor.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;

    #[test]
    fn test_missing_checkpoint_is_idle() {
        let store = SqliteStorage::open_in_memory().unwrap();
        let checkpoint = Checkpoint::load(&store, "full-scan:north").unwrap();

        assert_eq!(checkpoint, Checkpoint::default());
        assert!(!checkpoint.active);
    }

    #[test]
    fn test_save_and_load() {
        let store = SqliteStorage::open_in_memory().unwrap();
        let key = checkpoint_key("north", ScanKind::FullScan);

        let mut checkpoint = Checkpoint::cold_start();
        checkpoint.begin_page("", "item-42");
        checkpoint.save(&store, &key).unwrap();

        let loaded = Checkpoint::load(&store, &key).unwrap();
        assert!(loaded.active);
        assert_eq!(loaded.cursor, "item-42");
        assert_eq!(loaded.pages_scanned, 1);
        assert_eq!(loaded.pending_cursor.as_deref(), Some(""));
    }

    #[test]
    fn test_corrupt_checkpoint_is_an_error() {
        let store = SqliteStorage::open_in_memory().unwrap();
        store.set("full-scan:north", "{not json").unwrap();

        let result = Checkpoint::load(&store, "full-scan:north");
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    #[test]
    fn test_replayed_page_is_not_counted_twice() {
        let mut checkpoint = Checkpoint::cold_start();
        checkpoint.begin_page("", "b");
        assert_eq!(checkpoint.fetch_cursor(), "");
        assert!(checkpoint.is_replaying());

        // Crash here; the next session replays from the pending cursor
        checkpoint.begin_page("", "b");
        checkpoint.finish_page(2);

        assert_eq!(checkpoint.pages_scanned, 1);
        assert_eq!(checkpoint.total_collected, 2);
        assert_eq!(checkpoint.fetch_cursor(), "b");
    }

    #[test]
    fn test_exhaust_keeps_counters() {
        let mut checkpoint = Checkpoint::cold_start();
        checkpoint.begin_page("", "c");
        checkpoint.finish_page(3);
        checkpoint.exhaust();

        assert!(!checkpoint.active);
        assert!(checkpoint.completed);
        assert_eq!(checkpoint.cursor, "c");
        assert_eq!(checkpoint.pages_scanned, 1);
        assert_eq!(checkpoint.total_collected, 3);

        assert!(!Checkpoint::cold_start().completed);
    }

    #[test]
    fn test_deactivate_is_not_completion() {
        let mut checkpoint = Checkpoint::cold_start();
        checkpoint.begin_page("", "c");
        checkpoint.deactivate();

        assert!(!checkpoint.active);
        assert!(!checkpoint.completed);
        assert!(checkpoint.pending_cursor.is_none());
        assert_eq!(checkpoint.pages_scanned, 1);
    }

    #[test]
    fn test_checkpoint_without_completed_field_loads() {
        let store = SqliteStorage::open_in_memory().unwrap();
        store
            .set(
                "full-scan:north",
                r#"{"active":false,"cursor":"c","pages_scanned":2,"total_collected":3}"#,
            )
            .unwrap();

        let checkpoint = Checkpoint::load(&store, "full-scan:north").unwrap();
        assert!(!checkpoint.completed);
        assert!(checkpoint.pending_cursor.is_none());
        assert_eq!(checkpoint.pages_scanned, 2);
    }

    #[test]
    fn test_short_cursor() {
        let mut checkpoint = Checkpoint::default();
        assert_eq!(checkpoint.short_cursor(), "empty");

        checkpoint.cursor = "abc".to_string();
        assert_eq!(checkpoint.short_cursor(), "abc");

        checkpoint.cursor = "0123456789abcdef".to_string();
        assert_eq!(checkpoint.short_cursor(), "01234567...");
    }

    #[test]
    fn test_checkpoint_key() {
        assert_eq!(
            checkpoint_key("north", ScanKind::FullScan),
            "full-scan:north"
        );
    }
}
