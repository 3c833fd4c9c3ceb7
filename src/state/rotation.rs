use crate::storage::{CheckpointStore, StorageError, StorageResult};

/// Store key of the rotation offset shared by the whole source pool
pub const ROTATION_KEY: &str = "rotation:last_store_index";

/// Where the next scheduling tick starts in the source pool
///
/// The offset is a ring index, not a source identity: if the pool changes
/// size between ticks it is reduced modulo the new size before use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotationState {
    pub last_store_index: usize,
}

impl RotationState {
    pub fn load(store: &dyn CheckpointStore) -> StorageResult<Self> {
        let last_store_index = match store.get(ROTATION_KEY)? {
            Some(raw) => raw.trim().parse().map_err(|_| {
                StorageError::Serialization(format!(
                    "rotation offset '{}' is not a non-negative integer",
                    raw
                ))
            })?,
            None => 0,
        };
        Ok(Self { last_store_index })
    }

    pub fn save(&self, store: &dyn CheckpointStore) -> StorageResult<()> {
        store.set(ROTATION_KEY, &self.last_store_index.to_string())
    }

    /// Stored offset reduced to the current pool size
    pub fn offset_for(&self, pool_size: usize) -> usize {
        if pool_size == 0 {
            0
        } else {
            self.last_store_index % pool_size
        }
    }
}

/// Cyclic left rotation: elements before `offset` move to the end
pub fn rotate<T: Clone>(items: &[T], offset: usize) -> Vec<T> {
    let mut rotated = items.to_vec();
    if !rotated.is_empty() {
        rotated.rotate_left(offset % items.len());
    }
    rotated
}
