//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `Checkpoint`: durable progress of one source's resumable full scan
//! - `RotationState`: where the next rotation tick starts in the source pool
//! - `Source` / `Item`: the values flowing between collaborators

mod checkpoint;
mod rotation;
mod source;

// Re-export main types
pub use checkpoint::{checkpoint_key, Checkpoint, ScanKind};
pub use rotation::{rotate, RotationState, ROTATION_KEY};
pub use source::{Item, ItemStatus, Source};
