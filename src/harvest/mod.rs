//! Harvest module: the resumable, budgeted harvesting engine
//!
//! This module contains:
//! - `SessionHarvester`: cursor-based full scan of one source, split across
//!   many bounded sessions
//! - `RotationScheduler`: incremental sweep over the whole source pool with a
//!   persisted, rotating start offset
//! - `BudgetClock` / `Clock`: time and page limits checked at loop boundaries

mod budget;
mod clock;
mod rotation;
mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use budget::{BudgetClock, StopReason};
pub use clock::{Clock, ManualClock, SystemClock};
pub use rotation::{RotationScheduler, TickOutcome};
pub use session::{ScanStatus, SessionHarvester, SessionOutcome};

use crate::storage::{CheckpointStore, ItemSink, SeenCache};

/// Durable collaborators and time source shared by both scheduling components
#[derive(Clone, Copy)]
pub struct HarvestContext<'a> {
    pub checkpoints: &'a dyn CheckpointStore,
    pub cache: &'a dyn SeenCache,
    pub sink: &'a dyn ItemSink,
    pub clock: &'a dyn Clock,
}

impl<'a> HarvestContext<'a> {
    /// Context whose storage roles are all played by one backend
    pub fn new<S>(storage: &'a S, clock: &'a dyn Clock) -> Self
    where
        S: CheckpointStore + SeenCache + ItemSink,
    {
        Self {
            checkpoints: storage,
            cache: storage,
            sink: storage,
            clock,
        }
    }
}
