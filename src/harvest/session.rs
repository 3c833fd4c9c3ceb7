//! Session harvester - resumable full scan of one source
//!
//! A full scan walks a cursor-paginated source from the beginning to the
//! end, spread over as many bounded sessions as it takes. Each session:
//! - loads the source's checkpoint, cold starting it when no scan is active
//! - fetches pages until the source is exhausted or a budget runs out
//! - persists the checkpoint before a page's items are processed, and again
//!   once they are saved and cached
//!
//! A crash between those two writes leaves a pending cursor behind; the next
//! session fetches that page again first and lets the seen cache drop what was
//! already saved.

use crate::config::HarvestConfig;
use crate::harvest::budget::{BudgetClock, StopReason};
use crate::harvest::HarvestContext;
use crate::provider::PageSource;
use crate::state::{checkpoint_key, Checkpoint, ItemStatus, ScanKind, Source};
use crate::storage::CheckpointStore;
use crate::Result;
use std::fmt;
use std::time::Duration;

/// Where the scan stands at the end of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// The source reported an empty page; the scan is complete
    Done,
    /// A budget ran out; the next session continues from the checkpoint
    Paused(StopReason),
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done => f.write_str("done"),
            Self::Paused(reason) => write!(f, "paused ({})", reason),
        }
    }
}

/// Report of one session, never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub source_id: String,
    pub source_name: String,
    pub status: ScanStatus,
    pub pages_this_session: u32,
    pub items_this_session: u64,
    pub elapsed: Duration,
    /// Checkpoint counters after the session
    pub pages_scanned: u64,
    pub total_collected: u64,
}

impl SessionOutcome {
    pub fn is_done(&self) -> bool {
        self.status == ScanStatus::Done
    }
}

/// Runs bounded full-scan sessions against one page source
pub struct SessionHarvester<'a> {
    config: &'a HarvestConfig,
    pages: &'a dyn PageSource,
    ctx: HarvestContext<'a>,
}

impl<'a> SessionHarvester<'a> {
    pub fn new(
        config: &'a HarvestConfig,
        pages: &'a dyn PageSource,
        ctx: HarvestContext<'a>,
    ) -> Self {
        Self { config, pages, ctx }
    }

    /// Runs one session for `source`
    ///
    /// Budget stops are reported in the outcome. Fetch, cache and sink
    /// failures are returned as errors with the checkpoint left at its last
    /// persisted state.
    pub async fn run(&self, source: &Source) -> Result<SessionOutcome> {
        let key = checkpoint_key(&source.id, ScanKind::FullScan);
        let mut checkpoint = Checkpoint::load(self.ctx.checkpoints, &key)?;

        if checkpoint.active {
            tracing::info!(
                source = %source.id,
                "Resuming full scan at cursor {} ({} pages, {} items so far)",
                checkpoint.short_cursor(),
                checkpoint.pages_scanned,
                checkpoint.total_collected
            );
            if checkpoint.is_replaying() {
                tracing::warn!(
                    source = %source.id,
                    "Previous session stopped mid-page, replaying it first"
                );
            }
        } else {
            tracing::info!(source = %source.id, "Cold start of full scan for {}", source);
            checkpoint = Checkpoint::cold_start();
            checkpoint.save(self.ctx.checkpoints, &key)?;
        }

        let clock = self.ctx.clock;
        let mut budget = BudgetClock::start(
            clock,
            self.config.time_budget(),
            self.config.page_budget,
        );
        let mut items_this_session = 0u64;

        let status = loop {
            if budget.time_exceeded(clock) {
                break ScanStatus::Paused(StopReason::TimeBudget);
            }

            let cursor = checkpoint.fetch_cursor().to_string();
            let page = match self.pages.fetch_page(source, &cursor).await {
                Ok(page) => page,
                // Only the look-ahead for the end of the source is lost
                Err(e) if budget.pages_exhausted() => {
                    tracing::warn!(
                        source = %source.id,
                        "Fetch after the last budgeted page failed: {}",
                        e
                    );
                    break ScanStatus::Paused(StopReason::PageBudget);
                }
                Err(e) => return Err(e),
            };

            let Some(last_id) = page.last().map(|item| item.id.clone()) else {
                checkpoint.exhaust();
                checkpoint.save(self.ctx.checkpoints, &key)?;
                break ScanStatus::Done;
            };

            if budget.pages_exhausted() {
                break ScanStatus::Paused(StopReason::PageBudget);
            }

            checkpoint.begin_page(&cursor, &last_id);
            checkpoint.save(self.ctx.checkpoints, &key)?;
            budget.record_page();

            let fresh = self.ctx.cache.filter_new(&page, &source.id)?;
            if !fresh.is_empty() {
                self.ctx.sink.save(&fresh, source, ItemStatus::New)?;
                self.ctx.cache.remember(&fresh, &source.id)?;
            }

            checkpoint.finish_page(fresh.len() as u64);
            checkpoint.save(self.ctx.checkpoints, &key)?;
            items_this_session += fresh.len() as u64;

            tracing::debug!(
                source = %source.id,
                "Page {}: {} items, {} new, cursor {}",
                checkpoint.pages_scanned,
                page.len(),
                fresh.len(),
                checkpoint.short_cursor()
            );

            clock.sleep(self.config.page_delay()).await;
        };

        let outcome = SessionOutcome {
            source_id: source.id.clone(),
            source_name: source.name.clone(),
            status,
            pages_this_session: budget.pages(),
            items_this_session,
            elapsed: budget.elapsed(clock),
            pages_scanned: checkpoint.pages_scanned,
            total_collected: checkpoint.total_collected,
        };

        match status {
            ScanStatus::Done => tracing::info!(
                source = %source.id,
                "Full scan complete: {} pages, {} items",
                outcome.pages_scanned,
                outcome.total_collected
            ),
            ScanStatus::Paused(reason) => tracing::info!(
                source = %source.id,
                "Session paused, {}: +{} pages, +{} items in {:?}",
                reason,
                outcome.pages_this_session,
                outcome.items_this_session,
                outcome.elapsed
            ),
        }

        Ok(outcome)
    }

    /// Current checkpoint of `source`, without touching it
    pub fn status(store: &dyn CheckpointStore, source: &Source) -> Result<Checkpoint> {
        let key = checkpoint_key(&source.id, ScanKind::FullScan);
        Ok(Checkpoint::load(store, &key)?)
    }

    /// Marks the scan of `source` inactive so the next session cold starts
    pub fn reset(store: &dyn CheckpointStore, source: &Source) -> Result<()> {
        let key = checkpoint_key(&source.id, ScanKind::FullScan);
        let mut checkpoint = Checkpoint::load(store, &key)?;
        checkpoint.deactivate();
        checkpoint.save(store, &key)?;

        tracing::info!(source = %source.id, "Full scan reset");
        Ok(())
    }
}
