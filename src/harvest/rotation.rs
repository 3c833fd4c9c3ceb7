//! Rotation scheduler - one fair incremental sweep over the source pool
//!
//! Every tick visits the pool starting at a persisted offset and gives each
//! source one bounded incremental pull. A tick that runs low on time stores
//! the first unvisited position so the next tick picks up there; a tick that
//! completes moves the start forward by one so no source is always first.

use crate::config::HarvestConfig;
use crate::harvest::budget::BudgetClock;
use crate::harvest::HarvestContext;
use crate::provider::{CollectRequest, CollectorRegistry};
use crate::state::{rotate, ItemStatus, RotationState, Source};
use crate::{HarvestError, Result};

/// Report of one tick, for logging only
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub pool_size: usize,
    /// Source ids in the order they were attempted, failures included
    pub visited: Vec<String>,
    pub failed: Vec<String>,
    pub items_collected: u64,
    /// Offset persisted for the next tick; `None` when the pool was empty
    pub next_offset: Option<usize>,
    /// Whether every source of the pool was attempted
    pub completed: bool,
}

pub struct RotationScheduler<'a> {
    config: &'a HarvestConfig,
    collectors: &'a CollectorRegistry,
    ctx: HarvestContext<'a>,
}

impl<'a> RotationScheduler<'a> {
    pub fn new(
        config: &'a HarvestConfig,
        collectors: &'a CollectorRegistry,
        ctx: HarvestContext<'a>,
    ) -> Self {
        Self {
            config,
            collectors,
            ctx,
        }
    }

    /// Runs one tick over `pool`
    ///
    /// Per-source failures are logged and skipped. Only a failure to read or
    /// write the rotation offset itself is returned as an error.
    pub async fn tick(&self, pool: &[Source]) -> Result<TickOutcome> {
        if pool.is_empty() {
            tracing::warn!("No active sources, nothing to do");
            return Ok(TickOutcome::default());
        }

        let clock = self.ctx.clock;
        let budget = BudgetClock::for_time(clock, self.config.time_budget());
        let pool_size = pool.len();
        let offset = RotationState::load(self.ctx.checkpoints)?.offset_for(pool_size);

        tracing::info!("Rotation tick over {} sources, starting at {}", pool_size, offset);

        let request = CollectRequest {
            stripe_size: self.config.stripe_size,
            page_delay: self.config.page_delay(),
            recent_window: self.config.recent_window(),
            clock,
        };

        let mut outcome = TickOutcome {
            pool_size,
            ..TickOutcome::default()
        };

        for (processed, source) in rotate(pool, offset).iter().enumerate() {
            let remaining = budget.remaining(clock);
            if remaining < self.config.safety_margin() {
                let next = (offset + processed) % pool_size;
                RotationState {
                    last_store_index: next,
                }
                .save(self.ctx.checkpoints)?;

                tracing::info!(
                    "Stopping tick with {:?} left after {} of {} sources, next tick starts at {}",
                    remaining,
                    processed,
                    pool_size,
                    next
                );
                outcome.next_offset = Some(next);
                return Ok(outcome);
            }

            outcome.visited.push(source.id.clone());
            match self.collect_one(source, &request).await {
                Ok(new_items) => {
                    tracing::info!(source = %source.id, "Collected {} new items", new_items);
                    outcome.items_collected += new_items;
                }
                Err(e) => {
                    tracing::warn!(source = %source.id, "Incremental pull failed: {}", e);
                    outcome.failed.push(source.id.clone());
                }
            }
        }

        let next = (offset + 1) % pool_size;
        RotationState {
            last_store_index: next,
        }
        .save(self.ctx.checkpoints)?;

        tracing::info!(
            "Rotation tick complete: {} new items, {} failed sources, {:?} elapsed",
            outcome.items_collected,
            outcome.failed.len(),
            budget.elapsed(clock)
        );

        outcome.next_offset = Some(next);
        outcome.completed = true;
        Ok(outcome)
    }

    /// One incremental pull for one source; returns the number of new items
    async fn collect_one(&self, source: &Source, request: &CollectRequest<'_>) -> Result<u64> {
        let collector = self
            .collectors
            .get(&source.provider)
            .ok_or_else(|| HarvestError::UnknownProvider(source.provider.clone()))?;

        let items = collector.collect(source, request).await?;
        let fresh = self.ctx.cache.filter_new(&items, &source.id)?;
        if !fresh.is_empty() {
            self.ctx.sink.save(&fresh, source, ItemStatus::New)?;
            self.ctx.cache.remember(&fresh, &source.id)?;
        }

        Ok(fresh.len() as u64)
    }
}
