use crate::harvest::clock::Clock;
use std::fmt;
use std::time::{Duration, Instant};

/// Why a session ended before the source was exhausted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Wall-clock budget of the invocation used up
    TimeBudget,
    /// Maximum pages per session processed
    PageBudget,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimeBudget => f.write_str("time budget exhausted"),
            Self::PageBudget => f.write_str("page budget reached"),
        }
    }
}

/// Elapsed-time and page-count limiter for one invocation
///
/// The time budget must sit below the platform's own kill threshold: the
/// harvester stops itself, it never relies on being killed cleanly.
#[derive(Debug, Clone)]
pub struct BudgetClock {
    started: Instant,
    time_budget: Duration,
    page_budget: u32,
    pages: u32,
}

impl BudgetClock {
    pub fn start(clock: &dyn Clock, time_budget: Duration, page_budget: u32) -> Self {
        Self {
            started: clock.now(),
            time_budget,
            page_budget,
            pages: 0,
        }
    }

    /// A budget limited by time only
    pub fn for_time(clock: &dyn Clock, time_budget: Duration) -> Self {
        Self::start(clock, time_budget, u32::MAX)
    }

    pub fn elapsed(&self, clock: &dyn Clock) -> Duration {
        clock.now().saturating_duration_since(self.started)
    }

    pub fn remaining(&self, clock: &dyn Clock) -> Duration {
        self.time_budget.saturating_sub(self.elapsed(clock))
    }

    pub fn time_exceeded(&self, clock: &dyn Clock) -> bool {
        self.elapsed(clock) > self.time_budget
    }

    pub fn pages_exhausted(&self) -> bool {
        self.pages >= self.page_budget
    }

    pub fn record_page(&mut self) {
        self.pages += 1;
    }

    pub fn pages(&self) -> u32 {
        self.pages
    }
}
