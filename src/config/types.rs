use crate::state::Source;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for the harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub harvest: HarvestConfig,
    pub http: HttpConfig,
    pub storage: StorageConfig,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceEntry>,
}

impl Config {
    /// Returns the enabled sources in configuration order
    pub fn active_sources(&self) -> Vec<Source> {
        self.sources
            .iter()
            .filter(|entry| entry.enabled)
            .map(SourceEntry::to_source)
            .collect()
    }

    /// Looks up a configured source entry by id
    pub fn find_source(&self, id: &str) -> Option<&SourceEntry> {
        self.sources.iter().find(|entry| entry.id == id)
    }
}

/// Budgets and pacing shared by the session harvester and the rotation scheduler
///
/// Built once from the config file and passed by reference into both
/// components; nothing mutates it after load.
#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    /// Maximum pages processed by one full-scan session
    #[serde(rename = "page-budget")]
    pub page_budget: u32,

    /// Wall-clock budget of a single invocation (seconds)
    #[serde(rename = "time-budget-secs")]
    pub time_budget_secs: u64,

    /// Politeness delay between two page fetches (milliseconds)
    #[serde(rename = "page-delay-ms")]
    pub page_delay_ms: u64,

    /// Pages pulled per source by the stripe collector on each tick
    #[serde(rename = "stripe-size")]
    pub stripe_size: u32,

    /// Minimum remaining budget required to start another source in a tick (seconds)
    #[serde(rename = "safety-margin-secs")]
    pub safety_margin_secs: u64,

    /// Look-back window of the recent-window collector (hours)
    #[serde(rename = "recent-window-hours", default = "default_recent_window_hours")]
    pub recent_window_hours: u32,
}

impl HarvestConfig {
    pub fn time_budget(&self) -> Duration {
        Duration::from_secs(self.time_budget_secs)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn safety_margin(&self) -> Duration {
        Duration::from_secs(self.safety_margin_secs)
    }

    pub fn recent_window(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.recent_window_hours))
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            page_budget: 300,
            time_budget_secs: 330,
            page_delay_ms: 500,
            stripe_size: 10,
            safety_margin_secs: 60,
            recent_window_hours: default_recent_window_hours(),
        }
    }
}

fn default_recent_window_hours() -> u32 {
    24
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Items requested per page
    #[serde(rename = "page-size")]
    pub page_size: u32,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// One configured marketplace store
#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    pub id: String,

    pub name: String,

    /// Provider tag selecting the incremental collector
    pub provider: String,

    /// Root of the source's JSON gateway
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Name of the environment variable holding the API key
    #[serde(rename = "api-key-env", default)]
    pub api_key_env: Option<String>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl SourceEntry {
    pub fn to_source(&self) -> Source {
        Source::new(&self.id, &self.name, &self.provider)
    }
}

fn default_enabled() -> bool {
    true
}
