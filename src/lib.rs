//! Review-Harvester: a resumable, time-budgeted marketplace harvester
//!
//! This crate pages through unbounded marketplace sources across many short
//! invocations. Progress lives in a small key-value checkpoint store, so a
//! process may be killed at any point and the next invocation picks up where
//! the last persisted page left off.

pub mod config;
pub mod harvest;
pub mod output;
pub mod provider;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for source {source_id}: {source}")]
    Http {
        source_id: String,
        source: reqwest::Error,
    },

    #[error("Source {source_id} returned HTTP {status}")]
    Api { source_id: String, status: u16 },

    #[error("Source {source_id} is rate limited")]
    RateLimited { source_id: String },

    #[error("Malformed response from source {source_id}: {message}")]
    Decode { source_id: String, message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Source is disabled: {0}")]
    SourceDisabled(String),

    #[error("No collector registered for provider '{0}'")]
    UnknownProvider(String),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

impl HarvestError {
    /// Returns true if the operator picked something that does not exist
    ///
    /// These are reported before any checkpoint is touched.
    pub fn is_config_failure(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::UnknownSource(_)
                | Self::SourceDisabled(_)
                | Self::UnknownProvider(_)
        )
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Missing environment variable {0}")]
    MissingEnv(String),
}

/// Result type alias for harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, HarvestConfig};
pub use harvest::{RotationScheduler, ScanStatus, SessionHarvester, SessionOutcome, StopReason};
pub use state::{Checkpoint, Item, RotationState, Source};
