use crate::config::types::{Config, HarvestConfig, HttpConfig, SourceEntry, StorageConfig};
use crate::provider::KNOWN_PROVIDERS;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_harvest_config(&config.harvest)?;
    validate_http_config(&config.http)?;
    validate_storage_config(&config.storage)?;
    validate_sources(&config.sources)?;
    Ok(())
}

/// Validates budgets and pacing
fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    if config.page_budget < 1 || config.page_budget > 10_000 {
        return Err(ConfigError::Validation(format!(
            "page_budget must be between 1 and 10000, got {}",
            config.page_budget
        )));
    }

    if config.time_budget_secs == 0 {
        return Err(ConfigError::Validation(
            "time_budget_secs must be > 0".to_string(),
        ));
    }

    if config.safety_margin_secs >= config.time_budget_secs {
        return Err(ConfigError::Validation(format!(
            "safety_margin_secs ({}) must be smaller than time_budget_secs ({})",
            config.safety_margin_secs, config.time_budget_secs
        )));
    }

    if config.stripe_size < 1 {
        return Err(ConfigError::Validation(format!(
            "stripe_size must be >= 1, got {}",
            config.stripe_size
        )));
    }

    if config.recent_window_hours < 1 {
        return Err(ConfigError::Validation(format!(
            "recent_window_hours must be >= 1, got {}",
            config.recent_window_hours
        )));
    }

    Ok(())
}

/// Validates HTTP client configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be > 0".to_string(),
        ));
    }

    if config.page_size < 1 || config.page_size > 1000 {
        return Err(ConfigError::Validation(format!(
            "page_size must be between 1 and 1000, got {}",
            config.page_size
        )));
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates source entries
fn validate_sources(sources: &[SourceEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in sources {
        validate_source_id(&entry.id)?;

        if !seen.insert(entry.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate source id '{}'",
                entry.id
            )));
        }

        if entry.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Source '{}' must have a name",
                entry.id
            )));
        }

        if !KNOWN_PROVIDERS.contains(&entry.provider.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Source '{}' has unknown provider '{}' (expected one of: {})",
                entry.id,
                entry.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        let url = Url::parse(&entry.base_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid base-url '{}': {}", entry.base_url, e))
        })?;

        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(ConfigError::InvalidUrl(format!(
                "base-url '{}' must use http or https",
                entry.base_url
            )));
        }
    }

    Ok(())
}

/// Source ids become part of checkpoint keys, so keep them to a safe alphabet
fn validate_source_id(id: &str) -> Result<(), ConfigError> {
    if id.is_empty() {
        return Err(ConfigError::Validation(
            "Source id cannot be empty".to_string(),
        ));
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "Source id '{}' must contain only letters, digits, '-' and '_'",
            id
        )));
    }

    Ok(())
}
