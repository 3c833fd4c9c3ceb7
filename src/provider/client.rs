//! HTTP client for the marketplace JSON gateway
//!
//! Every source exposes the same two endpoints under its base URL:
//!
//! | Endpoint | Query | Meaning |
//! |----------|-------|---------|
//! | `GET {base}/items` | `limit`, `last_id` | next page after `last_id` (oldest first) |
//! | `GET {base}/items/recent` | `since` (RFC 3339) | items created after `since` |
//!
//! Both answer `{"items": [...]}`. An empty array from `/items` means the
//! source has no more pages.

use crate::config::{Config, HttpConfig};
use crate::provider::{PageSource, RecentFeed};
use crate::state::{Item, Source};
use crate::{ConfigError, HarvestError, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

#[derive(Debug, Deserialize)]
struct ItemsResponse {
    items: Vec<Item>,
}

#[derive(Debug, Clone)]
enum ApiKey {
    None,
    Key(String),
    /// Named in the config but not set in the environment
    Missing(String),
}

#[derive(Debug, Clone)]
struct Endpoint {
    base_url: Url,
    api_key: ApiKey,
}

/// Builds an HTTP client with proper configuration
pub fn build_http_client(config: &HttpConfig) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Marketplace gateway client serving every configured source
pub struct MarketplaceClient {
    client: Client,
    page_size: u32,
    endpoints: HashMap<String, Endpoint>,
}

impl MarketplaceClient {
    pub fn new(client: Client, page_size: u32) -> Self {
        Self {
            client,
            page_size,
            endpoints: HashMap::new(),
        }
    }

    /// Builds a client with an endpoint for every enabled source
    ///
    /// API keys are read from the environment variables named in the config.
    /// A named variable that is not set fails only requests to that source.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = build_http_client(&config.http)?;
        let mut marketplace = Self::new(client, config.http.page_size);

        for entry in config.sources.iter().filter(|entry| entry.enabled) {
            let base_url = Url::parse(&entry.base_url)
                .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", entry.base_url, e)))?;
            let api_key = match &entry.api_key_env {
                Some(var) => match std::env::var(var) {
                    Ok(key) => ApiKey::Key(key),
                    Err(_) => {
                        tracing::warn!(source = %entry.id, "API key variable {} is not set", var);
                        ApiKey::Missing(var.clone())
                    }
                },
                None => ApiKey::None,
            };
            marketplace.insert_endpoint(&entry.id, base_url, api_key);
        }

        Ok(marketplace)
    }

    pub fn add_endpoint(&mut self, source_id: &str, base_url: Url, api_key: Option<String>) {
        let api_key = api_key.map_or(ApiKey::None, ApiKey::Key);
        self.insert_endpoint(source_id, base_url, api_key);
    }

    fn insert_endpoint(&mut self, source_id: &str, base_url: Url, api_key: ApiKey) {
        self.endpoints
            .insert(source_id.to_string(), Endpoint { base_url, api_key });
    }

    fn endpoint(&self, source: &Source) -> Result<&Endpoint> {
        let endpoint = self
            .endpoints
            .get(&source.id)
            .ok_or_else(|| HarvestError::UnknownSource(source.id.clone()))?;
        if let ApiKey::Missing(var) = &endpoint.api_key {
            return Err(ConfigError::MissingEnv(var.clone()).into());
        }
        Ok(endpoint)
    }

    /// `{base}/<segments...>` regardless of a trailing slash on the base
    fn endpoint_url(&self, source: &Source, segments: &[&str]) -> Result<(Url, &Endpoint)> {
        let endpoint = self.endpoint(source)?;
        let mut url = endpoint.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ConfigError::InvalidUrl(format!("{} cannot be a base URL", endpoint.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok((url, endpoint))
    }

    async fn get_items(&self, source: &Source, url: Url, endpoint: &Endpoint) -> Result<Vec<Item>> {
        tracing::debug!(source = %source.id, "GET {}", url);

        let mut request = self.client.get(url);
        if let ApiKey::Key(key) = &endpoint.api_key {
            request = request.header("Api-Key", key);
        }

        let response = request.send().await.map_err(|e| HarvestError::Http {
            source_id: source.id.clone(),
            source: e,
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(HarvestError::RateLimited {
                source_id: source.id.clone(),
            });
        }
        if !status.is_success() {
            return Err(HarvestError::Api {
                source_id: source.id.clone(),
                status: status.as_u16(),
            });
        }

        let body: ItemsResponse = response.json().await.map_err(|e| HarvestError::Decode {
            source_id: source.id.clone(),
            message: e.to_string(),
        })?;

        Ok(body.items)
    }
}

#[async_trait]
impl PageSource for MarketplaceClient {
    async fn fetch_page(&self, source: &Source, cursor: &str) -> Result<Vec<Item>> {
        let (mut url, endpoint) = self.endpoint_url(source, &["items"])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &self.page_size.to_string());
            if !cursor.is_empty() {
                query.append_pair("last_id", cursor);
            }
        }
        self.get_items(source, url, endpoint).await
    }
}

#[async_trait]
impl RecentFeed for MarketplaceClient {
    async fn fetch_recent(&self, source: &Source, since: DateTime<Utc>) -> Result<Vec<Item>> {
        let (mut url, endpoint) = self.endpoint_url(source, &["items", "recent"])?;
        url.query_pairs_mut()
            .append_pair("since", &since.to_rfc3339_opts(SecondsFormat::Secs, true));
        self.get_items(source, url, endpoint).await
    }
}
