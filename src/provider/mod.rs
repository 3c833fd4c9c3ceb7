//! Provider module: fetching items from marketplace sources
//!
//! This module contains:
//! - the fetch seams the harvest engine depends on (`PageSource`, `RecentFeed`)
//! - one `IncrementalCollector` per provider tag, looked up in a `CollectorRegistry`
//! - the HTTP client speaking the marketplace JSON gateway protocol

mod client;
mod collectors;

pub use client::{build_http_client, MarketplaceClient};
pub use collectors::{RecentWindowCollector, StripeCollector};

use crate::harvest::Clock;
use crate::state::{Item, Source};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Provider tag of the cursor-paged stripe collector
pub const STRIPE_PROVIDER: &str = "stripe";

/// Provider tag of the recent-window collector
pub const RECENT_PROVIDER: &str = "recent";

/// Provider tags accepted in configuration
pub const KNOWN_PROVIDERS: &[&str] = &[STRIPE_PROVIDER, RECENT_PROVIDER];

/// Cursor-paginated access to a source
///
/// An empty page means the source is exhausted for that cursor.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, source: &Source, cursor: &str) -> Result<Vec<Item>>;
}

/// Bounded access to the most recent items of a source
#[async_trait]
pub trait RecentFeed: Send + Sync {
    async fn fetch_recent(&self, source: &Source, since: DateTime<Utc>) -> Result<Vec<Item>>;
}

/// Parameters of one incremental pull
pub struct CollectRequest<'a> {
    /// Pages a stripe collector may pull
    pub stripe_size: u32,
    /// Politeness delay between pages
    pub page_delay: Duration,
    /// How far back a recent-window collector looks
    pub recent_window: chrono::Duration,
    pub clock: &'a dyn Clock,
}

/// A single bounded incremental pull for one provider
///
/// Not resumable: each call starts from the head of the source.
#[async_trait]
pub trait IncrementalCollector: Send + Sync {
    async fn collect(&self, source: &Source, request: &CollectRequest<'_>) -> Result<Vec<Item>>;
}

/// Incremental collectors keyed by provider tag
#[derive(Default)]
pub struct CollectorRegistry {
    collectors: HashMap<String, Box<dyn IncrementalCollector>>,
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `stripe` and `recent` collectors over one client
    pub fn with_defaults(client: Arc<MarketplaceClient>) -> Self {
        let mut registry = Self::new();
        registry.register(STRIPE_PROVIDER, StripeCollector::new(client.clone()));
        registry.register(RECENT_PROVIDER, RecentWindowCollector::new(client));
        registry
    }

    /// Registers a collector, replacing any previous one for the tag
    pub fn register(&mut self, tag: &str, collector: impl IncrementalCollector + 'static) {
        self.collectors.insert(tag.to_string(), Box::new(collector));
    }

    pub fn get(&self, tag: &str) -> Option<&dyn IncrementalCollector> {
        self.collectors.get(tag).map(|c| c.as_ref())
    }

    /// Registered tags, sorted
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.collectors.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}
