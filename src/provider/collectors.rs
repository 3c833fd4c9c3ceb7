use crate::provider::{CollectRequest, IncrementalCollector, PageSource, RecentFeed};
use crate::state::{Item, Source};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Pulls up to `stripe_size` pages from the head of a cursor-paged source
pub struct StripeCollector {
    pages: Arc<dyn PageSource>,
}

impl StripeCollector {
    pub fn new(pages: Arc<dyn PageSource>) -> Self {
        Self { pages }
    }
}

#[async_trait]
impl IncrementalCollector for StripeCollector {
    async fn collect(&self, source: &Source, request: &CollectRequest<'_>) -> Result<Vec<Item>> {
        let mut cursor = String::new();
        let mut items = Vec::new();

        for page_no in 0..request.stripe_size {
            if page_no > 0 {
                request.clock.sleep(request.page_delay).await;
            }

            let page = self.pages.fetch_page(source, &cursor).await?;
            let Some(last) = page.last() else {
                break;
            };
            cursor = last.id.clone();
            items.extend(page);
        }

        tracing::debug!(
            source = %source.id,
            "Stripe pull returned {} items",
            items.len()
        );
        Ok(items)
    }
}

/// Pulls everything created inside the configured recent window
pub struct RecentWindowCollector {
    feed: Arc<dyn RecentFeed>,
}

impl RecentWindowCollector {
    pub fn new(feed: Arc<dyn RecentFeed>) -> Self {
        Self { feed }
    }
}

#[async_trait]
impl IncrementalCollector for RecentWindowCollector {
    async fn collect(&self, source: &Source, request: &CollectRequest<'_>) -> Result<Vec<Item>> {
        let since = request.clock.wall_time() - request.recent_window;
        self.feed.fetch_recent(source, since).await
    }
}
