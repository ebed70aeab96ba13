//! Paginated listing traversal.

use std::time::Duration;

use tracing::{debug, info};

use crate::config::DEFAULT_SETTLE_SECS;
use crate::error::{PipelineError, Result};
use crate::scrapers::{PageFetcher, PageSnapshot};

/// Walks listing pages through a [`PageFetcher`], one page at a time.
///
/// The fetcher (and the browsing page behind it) belongs to the crawler for
/// the whole crawl.
pub struct ListingCrawler<F> {
    fetcher: F,
    settle: Duration,
}

impl<F: PageFetcher> ListingCrawler<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            settle: Duration::from_secs(DEFAULT_SETTLE_SECS),
        }
    }

    /// Wait this long after advancing before taking the next snapshot.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Collect snapshots starting at `start_url`, in traversal order.
    ///
    /// `max_pages == 0` means no limit. Any fetcher error aborts the crawl.
    pub async fn crawl(&mut self, start_url: &str, max_pages: usize) -> Result<Vec<PageSnapshot>> {
        let fetch_failed = |url: &str, page: usize| {
            let url = url.to_string();
            move |reason: anyhow::Error| PipelineError::FetchFailed {
                url,
                page,
                reason: format!("{:#}", reason),
            }
        };

        let first = self
            .fetcher
            .fetch(start_url)
            .await
            .map_err(fetch_failed(start_url, 1))?;
        let mut pages = vec![first];
        info!("Fetched listing page 1: {}", start_url);

        while max_pages == 0 || pages.len() < max_pages {
            let next = pages.len() + 1;
            let current = pages.last().map_or(start_url, |p| p.url.as_str());
            if !self
                .fetcher
                .advance_to_next_page()
                .await
                .map_err(fetch_failed(current, next))?
            {
                debug!("No next page after page {}", pages.len());
                break;
            }

            tokio::time::sleep(self.settle).await;
            let snapshot = self
                .fetcher
                .snapshot()
                .await
                .map_err(fetch_failed(current, next))?;
            pages.push(snapshot);
            info!("Fetched listing page {}", pages.len());
        }

        Ok(pages)
    }

    /// Give the fetcher back, e.g. to reuse its browser for login.
    pub fn into_fetcher(self) -> F {
        self.fetcher
    }

    pub fn fetcher_mut(&mut self) -> &mut F {
        &mut self.fetcher
    }
}
