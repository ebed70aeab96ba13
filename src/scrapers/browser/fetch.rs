//! Listing navigation: page fetch, pagination and snapshots.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use tracing::{debug, info, warn};

use super::BrowserFetcher;
use crate::models::SessionCookie;
use crate::scrapers::{LoginCredentials, PageFetcher, PageSnapshot};

/// Default user agent for browser requests.
pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Interval between element lookups while waiting for a control.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// JavaScript to wait for page ready state.
const WAIT_FOR_READY_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete' || document.readyState === 'interactive') {
            resolve(document.readyState);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
            setTimeout(() => resolve('timeout'), 10000);
        }
    })
"#;

/// Wait for the page to reach a ready state.
pub(crate) async fn wait_for_page_ready(page: &Page, timeout: Duration) {
    match tokio::time::timeout(timeout, page.evaluate(WAIT_FOR_READY_SCRIPT.to_string())).await {
        Ok(Ok(result)) => {
            let state: String = result
                .into_value()
                .unwrap_or_else(|_| "unknown".to_string());
            debug!("Page ready state: {}", state);
        }
        Ok(Err(e)) => debug!("Could not check ready state: {}", e),
        Err(_) => warn!("Timeout waiting for page ready state"),
    }
}

/// Poll for an element until it appears or `timeout` elapses.
pub(crate) async fn wait_for_element(
    page: &Page,
    selector: &str,
    timeout: Duration,
) -> Option<Element> {
    let poll = async {
        loop {
            if let Ok(element) = page.find_element(selector).await {
                return element;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    };
    tokio::time::timeout(timeout, poll).await.ok()
}

/// Navigate a page to `url`, bounded by `timeout`.
pub(crate) async fn navigate(page: &Page, url: &str, timeout: Duration) -> Result<()> {
    info!("Navigating to {}", url);
    let nav_params = NavigateParams::builder()
        .url(url)
        .build()
        .map_err(|e| anyhow!("Invalid URL: {}", e))?;

    tokio::time::timeout(timeout, page.execute(nav_params))
        .await
        .map_err(|_| anyhow!("Navigation timed out after {}s for {}", timeout.as_secs(), url))?
        .map_err(|e| anyhow!("Navigation failed for {}: {}", url, e))?;

    Ok(())
}

/// Set the user agent before the first navigation of a page.
pub(crate) async fn prepare_page(page: &Page) -> Result<()> {
    page.execute(SetUserAgentOverrideParams::new(
        BROWSER_USER_AGENT.to_string(),
    ))
    .await?;
    Ok(())
}

impl BrowserFetcher {
    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout)
    }

    /// The page reused for the whole crawl, opened on first use.
    async fn crawl_page(&mut self) -> Result<Page> {
        if let Some(ref page) = self.page {
            return Ok(page.clone());
        }

        let browser = self.ensure_browser().await?;
        let page = browser.lock().await.new_page("about:blank").await?;
        prepare_page(&page).await?;
        self.page = Some(page.clone());
        Ok(page)
    }

    async fn render(&self, page: &Page, requested_url: &str) -> Result<PageSnapshot> {
        let final_url = page
            .url()
            .await?
            .unwrap_or_else(|| requested_url.to_string());
        let content = page.content().await?;
        Ok(PageSnapshot::new(final_url, content))
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&mut self, url: &str) -> Result<PageSnapshot> {
        let page = self.crawl_page().await?;
        navigate(&page, url, self.timeout()).await?;
        wait_for_page_ready(&page, self.timeout()).await;

        if wait_for_element(&page, &self.listing.container, self.timeout())
            .await
            .is_none()
        {
            warn!("Listing container '{}' not found on {}", self.listing.container, url);
        }

        self.render(&page, url).await
    }

    async fn advance_to_next_page(&mut self) -> Result<bool> {
        let page = self
            .page
            .clone()
            .ok_or_else(|| anyhow!("No listing page loaded"))?;

        match page.find_element(&self.listing.next_page).await {
            Ok(control) => {
                control.scroll_into_view().await?;
                control.click().await?;
                debug!("Clicked next page control");
                Ok(true)
            }
            Err(_) => {
                debug!("No next page control '{}'", self.listing.next_page);
                Ok(false)
            }
        }
    }

    async fn snapshot(&mut self) -> Result<PageSnapshot> {
        let page = self
            .page
            .clone()
            .ok_or_else(|| anyhow!("No listing page loaded"))?;
        wait_for_page_ready(&page, self.timeout()).await;
        self.render(&page, "about:blank").await
    }

    async fn authenticate(&mut self, credentials: &LoginCredentials) -> Result<Vec<SessionCookie>> {
        self.login(credentials).await
    }
}
