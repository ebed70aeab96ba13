//! Link resolution through a third-party resolver page.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{CreateBrowserContextParams, CreateTargetParams};
use chromiumoxide::{Browser, Page};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::cookies::to_cookie_params;
use super::fetch::{navigate, prepare_page, wait_for_element, wait_for_page_ready, POLL_INTERVAL};
use crate::config::ResolverConfig;
use crate::error::ResolutionFailure;
use crate::models::Session;
use crate::scrapers::LinkResolver;

/// Resolves source URLs by driving the resolver page in a fresh browser context.
///
/// Every call creates its own context seeded with the session cookies and
/// disposes of it before returning, so concurrent resolutions never share
/// cookies or tabs.
pub struct BrowserLinkResolver {
    browser: Arc<Mutex<Browser>>,
    config: ResolverConfig,
    resolver_url: String,
    nav_timeout: Duration,
}

impl BrowserLinkResolver {
    pub fn new(
        browser: Arc<Mutex<Browser>>,
        config: ResolverConfig,
        nav_timeout: Duration,
    ) -> Result<Self> {
        let resolver_url = config
            .url
            .clone()
            .ok_or_else(|| anyhow!("resolver.url is not configured"))?;
        Ok(Self {
            browser,
            config,
            resolver_url,
            nav_timeout,
        })
    }

    async fn open_context(&self) -> Result<(BrowserContextId, Page)> {
        let mut browser = self.browser.lock().await;
        let context_id = browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
            .context("Failed to create browser context")?;

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(|e| anyhow!("Invalid target params: {}", e))?;

        match browser.new_page(target).await {
            Ok(page) => Ok((context_id, page)),
            Err(e) => {
                if let Err(dispose) = browser.dispose_browser_context(context_id).await {
                    warn!("Failed to dispose browser context: {}", dispose);
                }
                Err(e.into())
            }
        }
    }

    async fn close_context(&self, context_id: BrowserContextId, page: Page) {
        let _ = page.close().await;
        if let Err(e) = self
            .browser
            .lock()
            .await
            .dispose_browser_context(context_id)
            .await
        {
            warn!("Failed to dispose browser context: {}", e);
        }
    }

    async fn submit(&self, page: &Page, source_url: &str, session: &Session) -> Result<()> {
        prepare_page(page).await?;

        let cookies = to_cookie_params(session);
        if !cookies.is_empty() {
            page.set_cookies(cookies).await?;
        }

        navigate(page, &self.resolver_url, self.nav_timeout).await?;
        wait_for_page_ready(page, self.nav_timeout).await;

        let input = wait_for_element(page, &self.config.input, self.nav_timeout)
            .await
            .ok_or_else(|| anyhow!("Resolver input '{}' not found", self.config.input))?;
        input.click().await?.type_str(source_url).await?;

        page.find_element(&self.config.submit).await?.click().await?;
        debug!("Submitted {} to resolver", source_url);
        Ok(())
    }

    /// Poll for the ready control until it exposes a non-empty link attribute.
    async fn poll_ready(&self, page: &Page) -> String {
        loop {
            if let Ok(element) = page.find_element(&self.config.ready).await {
                if let Ok(Some(link)) = element.attribute(&self.config.attribute).await {
                    if !link.trim().is_empty() {
                        return link;
                    }
                }
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn resolve_in(&self, page: &Page, source_url: &str, session: &Session) -> Result<String> {
        self.submit(page, source_url, session).await?;
        let link = self.poll_ready(page).await;

        // Relative links are resolved against the page they appeared on
        let base = page.url().await?.unwrap_or_else(|| self.resolver_url.clone());
        Ok(url::Url::parse(&base)
            .and_then(|b| b.join(&link))
            .map(|u| u.to_string())
            .unwrap_or(link))
    }
}

#[async_trait]
impl LinkResolver for BrowserLinkResolver {
    async fn resolve(
        &self,
        source_url: &str,
        session: &Session,
        timeout: Duration,
    ) -> Result<Option<String>> {
        let (context_id, page) = self.open_context().await?;

        // Submission and polling share one budget; teardown runs outside it
        let result =
            match tokio::time::timeout(timeout, self.resolve_in(&page, source_url, session)).await {
                Ok(Ok(link)) => Ok(Some(link)),
                Ok(Err(e)) => Err(e),
                Err(_) => {
                    debug!("Resolver gave no link within {:?} for {}", timeout, source_url);
                    Err(ResolutionFailure::TimedOut(timeout.as_secs()).into())
                }
            };

        self.close_context(context_id, page).await;
        result
    }
}
