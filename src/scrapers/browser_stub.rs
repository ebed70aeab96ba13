//! Stand-ins used when the `browser` feature is disabled.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use super::{LinkResolver, ListingSelectors, LoginCredentials, PageFetcher, PageSnapshot};
use crate::config::{BrowserEngineConfig, LoginConfig, ResolverConfig};
use crate::models::{Session, SessionCookie};

fn not_compiled<T>() -> Result<T> {
    Err(anyhow::anyhow!(
        "Browser support not compiled. Rebuild with: cargo build --features browser"
    ))
}

pub struct BrowserFetcher;

impl BrowserFetcher {
    pub fn new(_config: BrowserEngineConfig, _listing: ListingSelectors, _login: LoginConfig) -> Self {
        Self
    }

    pub async fn link_resolver(&mut self, _config: ResolverConfig) -> Result<BrowserLinkResolver> {
        not_compiled()
    }

    pub async fn close(&mut self) {}
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&mut self, _url: &str) -> Result<PageSnapshot> {
        not_compiled()
    }

    async fn advance_to_next_page(&mut self) -> Result<bool> {
        not_compiled()
    }

    async fn snapshot(&mut self) -> Result<PageSnapshot> {
        not_compiled()
    }

    async fn authenticate(&mut self, _credentials: &LoginCredentials) -> Result<Vec<SessionCookie>> {
        not_compiled()
    }
}

pub struct BrowserLinkResolver;

#[async_trait]
impl LinkResolver for BrowserLinkResolver {
    async fn resolve(
        &self,
        _source_url: &str,
        _session: &Session,
        _timeout: Duration,
    ) -> Result<Option<String>> {
        not_compiled()
    }
}
