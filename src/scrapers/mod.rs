//! Collaborators that talk to the listing site and the link resolver.
//!
//! The pipeline only depends on the [`PageFetcher`] and [`LinkResolver`]
//! traits; the chromiumoxide implementations live in [`browser`].

#[cfg(feature = "browser")]
pub mod browser;
#[cfg(not(feature = "browser"))]
mod browser_stub;
pub mod extract;

use std::time::Duration;

use async_trait::async_trait;

use crate::models::{Session, SessionCookie};

#[cfg(feature = "browser")]
pub use browser::{BrowserFetcher, BrowserLinkResolver};
#[cfg(not(feature = "browser"))]
pub use browser_stub::{BrowserFetcher, BrowserLinkResolver};
pub use extract::{ListingExtractor, ListingSelectors};

/// Rendered document content of a listing page at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    /// URL the content was rendered from (used to resolve relative links).
    pub url: String,
    pub content: String,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content: content.into(),
        }
    }
}

/// Login inputs for the listing site.
#[derive(Clone)]
pub struct LoginCredentials {
    pub login_url: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("login_url", &self.login_url)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Stateful page navigation against the listing site.
///
/// One fetcher holds one browsing page; `advance_to_next_page` and
/// `snapshot` act on whatever `fetch` last loaded.
#[async_trait]
pub trait PageFetcher: Send {
    /// Navigate to `url` and return the rendered document.
    async fn fetch(&mut self, url: &str) -> anyhow::Result<PageSnapshot>;

    /// Activate the "next page" control. Returns false when there is none.
    async fn advance_to_next_page(&mut self) -> anyhow::Result<bool>;

    /// Rendered document of the current view.
    async fn snapshot(&mut self) -> anyhow::Result<PageSnapshot>;

    /// Run the login protocol and return the resulting cookie set.
    async fn authenticate(
        &mut self,
        credentials: &LoginCredentials,
    ) -> anyhow::Result<Vec<SessionCookie>>;
}

/// Third-party service that turns a source URL into a direct download URL.
#[async_trait]
pub trait LinkResolver: Send + Sync {
    /// Submit `source_url` and wait up to `timeout` for the direct link.
    ///
    /// `Ok(None)` means the service never exposed a link. Implementations
    /// release whatever they opened before returning, and may report an
    /// exhausted budget as a [`ResolutionFailure`](crate::error::ResolutionFailure)
    /// error.
    async fn resolve(
        &self,
        source_url: &str,
        session: &Session,
        timeout: Duration,
    ) -> anyhow::Result<Option<String>>;
}
