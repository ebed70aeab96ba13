//! In-memory collaborators for pipeline tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use vidacquire::models::{Session, SessionCookie};
use vidacquire::scrapers::{LinkResolver, LoginCredentials, PageFetcher, PageSnapshot};

/// Listing markup with one item per `(href, title, rating)`.
pub fn listing_page(items: &[(&str, &str, Option<&str>)]) -> String {
    let mut html = String::from(
        r#"<html><body><div id="list_videos_common_videos_list_items">"#,
    );
    for (href, title, rating) in items {
        html.push_str(&format!(
            r#"<div class="item"><a href="{}"><strong class="title">{}</strong>"#,
            href, title
        ));
        if let Some(rating) = rating {
            html.push_str(&format!(r#"<div class="rating">{}</div>"#, rating));
        }
        html.push_str("</a></div>");
    }
    html.push_str("</div></body></html>");
    html
}

/// Serves a fixed sequence of listing pages and a canned login.
pub struct ScriptedFetcher {
    pages: Vec<PageSnapshot>,
    current: usize,
    pub logins: Arc<AtomicUsize>,
}

impl ScriptedFetcher {
    pub fn new(pages: Vec<PageSnapshot>) -> Self {
        Self {
            pages,
            current: 0,
            logins: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&mut self, url: &str) -> anyhow::Result<PageSnapshot> {
        self.current = 0;
        self.pages
            .first()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("nothing served at {}", url))
    }

    async fn advance_to_next_page(&mut self) -> anyhow::Result<bool> {
        if self.current + 1 >= self.pages.len() {
            return Ok(false);
        }
        self.current += 1;
        Ok(true)
    }

    async fn snapshot(&mut self) -> anyhow::Result<PageSnapshot> {
        Ok(self.pages[self.current].clone())
    }

    async fn authenticate(
        &mut self,
        credentials: &LoginCredentials,
    ) -> anyhow::Result<Vec<SessionCookie>> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        Ok(vec![SessionCookie {
            name: "PHPSESSID".to_string(),
            value: format!("session-for-{}", credentials.email),
            domain: ".site.test".to_string(),
            path: "/".to_string(),
            expires: None,
        }])
    }
}

/// Maps source URLs to direct links; unknown URLs never get a link.
pub struct MapResolver {
    links: HashMap<String, String>,
    pub calls: AtomicUsize,
}

impl MapResolver {
    pub fn new(links: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            links: links.into_iter().collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LinkResolver for MapResolver {
    async fn resolve(
        &self,
        source_url: &str,
        session: &Session,
        _timeout: Duration,
    ) -> anyhow::Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if session.cookies.is_empty() {
            anyhow::bail!("resolver requires a logged-in session");
        }
        Ok(self.links.get(source_url).cloned())
    }
}
