//! Listing page extraction.

use anyhow::anyhow;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::PageSnapshot;
use crate::models::RawListingItem;

/// CSS selectors describing a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingSelectors {
    /// Single element holding the item list.
    #[serde(default = "default_container")]
    pub container: String,
    /// Item anchors inside the container. Each needs an `href`.
    #[serde(default = "default_item")]
    pub item: String,
    /// Title element, searched inside each item anchor.
    #[serde(default = "default_title")]
    pub title: String,
    /// Rating element, searched inside each item anchor.
    #[serde(default = "default_rating")]
    pub rating: String,
    /// Pagination control followed by the crawler.
    #[serde(default = "default_next_page")]
    pub next_page: String,
}

fn default_container() -> String {
    "#list_videos_common_videos_list_items".to_string()
}

fn default_item() -> String {
    "a[href]".to_string()
}

fn default_title() -> String {
    ".title".to_string()
}

fn default_rating() -> String {
    ".rating".to_string()
}

fn default_next_page() -> String {
    "li.next a".to_string()
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            container: default_container(),
            item: default_item(),
            title: default_title(),
            rating: default_rating(),
            next_page: default_next_page(),
        }
    }
}

/// Extracts raw listing items from snapshots.
#[derive(Debug, Clone)]
pub struct ListingExtractor {
    container: Selector,
    item: Selector,
    title: Selector,
    rating: Selector,
}

fn parse_selector(selector: &str) -> anyhow::Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow!("Invalid selector '{}': {}", selector, e))
}

/// Collapse an element's text nodes into a single trimmed line.
fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");
    (!text.is_empty()).then_some(text)
}

impl ListingExtractor {
    pub fn new(selectors: &ListingSelectors) -> anyhow::Result<Self> {
        Ok(Self {
            container: parse_selector(&selectors.container)?,
            item: parse_selector(&selectors.item)?,
            title: parse_selector(&selectors.title)?,
            rating: parse_selector(&selectors.rating)?,
        })
    }

    /// Extract items from one snapshot, in document order.
    ///
    /// Returns an empty list when the container is missing.
    pub fn extract(&self, snapshot: &PageSnapshot) -> Vec<RawListingItem> {
        let document = Html::parse_document(&snapshot.content);
        let base = Url::parse(&snapshot.url).ok();

        let Some(container) = document.select(&self.container).next() else {
            debug!("No listing container on {}", snapshot.url);
            return Vec::new();
        };

        container
            .select(&self.item)
            .filter_map(|anchor| {
                let href = anchor.value().attr("href")?.trim();
                if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
                    return None;
                }
                let href = match base.as_ref().and_then(|b| b.join(href).ok()) {
                    Some(resolved) => resolved.to_string(),
                    None => href.to_string(),
                };

                let title = anchor
                    .select(&self.title)
                    .next()
                    .and_then(element_text)
                    .or_else(|| {
                        anchor
                            .value()
                            .attr("title")
                            .map(str::trim)
                            .filter(|t| !t.is_empty())
                            .map(str::to_string)
                    });
                let rating = anchor.select(&self.rating).next().and_then(element_text);

                Some(RawListingItem::new(href, title, rating))
            })
            .collect()
    }

    /// Extract items from every snapshot, preserving traversal order.
    pub fn extract_all(&self, snapshots: &[PageSnapshot]) -> Vec<RawListingItem> {
        snapshots.iter().flat_map(|s| self.extract(s)).collect()
    }
}
