//! Listing item models.

use serde::{Deserialize, Serialize};

/// Title used when the listing markup has no title element for an item.
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Rating used when the listing markup has no rating element for an item.
pub const NO_RATING: &str = "N/A";

/// One item as extracted from a listing page, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawListingItem {
    /// Absolute URL of the item page.
    pub href: String,
    /// Display title, or [`UNKNOWN_TITLE`].
    pub title: String,
    /// Rating text, or [`NO_RATING`].
    pub rating: String,
}

impl RawListingItem {
    pub fn new(href: impl Into<String>, title: Option<String>, rating: Option<String>) -> Self {
        Self {
            href: href.into(),
            title: title.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            rating: rating.unwrap_or_else(|| NO_RATING.to_string()),
        }
    }
}

/// A canonical listing record.
///
/// `title` is always a filesystem-safe slug; see [`crate::normalize::slugify_title`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoRecord {
    #[serde(rename = "url")]
    pub source_url: String,
    pub title: String,
    pub rating: String,
}
