//! Listing metadata normalization.
//!
//! Turns raw extracted items into [`VideoRecord`]s whose titles are safe to
//! use as file names.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{RawListingItem, VideoRecord};

/// Anything that is not a word character, whitespace, a CJK ideograph or a hyphen.
static DISALLOWED_TITLE_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\w\s\x{4e00}-\x{9fff}-]").expect("title filter pattern should compile")
});

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern should compile"));

/// Reduce a display title to a filesystem-safe slug.
///
/// Disallowed characters are dropped, then each whitespace run becomes a
/// single underscore. Idempotent.
pub fn slugify_title(title: &str) -> String {
    let filtered = DISALLOWED_TITLE_CHARS.replace_all(title, "");
    WHITESPACE_RUN
        .replace_all(filtered.trim(), "_")
        .into_owned()
}

/// Normalize raw items into records, preserving order and duplicates.
pub fn normalize(items: impl IntoIterator<Item = RawListingItem>) -> Vec<VideoRecord> {
    items
        .into_iter()
        .map(|item| VideoRecord {
            title: slugify_title(&item.title),
            source_url: item.href,
            rating: item.rating,
        })
        .collect()
}
