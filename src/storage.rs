//! Output paths for downloaded media.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::VideoRecord;

/// Extension used when the resolved URL does not name a known media type.
pub const DEFAULT_EXTENSION: &str = "mp4";

const MEDIA_EXTENSIONS: &[&str] = &["mp4", "m4v", "webm", "mkv", "mov", "avi", "flv", "ts"];

/// How to name files when two records share a title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// `<title>.<ext>`; a later transfer replaces the earlier file.
    Overwrite,
    /// `<title>-<id>.<ext>` where `id` is derived from the source URL.
    #[default]
    AppendSourceId,
    /// `<title>.<ext>`; a transfer to an existing file fails.
    SkipExisting,
}

impl CollisionPolicy {
    /// Whether an existing destination must be left untouched.
    pub fn refuses_existing(self) -> bool {
        matches!(self, CollisionPolicy::SkipExisting)
    }
}

/// Short stable identifier for a source URL: the first 8 hex chars of its SHA-256.
pub fn source_id(source_url: &str) -> String {
    let digest = Sha256::digest(source_url.as_bytes());
    hex::encode(digest)[..8].to_string()
}

/// Media extension named by the resolved URL's path, falling back to [`DEFAULT_EXTENSION`].
pub fn media_extension(direct_url: &str) -> String {
    url::Url::parse(direct_url)
        .ok()
        .and_then(|u| {
            let segment = u.path_segments()?.next_back()?.to_string();
            let (_, ext) = segment.rsplit_once('.')?;
            let ext = ext.to_ascii_lowercase();
            MEDIA_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
        })
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// Destination for a record's media under `output_dir`.
///
/// `<output_dir>/<title>[-<source id>].<ext>`
pub fn destination_path(
    output_dir: &Path,
    record: &VideoRecord,
    direct_url: &str,
    policy: CollisionPolicy,
) -> PathBuf {
    let extension = media_extension(direct_url);
    let filename = match policy {
        CollisionPolicy::AppendSourceId => format!(
            "{}-{}.{}",
            record.title,
            source_id(&record.source_url),
            extension
        ),
        CollisionPolicy::Overwrite | CollisionPolicy::SkipExisting => {
            format!("{}.{}", record.title, extension)
        }
    };
    output_dir.join(filename)
}
