//! Per-record download outcomes.

use std::fmt;
use std::path::PathBuf;

use super::VideoRecord;

/// Unit of dispatcher work for a single record.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub record: VideoRecord,
}

/// How a single record's resolve-then-transfer unit ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// File fully written to this path.
    Success(PathBuf),
    /// No direct link was obtained; no transfer was attempted.
    ResolutionFailed(String),
    /// A direct link was obtained but the transfer did not complete.
    TransferFailed(String),
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl fmt::Display for DownloadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(path) => write!(f, "saved to {}", path.display()),
            Self::ResolutionFailed(reason) => write!(f, "no download link obtained: {}", reason),
            Self::TransferFailed(reason) => write!(f, "transfer failed: {}", reason),
        }
    }
}

/// Result of one dispatcher unit.
#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub record: VideoRecord,
    pub outcome: DownloadOutcome,
}
