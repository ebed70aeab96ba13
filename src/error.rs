//! Error types for the crawl-and-download pipeline.

use thiserror::Error;

/// Run-level failures. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// `url` is the last page reached; `page` the 1-based page being fetched.
    #[error("Failed to fetch listing page {page} at {url}: {reason}")]
    FetchFailed {
        url: String,
        page: usize,
        reason: String,
    },
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Login credentials missing: set USERNAME and PASSWORD")]
    MissingCredentials,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Session file is not valid JSON: {0}")]
    SessionFormat(#[from] serde_json::Error),
    #[error("Metadata log error: {0}")]
    MetadataLog(#[from] csv::Error),
}

/// Why a record's direct link could not be obtained.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionFailure {
    #[error("resolver timed out after {0}s")]
    TimedOut(u64),
    #[error("resolver did not expose a download link")]
    NoReadyControl,
    #[error("{0}")]
    Resolver(String),
}

/// Why a resolved link could not be written to disk.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Truncated body: got {received} of {expected} bytes")]
    Truncated { received: u64, expected: u64 },
    #[error("Destination already exists: {0}")]
    AlreadyExists(String),
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
