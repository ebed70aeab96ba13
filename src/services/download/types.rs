//! Download service types and events.

use std::path::PathBuf;
use std::time::Duration;

use crate::storage::CollisionPolicy;

/// Size of the write buffer between the response body and the file.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Events emitted while download units run.
#[derive(Debug, Clone)]
pub enum DownloadEvent {
    /// Unit admitted and resolution started
    Started { url: String },
    /// Direct link obtained
    Resolved { url: String, direct_url: String },
    /// File written
    Completed { url: String, path: PathBuf },
    /// Resolution or transfer failed
    Failed { url: String, error: String },
}

/// Configuration for the download service.
///
/// Destination paths come from the dispatcher; this only shapes the HTTP
/// client and how existing files are treated.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub collision: CollisionPolicy,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            collision: CollisionPolicy::default(),
            connect_timeout: Duration::from_secs(30),
            user_agent: format!("vidacquire/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl DownloadConfig {
    pub fn with_collision(mut self, collision: CollisionPolicy) -> Self {
        self.collision = collision;
        self
    }
}
