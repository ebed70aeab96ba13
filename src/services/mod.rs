//! Service layer for the crawl-and-download pipeline.
//!
//! Services depend only on the collaborator traits in [`crate::scrapers`] and
//! emit events for progress tracking; rendering is left to the CLI.

pub mod crawl;
pub mod dispatch;
pub mod download;
pub mod resolve;
pub mod session;

pub use crawl::ListingCrawler;
pub use dispatch::ConcurrencyDispatcher;
pub use download::{DownloadConfig, DownloadEvent, FileTransfer, StreamingDownloader};
pub use resolve::DownloadResolver;
pub use session::SessionStore;
