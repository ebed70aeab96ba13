//! vidacquire - listing crawler and concurrent media downloader.
//!
//! Crawls a paginated listing site, normalizes the items it finds, logs in
//! once, then resolves and downloads every item's media through a link
//! resolver with bounded concurrency.

pub mod config;
pub mod error;
pub mod metadata_log;
pub mod models;
pub mod normalize;
pub mod scrapers;
pub mod services;
pub mod storage;

pub use error::{PipelineError, ResolutionFailure, Result, TransferError};
