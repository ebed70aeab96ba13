//! Data models for vidacquire.

mod record;
mod result;
mod session;

pub use record::{RawListingItem, VideoRecord, NO_RATING, UNKNOWN_TITLE};
pub use result::{DownloadOutcome, DownloadResult, DownloadTask};
pub use session::{Session, SessionCookie};
