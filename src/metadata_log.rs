//! CSV log of crawled records.

use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::models::VideoRecord;

/// File name of the log inside the output directory.
pub const LOG_FILENAME: &str = "log.csv";

const HEADER: [&str; 3] = ["url", "title", "rating"];

/// Write `records` to `path`, replacing any previous log.
///
/// The header is written even when there are no records.
pub fn write_log(path: &Path, records: &[VideoRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(HEADER)?;
    for record in records {
        writer.write_record([&record.source_url, &record.title, &record.rating])?;
    }
    writer.flush()?;

    info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}
