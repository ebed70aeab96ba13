//! Shared helper functions for CLI commands.

use console::style;

use vidacquire::models::{DownloadOutcome, DownloadResult};

use super::progress::progress_println;

/// Per-outcome counts of a run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub succeeded: usize,
    pub unresolved: usize,
    pub transfer_failed: usize,
}

impl Summary {
    pub fn from_results(results: &[DownloadResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            match result.outcome {
                DownloadOutcome::Success(_) => summary.succeeded += 1,
                DownloadOutcome::ResolutionFailed(_) => summary.unresolved += 1,
                DownloadOutcome::TransferFailed(_) => summary.transfer_failed += 1,
            }
        }
        summary
    }
}

/// Print failed records, then the totals.
pub fn print_summary(results: &[DownloadResult]) -> Summary {
    for result in results {
        match result.outcome {
            DownloadOutcome::Success(_) => {}
            DownloadOutcome::ResolutionFailed(_) => progress_println(&format!(
                "{} no download link obtained for {}",
                style("✗").red(),
                result.record.source_url
            )),
            DownloadOutcome::TransferFailed(ref reason) => progress_println(&format!(
                "{} transfer failed for {}: {}",
                style("✗").red(),
                result.record.source_url,
                reason
            )),
        }
    }

    let summary = Summary::from_results(results);
    println!(
        "{} {} downloaded, {} without link, {} failed transfers",
        style("✓").green(),
        summary.succeeded,
        summary.unresolved,
        summary.transfer_failed
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use vidacquire::models::VideoRecord;

    fn result(outcome: DownloadOutcome) -> DownloadResult {
        DownloadResult {
            record: VideoRecord {
                source_url: "https://site.test/videos/1/".to_string(),
                title: "Clip".to_string(),
                rating: "N/A".to_string(),
            },
            outcome,
        }
    }

    #[test]
    fn test_summary_counts() {
        let results = vec![
            result(DownloadOutcome::Success(PathBuf::from("out/Clip.mp4"))),
            result(DownloadOutcome::ResolutionFailed("timed out".to_string())),
            result(DownloadOutcome::ResolutionFailed("no link".to_string())),
            result(DownloadOutcome::TransferFailed("HTTP 404".to_string())),
        ];
        assert_eq!(
            Summary::from_results(&results),
            Summary {
                succeeded: 1,
                unresolved: 2,
                transfer_failed: 1,
            }
        );
    }
}
