//! Progress display for concurrent downloads.
//!
//! Also provides global progress context for coordinating output from
//! any part of the application during progress display.

use std::sync::{OnceLock, RwLock};
use std::time::Duration;

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use vidacquire::services::DownloadEvent;

/// Global reference to active progress display for coordinating output.
static ACTIVE_PROGRESS: OnceLock<RwLock<Option<MultiProgress>>> = OnceLock::new();

fn get_active_progress() -> &'static RwLock<Option<MultiProgress>> {
    ACTIVE_PROGRESS.get_or_init(|| RwLock::new(None))
}

/// Set the global active progress display.
pub fn set_active_progress(multi: Option<MultiProgress>) {
    if let Ok(mut guard) = get_active_progress().write() {
        *guard = multi;
    }
}

/// Print a message that coordinates with any active progress display.
/// Falls back to println! if no progress display is active.
pub fn progress_println(message: &str) {
    if let Ok(guard) = get_active_progress().read() {
        if let Some(ref multi) = *guard {
            let _ = multi.println(message);
            return;
        }
    }
    println!("{}", message);
}

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}

/// Summary bar plus a status line for the run's download units.
pub struct DownloadProgress {
    multi: MultiProgress,
    summary_bar: ProgressBar,
    status: ProgressBar,
    active: usize,
    succeeded: usize,
    failed: usize,
}

impl DownloadProgress {
    pub fn new(total: u64) -> Self {
        let multi = MultiProgress::new();

        let summary_bar = multi.add(ProgressBar::new(total));
        summary_bar.set_style(bar_style(
            "{spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}/{len}",
        ));
        summary_bar.set_message("Downloading");

        let status = multi.add(ProgressBar::new_spinner());
        status.set_style(
            ProgressStyle::with_template("  {spinner:.dim} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        status.enable_steady_tick(Duration::from_millis(100));

        set_active_progress(Some(multi.clone()));

        Self {
            multi,
            summary_bar,
            status,
            active: 0,
            succeeded: 0,
            failed: 0,
        }
    }

    /// Apply one dispatcher event to the display.
    pub fn handle(&mut self, event: DownloadEvent) {
        match event {
            DownloadEvent::Started { url } => {
                self.active += 1;
                self.status
                    .set_message(format!("resolving {}", truncate(&url, 60)));
            }
            DownloadEvent::Resolved { url, .. } => {
                self.status
                    .set_message(format!("downloading {}", truncate(&url, 60)));
            }
            DownloadEvent::Completed { path, .. } => {
                self.active = self.active.saturating_sub(1);
                self.succeeded += 1;
                self.summary_bar.inc(1);
                let _ = self.multi.println(format!(
                    "  {} {}",
                    style("✓").green(),
                    path.display()
                ));
            }
            DownloadEvent::Failed { url, error } => {
                self.active = self.active.saturating_sub(1);
                self.failed += 1;
                self.summary_bar.inc(1);
                let _ = self
                    .multi
                    .println(format!("  {} {}: {}", style("✗").red(), url, error));
            }
        }
        self.summary_bar.set_message(format!(
            "Downloaded: {} | Failed: {} | Active: {}",
            self.succeeded, self.failed, self.active
        ));
    }

    /// Finish all progress bars and clear the display.
    pub fn finish(&self) {
        self.status.finish_and_clear();
        self.summary_bar.finish_and_clear();
        set_active_progress(None);
    }
}

/// Truncate text for display to at most `max_chars` characters.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}
