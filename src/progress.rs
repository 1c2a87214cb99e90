//! Progress bar utilities for long-running operations
//!
//! Visual feedback while pipelines fan out over the worker pool, using the
//! indicatif crate.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

/// Progress bar over a batch of pipelines
pub struct PipelineProgress {
    pub progress: ProgressBar,
}

impl PipelineProgress {
    /// Create a new pipeline progress bar
    pub fn new(total_pipelines: usize, stage: &str) -> Self {
        let progress = ProgressBar::new(total_pipelines as u64);
        progress.set_style(bar_style(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})\n{msg}",
        ));
        progress.set_message(format!("📊 {}", stage));

        Self { progress }
    }

    /// A hidden bar, for tests and non-interactive runs
    pub fn hidden() -> Self {
        Self {
            progress: ProgressBar::hidden(),
        }
    }

    /// Record one finished pipeline
    pub fn advance(&self, pipeline: &str, succeeded: bool) {
        self.progress.inc(1);
        let icon = if succeeded { "✅" } else { "❌" };
        self.progress.set_message(format!("{} {}", icon, pipeline));
    }

    /// Mark the batch as complete
    pub fn finish(&self, succeeded: usize, failed: usize) {
        self.progress.finish_with_message(format!(
            "✅ Pipelines complete! {} succeeded, {} failed",
            succeeded, failed
        ));
    }
}

/// Spinner for quick operations
pub struct Spinner {
    pub spinner: ProgressBar,
}

impl Spinner {
    /// Create a new spinner
    pub fn new(message: &str) -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner.set_message(message.to_string());

        Self { spinner }
    }

    /// Update spinner message
    pub fn update(&self, message: &str) {
        self.spinner.set_message(message.to_string());
    }

    /// Finish spinner with success
    pub fn finish(&self, message: &str) {
        self.spinner.finish_with_message(format!("✅ {}", message));
    }

    /// Finish spinner with error
    pub fn finish_with_error(&self, message: &str) {
        self.spinner.finish_with_message(format!("❌ {}", message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_progress() {
        let progress = PipelineProgress::new(2, "Refining");
        progress.advance("BTC_EUR_kraken_bitstamp", true);
        progress.advance("ETH_EUR_kraken_bitstamp", false);
        assert_eq!(progress.progress.position(), 2);
        progress.finish(1, 1);
    }

    #[test]
    fn test_spinner() {
        let spinner = Spinner::new("Loading...");
        std::thread::sleep(Duration::from_millis(100));
        spinner.finish("Loaded");
    }
}
