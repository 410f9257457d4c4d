//! Progress reporting for CLI

use crate::application::dto::{CarveProgress, CarveProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

/// Progress reporter using indicatif
pub struct ProgressReporter {
    bar: Arc<ProgressBar>,
}

impl ProgressReporter {
    /// Creates a byte-oriented progress bar
    pub fn new(total: u64, message: &str) -> Self {
        let bar = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        bar.set_message(message.to_string());

        Self { bar: Arc::new(bar) }
    }

    /// Creates a progress reporter for carving an input of `input_size` bytes
    pub fn for_carve(input_size: u64) -> Self {
        Self::new(input_size, "Carving...")
    }

    /// Finishes with a message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Gets a callback for session progress
    pub fn carve_callback(&self) -> CarveProgressCallback {
        let bar = Arc::clone(&self.bar);
        Box::new(move |progress: &CarveProgress| update_bar(&bar, progress))
    }
}

fn update_bar(bar: &ProgressBar, progress: &CarveProgress) {
    bar.set_position(progress.scanned_bytes);
    bar.set_message(format!(
        "Carved {} files | Speed: {} MB/s",
        progress.artifacts,
        progress.speed_bps() / (1024 * 1024)
    ));
}
