//! indicatif progress bars for cart operations

use std::time::Duration;

use cartflash_flash::Progress;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Progress reporter using indicatif progress bars
///
/// Starts a new bar each time the reported label changes.
pub struct IndicatifProgress {
    multi: MultiProgress,
    current_bar: Option<ProgressBar>,
    label: String,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            current_bar: None,
            label: String::new(),
        }
    }

    fn create_bar(&mut self, total: u64, label: &str) {
        self.finish();
        self.label = label.to_string();
        let pb = self.multi.add(ProgressBar::new(total));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message(self.label.clone());
        pb.enable_steady_tick(Duration::from_millis(100));
        self.current_bar = Some(pb);
    }

    /// Finish the current bar, if any
    pub fn finish(&mut self) {
        if let Some(pb) = self.current_bar.take() {
            pb.finish_with_message(format!("{} done", self.label));
        }
    }
}

impl Default for IndicatifProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for IndicatifProgress {
    fn report(&mut self, done: u32, total: u32, label: &str) {
        if self.current_bar.is_none() || self.label != label {
            self.create_bar(total as u64, label);
        }
        if let Some(pb) = &self.current_bar {
            pb.set_length(total as u64);
            pb.set_position(done as u64);
        }
    }
}

impl Drop for IndicatifProgress {
    fn drop(&mut self) {
        self.finish();
    }
}
