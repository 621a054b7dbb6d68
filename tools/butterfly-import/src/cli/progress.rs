//! Spinner reporting elements processed by readers and writers

use std::time::Duration;

use butterfly_common::EntityKind;
use butterfly_import::{Progress, Statistics};
use indicatif::{ProgressBar, ProgressStyle};

/// Creates an open-ended spinner for CLI display
pub fn create_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg} {human_pos} elements ({per_sec})")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Progress sink feeding both the spinner and per-kind counters
pub struct ProgressManager {
    pub pb: ProgressBar,
    stats: Statistics,
}

impl ProgressManager {
    pub fn new(message: &str) -> Self {
        let pb = create_spinner();
        pb.set_message(message.to_string());
        Self {
            pb,
            stats: Statistics::new(),
        }
    }

    pub fn processed(&self, kind: EntityKind) -> u64 {
        self.stats.processed(kind)
    }

    pub fn finish(&self, message: &str) {
        self.pb.finish_with_message(message.to_string());
    }
}

impl Progress for ProgressManager {
    fn add_processed(&self, kind: EntityKind, count: u64) {
        self.stats.add_processed(kind, count);
        self.pb.inc(count);
    }
}
