//! Terminal progress reporting for a batch run.

use batch::{ProgressObserver, ProgressUpdate};
use indicatif::{ProgressBar, ProgressStyle};

/// Terminal progress bar for a batch run. Hidden when stderr is not a terminal.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    /// A bar sized for `total` documents.
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }

    /// Leaves the bar at its final position with `message`.
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

impl ProgressObserver for BarProgress {
    fn on_progress(&self, update: &ProgressUpdate<'_>) {
        let mark = if update.succeeded { "ok" } else { "failed" };
        self.bar.set_position(update.completed as u64);
        self.bar.set_message(format!("{} ({mark})", update.document));
    }
}
