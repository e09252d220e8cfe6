//! Progress indicators for adsync.
//!
//! One bar per reconciliation phase; failures are printed above the bar as
//! they happen.

use colored::Colorize;
use declarative::{ApplyResult, ProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};

/// Create a progress bar with the standard style
pub fn bar(len: u64, prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template("{prefix:>8.bold} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .map(|s| s.progress_chars("=>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_prefix(prefix.to_string());
    pb
}

/// Progress callback drawing a bar per phase
#[derive(Default)]
pub struct PhaseProgress {
    bar: Option<ProgressBar>,
}

impl ProgressCallback for PhaseProgress {
    fn on_phase_start(&mut self, phase: &str, count: usize) {
        self.bar = Some(bar(count as u64, phase));
    }

    fn on_resource_start(&mut self, id: &str, _description: &str) {
        if let Some(pb) = &self.bar {
            pb.set_message(id.to_string());
        }
    }

    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult) {
        let Some(pb) = &self.bar else {
            return;
        };
        if let ApplyResult::Failed { error } = result {
            pb.suspend(|| println!("  {} {} ({})", "✗".red(), id, error));
        }
        pb.inc(1);
    }

    fn on_phase_complete(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }
}
