//! Progress bar for registry lookups
//!
//! Draws to stderr with indicatif; hidden in quiet and JSON modes.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TEMPLATE: &str = "{spinner:.cyan} {prefix} [{bar:30.cyan/blue}] {pos}/{len} {msg}";

/// Shows which package is being resolved out of a batch
pub struct Progress {
    enabled: bool,
    bar: Option<ProgressBar>,
}

impl Progress {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, bar: None }
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Starts a batch of `total` lookups against `registry`; an empty batch draws nothing
    pub fn begin(&mut self, total: usize, registry: &str) {
        if !self.enabled || total == 0 {
            return;
        }

        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template(TEMPLATE)
            .map(|s| s.progress_chars("█▓▒░"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.set_prefix(format!("Resolving from {}", registry));
        bar.enable_steady_tick(Duration::from_millis(100));
        self.bar = Some(bar);
    }

    /// Names the package whose lookup is in flight
    pub fn resolving(&self, package: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(package.to_string());
        }
    }

    /// Marks one lookup as finished
    pub fn resolved(&self) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    pub fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        self.finish();
    }
}
