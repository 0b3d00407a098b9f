//! Step progress on the terminal.

use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use trellis_core::{application::ports::RunObserver, error::TrellisError};

/// Spinner that names the running step and leaves one line per finished step.
pub struct ProgressObserver {
    bar: ProgressBar,
    color: bool,
}

impl ProgressObserver {
    /// `visible = false` swallows everything (quiet mode, JSON output).
    pub fn new(visible: bool, color: bool) -> Self {
        let bar = if visible {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} [{pos}/{len}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        Self { bar, color }
    }

    /// Handle for suspending the spinner while a prompt is shown.
    pub fn bar(&self) -> ProgressBar {
        self.bar.clone()
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn line(&self, mark: &str, text: String) {
        self.bar.println(format!("{mark} {text}"));
    }
}

impl RunObserver for ProgressObserver {
    fn step_started(&self, index: usize, total: usize, name: &str) {
        self.bar.set_length(total as u64);
        self.bar.set_position(index as u64);
        self.bar.set_message(name.to_string());
        if index == 1 {
            self.bar.enable_steady_tick(Duration::from_millis(120));
        }
    }

    fn step_completed(&self, name: &str, detail: &str) {
        let mark = if self.color {
            "\u{2713}".green().bold().to_string()
        } else {
            "\u{2713}".to_string()
        };
        self.line(&mark, format!("{name}: {detail}"));
    }

    fn step_skipped(&self, name: &str, reason: &str) {
        let mark = if self.color {
            "-".dimmed().to_string()
        } else {
            "-".to_string()
        };
        self.line(&mark, format!("{name}: skipped ({reason})"));
    }

    fn step_failed(&self, name: &str, error: &TrellisError) {
        let mark = if self.color {
            "\u{2717}".red().bold().to_string()
        } else {
            "\u{2717}".to_string()
        };
        self.line(&mark, format!("{name}: {error}"));
    }

    fn path_skipped(&self, path: &Path) {
        self.line(" ", format!("kept existing {}", path.display()));
    }
}
