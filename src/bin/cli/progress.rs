//! Progress display for CLI operations.
//!
//! The pipeline is pull-based and reports no byte counts, so progress is a
//! spinner whose message follows the current stage.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown on stderr while a stage runs
pub struct StageSpinner {
    bar: ProgressBar,
}

impl StageSpinner {
    /// Creates a spinner, hidden when `quiet` is set
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) =
                ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
            {
                pb.set_style(style);
            }
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        };

        Self { bar }
    }

    /// Sets the stage message
    pub fn set_message(&self, msg: impl Into<String>) {
        self.bar.set_message(msg.into());
    }

    /// Clears the spinner after success
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    /// Leaves a message behind after failure
    pub fn fail(&self) {
        self.bar.abandon_with_message("Failed");
    }

    /// Hides the spinner while a password prompt owns the terminal
    pub fn suspend<F: FnOnce() -> T, T>(&self, f: F) -> T {
        self.bar.suspend(f)
    }
}
