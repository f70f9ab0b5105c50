use colored::Colorize;
use harvestflow_build::{ProgressSink, Stage};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Terminal progress sink: one spinner for the running stage, with
/// announcements and errors printed above it
pub struct ConsoleSink {
    progress_bar: ProgressBar,
}

impl ConsoleSink {
    pub fn new() -> Self {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(120));

        Self { progress_bar: pb }
    }

    /// Sink that prints nothing but errors, for machine-readable output
    pub fn quiet() -> Self {
        Self {
            progress_bar: ProgressBar::hidden(),
        }
    }

    pub fn finish(&self) {
        self.progress_bar.finish_and_clear();
    }
}

impl ProgressSink for ConsoleSink {
    fn say(&self, message: &str) {
        if self.progress_bar.is_hidden() {
            return;
        }
        self.progress_bar
            .suspend(|| eprintln!("{} {}", "▶".blue(), message));
    }

    fn error(&self, message: &str) {
        self.progress_bar
            .suspend(|| eprintln!("{} {}", "✗".red().bold(), message.red()));
    }

    fn progress(&self, stage: Stage, percent: Option<u8>, message: &str) {
        let msg = match percent {
            Some(p) => format!("{} {} ({}%)", stage.to_string().cyan(), message, p),
            None => format!("{} {}", stage.to_string().cyan(), message),
        };
        self.progress_bar.set_message(msg);
    }
}

impl Drop for ConsoleSink {
    fn drop(&mut self) {
        if !self.progress_bar.is_finished() {
            self.progress_bar.finish_and_clear();
        }
    }
}
