//! Terminal progress bar for backup, restore and reset.

use indicatif::{ProgressBar, ProgressStyle};
use surfmgr_core::OperationEvent;

/// Draws a 0-100 bar and prints log lines above it.
pub struct TransferProgressBar {
    bar: ProgressBar,
}

impl TransferProgressBar {
    /// A visible bar titled `title`.
    pub fn new(title: &str) -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        bar.set_message(title.to_string());
        Self { bar }
    }

    /// A bar that draws nothing.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Print a line above the bar.
    pub fn println(&self, line: &str) {
        self.bar.println(line);
    }

    /// Apply one operation event.
    pub fn handle(&self, event: &OperationEvent) {
        match event {
            OperationEvent::Progress(progress) => {
                self.bar.set_position(u64::from(progress.percent));
                self.bar.set_message(progress.message.clone());
            }
            OperationEvent::Log { line } => self.bar.println(format!("  {line}")),
            OperationEvent::Finished(result) if result.success => {
                self.bar.finish_with_message(result.message.clone());
            }
            OperationEvent::Finished(result) => {
                self.bar.abandon_with_message(result.message.clone());
            }
        }
    }

    /// Current position, 0 to 100.
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn is_finished(&self) -> bool {
        self.bar.is_finished()
    }
}
