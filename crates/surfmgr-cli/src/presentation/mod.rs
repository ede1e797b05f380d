//! Shared CLI presentation utilities.
//!
//! Reusable display and formatting functions for consistent CLI output
//! across commands. Keep this module format-only.

pub mod console;
pub mod progress;
pub mod tables;

// Re-export commonly used items
pub use console::{ConsoleSink, format_event_line};
pub use progress::TransferProgressBar;
pub use tables::{format_session_flags, print_separator, truncate_string};
