//! Plain-text rendering of operation events.

use surfmgr_core::{OperationEvent, OperationEventSink};

/// Prints operation log lines and progress updates to stdout.
///
/// Used for process control, where there is no progress bar to draw.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl OperationEventSink for ConsoleSink {
    fn emit(&self, event: OperationEvent) {
        if let Some(line) = format_event_line(&event) {
            println!("{line}");
        }
    }
}

/// Render an event as one line of text. `Finished` renders nothing; callers
/// report the result themselves.
pub fn format_event_line(event: &OperationEvent) -> Option<String> {
    match event {
        OperationEvent::Log { line } => Some(format!("  {line}")),
        OperationEvent::Progress(progress) => {
            Some(format!("[{:>3}%] {}", progress.percent, progress.message))
        }
        OperationEvent::Finished(_) => None,
    }
}
