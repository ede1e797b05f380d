//! Event sink trait for operation progress and log streaming.
//!
//! Engines push `OperationEvent`s into a sink; adapters decide where they go
//! (a tokio channel, a progress bar, a test buffer).

use std::sync::Mutex;

use crate::events::OperationEvent;

/// Receiver of operation events.
///
/// `emit` must not block: engines call it from their worker thread between
/// file operations.
pub trait OperationEventSink: Send + Sync {
    fn emit(&self, event: OperationEvent);
}

impl<F> OperationEventSink for F
where
    F: Fn(OperationEvent) + Send + Sync,
{
    fn emit(&self, event: OperationEvent) {
        self(event);
    }
}

/// A sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl OperationEventSink for NoopSink {
    fn emit(&self, _event: OperationEvent) {}
}

/// A sink that records every event, in order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<OperationEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far.
    pub fn events(&self) -> Vec<OperationEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Only the log lines.
    pub fn logs(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                OperationEvent::Log { line } => Some(line),
                _ => None,
            })
            .collect()
    }

    /// Only the progress percents.
    pub fn percents(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                OperationEvent::Progress(progress) => Some(progress.percent),
                _ => None,
            })
            .collect()
    }
}

impl OperationEventSink for CollectingSink {
    fn emit(&self, event: OperationEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
