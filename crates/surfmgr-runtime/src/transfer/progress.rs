//! Monotonic progress reporting.

use surfmgr_core::{OperationEvent, OperationEventSink};
use tracing::debug;

/// Emits progress and log events for one operation.
///
/// Percent never decreases and never exceeds 100, whatever the caller asks.
pub struct ProgressReporter<'a> {
    sink: &'a dyn OperationEventSink,
    last: u8,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(sink: &'a dyn OperationEventSink) -> Self {
        Self { sink, last: 0 }
    }

    pub fn report(&mut self, percent: u8, message: impl Into<String>) {
        self.last = percent.clamp(self.last, 100);
        self.sink.emit(OperationEvent::progress(self.last, message));
    }

    pub fn log(&self, line: impl Into<String>) {
        let line = line.into();
        debug!(target: "surfmgr::transfer", "{line}");
        self.sink.emit(OperationEvent::log(line));
    }

    /// Last percent reported.
    pub const fn percent(&self) -> u8 {
        self.last
    }
}

/// Percent for step `done` of `total` inside the range `start..start + span`.
pub fn phase_percent(start: u8, span: u8, done: usize, total: usize) -> u8 {
    if total == 0 {
        return start.saturating_add(span);
    }
    let advanced = usize::from(span) * done.min(total) / total;
    start.saturating_add(u8::try_from(advanced).unwrap_or(span))
}

/// Forwards events to `inner`, squeezing progress into `base..=base + 100 / divisor`.
///
/// Used to nest one operation's progress inside another's.
pub struct ScaledSink<'a> {
    inner: &'a dyn OperationEventSink,
    base: u8,
    divisor: u8,
}

impl<'a> ScaledSink<'a> {
    pub fn new(inner: &'a dyn OperationEventSink, base: u8, divisor: u8) -> Self {
        Self {
            inner,
            base,
            divisor: divisor.max(1),
        }
    }
}

impl OperationEventSink for ScaledSink<'_> {
    fn emit(&self, event: OperationEvent) {
        match event {
            OperationEvent::Progress(progress) => {
                let percent = self.base.saturating_add(progress.percent / self.divisor);
                self.inner
                    .emit(OperationEvent::progress(percent, progress.message));
            }
            other => self.inner.emit(other),
        }
    }
}
