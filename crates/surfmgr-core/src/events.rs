//! Operation events streamed from a running transfer to its caller.
//!
//! Ordering contract for one operation:
//! - `Progress` percents never decrease
//! - `Log` lines are emitted before the progress step that produced them
//! - `Finished` is emitted exactly once and is always the last event

use serde::{Deserialize, Serialize};

use crate::domain::{TransferProgress, TransferResult};

/// One event of an operation's stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OperationEvent {
    Progress(TransferProgress),
    Log { line: String },
    Finished(TransferResult),
}

impl OperationEvent {
    pub fn progress(percent: u8, message: impl Into<String>) -> Self {
        Self::Progress(TransferProgress::new(percent, message))
    }

    pub fn log(line: impl Into<String>) -> Self {
        Self::Log { line: line.into() }
    }

    pub const fn finished(result: TransferResult) -> Self {
        Self::Finished(result)
    }

    /// True for the terminal event.
    pub const fn is_finished(&self) -> bool {
        matches!(self, Self::Finished(_))
    }
}
