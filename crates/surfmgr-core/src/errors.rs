//! Error types for process control and file transfer.
//!
//! Neither type escapes an engine boundary: the runtime converts them into
//! `TerminationOutcome` / `TransferResult` values with a readable message.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while enumerating or signalling processes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProcessError {
    /// The process exited before we could act on it. Callers treat this as success.
    #[error("process {pid} is already gone")]
    AlreadyGone { pid: u32 },

    /// The OS refused to signal the process.
    #[error("access denied terminating {name} (PID {pid})")]
    AccessDenied { pid: u32, name: String },

    /// The process did not exit within the allotted time.
    #[error("{name} (PID {pid}) did not exit within {waited_ms} ms")]
    TimedOut {
        pid: u32,
        name: String,
        waited_ms: u128,
    },

    /// The process table cannot be read in this environment (e.g. a sandbox).
    #[error("process enumeration unavailable: {0}")]
    EnumerationUnavailable(String),

    /// Any other signalling failure.
    #[error("failed to signal PID {pid}: {message}")]
    Signal { pid: u32, message: String },
}

impl ProcessError {
    /// True for errors that mean the target no longer exists.
    pub const fn is_gone(&self) -> bool {
        matches!(self, Self::AlreadyGone { .. })
    }
}

/// Errors that abort a transfer, reset or session operation.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Unexpected I/O failure while copying or deleting.
    #[error("{message}: {}", path.display())]
    Io {
        path: PathBuf,
        kind: io::ErrorKind,
        message: String,
    },

    /// The caller cancelled the operation.
    #[error("Cancelled")]
    Cancelled,
}

impl TransferError {
    /// Wrap an `io::Error` together with the path it concerns.
    pub fn io(path: impl AsRef<Path>, err: &io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// I/O kind, when this is an I/O error.
    pub const fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Io { kind, .. } => Some(*kind),
            Self::Cancelled => None,
        }
    }
}
