//! OS process table port.

use crate::domain::ProcessHandle;
use crate::errors::ProcessError;

/// Read and signal the OS process table.
///
/// Implementations must be safe to share between threads. Every method
/// works on a `ProcessHandle` obtained from an earlier `snapshot`; since that
/// snapshot may be stale, implementations must re-check the handle's identity
/// (PID *and* start time) before signalling.
pub trait ProcessTable: Send + Sync {
    /// Enumerate every visible process.
    ///
    /// Returns `ProcessError::EnumerationUnavailable` when the platform or
    /// sandbox does not expose a process list.
    fn snapshot(&self) -> Result<Vec<ProcessHandle>, ProcessError>;

    /// Whether the process behind `handle` is still running.
    ///
    /// Zombies and recycled PIDs count as not running.
    fn is_alive(&self, handle: &ProcessHandle) -> bool;

    /// Ask the process to exit (SIGTERM or the platform equivalent).
    fn terminate(&self, handle: &ProcessHandle) -> Result<(), ProcessError>;

    /// Kill the process unconditionally (SIGKILL / `TerminateProcess`).
    fn kill(&self, handle: &ProcessHandle) -> Result<(), ProcessError>;
}
