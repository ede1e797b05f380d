//! Cancellable backup, restore and reset engines, plus the identifier
//! refresh helper.
//!
//! Engines are synchronous: they do plain blocking file I/O and are meant to
//! run on a blocking thread (see `WorkerCoordinator`). They report through an
//! `OperationEventSink` and check a `CancellationToken` between items.

mod account;
pub mod fsops;
mod identity;
mod progress;
mod reset;
mod worker;

use surfmgr_core::{OperationEventSink, TransferResult};
use tokio_util::sync::CancellationToken;

pub use account::{AUTH_STATE_FILE, AccountRestoreWorker};
pub use identity::{IdentityRefresh, regenerate_ids};
pub use progress::{ProgressReporter, ScaledSink, phase_percent};
pub use reset::{AutoBackupPlan, ResetSpec, ResetWorker, prune_auto_backups};
pub use worker::TransferWorker;

/// A unit of blocking work that ends in exactly one `TransferResult`.
///
/// Jobs emit progress and log events only; the terminal event is emitted by
/// whoever runs the job.
pub trait TransferJob: Send + 'static {
    /// Short label for logs (e.g. `"backup"`).
    fn label(&self) -> String;

    fn run(self, cancel: &CancellationToken, sink: &dyn OperationEventSink) -> TransferResult;
}
