#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unsafe_code)]

pub mod coordinator;
pub mod process;
pub mod sessions;
pub mod transfer;

// Re-export the engines for the CLI composition root
pub use coordinator::{ChannelSink, Envelope, OperationId, WorkerCoordinator};
pub use process::{ProcessMatcher, SystemProcessTable, TerminationController};
pub use sessions::{SessionError, SessionStore, format_size};
pub use transfer::{
    AUTH_STATE_FILE, AccountRestoreWorker, AutoBackupPlan, IdentityRefresh, ResetSpec,
    ResetWorker, TransferJob, TransferWorker, prune_auto_backups, regenerate_ids,
};

// Part of the `TransferJob` signature
pub use tokio_util::sync::CancellationToken;
