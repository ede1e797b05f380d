//! Domain types shared by the process and transfer engines.
//!
//! These are plain values: no OS handles, no channels, no filesystem access.

mod process;
mod session;
mod transfer;

pub use process::{ProcessHandle, ProcessQuery, TerminationOutcome};
pub use session::{AUTO_SESSION_PREFIX, BackupMetadata, Session};
pub use transfer::{
    ADDONS_DIR, ItemKind, METADATA_FILE, TransferDirection, TransferItem, TransferProgress,
    TransferResult, TransferSpec,
};
