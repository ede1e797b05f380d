#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod errors;
pub mod events;
pub mod paths;
pub mod ports;
pub mod profile;
pub mod settings;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export commonly used types for convenience
pub use domain::{
    ADDONS_DIR, AUTO_SESSION_PREFIX, BackupMetadata, ItemKind, METADATA_FILE, ProcessHandle,
    ProcessQuery, Session, TerminationOutcome, TransferDirection, TransferItem, TransferProgress,
    TransferResult, TransferSpec,
};
pub use errors::{ProcessError, TransferError};
pub use events::OperationEvent;
pub use ports::{CollectingSink, NoopSink, OperationEventSink, ProcessTable};
pub use profile::{AppPaths, AppProfile, ProfileError};
pub use settings::{Settings, SettingsError, Timings, validate_settings};
