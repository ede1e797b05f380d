//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the engines expect from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No `sysinfo`/`nix` types in any signature
//! - No channel types in any signature: event transport is the adapter's choice
//! - Methods are synchronous and cheap enough to call from a blocking thread

pub mod event_sink;
pub mod process_table;

pub use event_sink::{CollectingSink, NoopSink, OperationEventSink};
pub use process_table::ProcessTable;
