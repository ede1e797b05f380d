//! Process detection and termination.

mod matcher;
mod system_table;
mod termination;

pub use matcher::ProcessMatcher;
pub use system_table::SystemProcessTable;
pub use termination::TerminationController;
