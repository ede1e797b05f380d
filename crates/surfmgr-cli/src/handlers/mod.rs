//! Command handlers.
//!
//! Handlers follow one pattern:
//! - Signature: `pub [async] fn execute(ctx: &CliContext, ...) -> Result<()>`
//! - Thin wrappers that:
//!   1. Resolve profiles and process targets through the context
//!   2. Call the runtime (controller, workers, session store)
//!   3. Format output for the terminal
//!
//! Failures are returned as `CliError` (inside `anyhow`) so `main` can pick
//! the exit code.

pub mod process;
pub mod sessions;
pub mod status;
pub mod transfer;
