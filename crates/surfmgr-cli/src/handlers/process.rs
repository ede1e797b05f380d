//! Kill, close and wait command handlers.

use std::time::Duration;

use anyhow::Result;
use surfmgr_core::TerminationOutcome;

use crate::bootstrap::CliContext;
use crate::commands::TargetArgs;
use crate::error::CliError;

/// Execute the kill command.
///
/// With `pid` a single process is stopped; otherwise every process matching
/// the target is.
pub async fn kill(
    ctx: &CliContext,
    target: &TargetArgs,
    pid: Option<u32>,
    timeout_secs: Option<u64>,
) -> Result<()> {
    let outcome = match (pid, timeout_secs) {
        (Some(pid), None) => ctx.controller.kill_pid(pid).await,
        (Some(pid), Some(secs)) => {
            let handle = ctx
                .matcher()
                .find_pid(pid)
                .ok_or_else(|| CliError::Process(format!("process not found: PID {pid}")))?;
            ctx.controller.kill_process(&handle, Duration::from_secs(secs)).await
        }
        (None, timeout_secs) => {
            let resolved = ctx.resolve_target(target)?;
            let timeout = timeout_secs.map_or(ctx.timings.kill_timeout, Duration::from_secs);
            ctx.controller.kill_all(&resolved.query, timeout).await
        }
    };
    report(outcome)
}

/// Execute the close command (smart close with retries).
pub async fn close(
    ctx: &CliContext,
    target: &TargetArgs,
    timeout_secs: Option<u64>,
    retries: Option<u32>,
) -> Result<()> {
    let resolved = ctx.resolve_target(target)?;
    let timeout = timeout_secs.map_or(ctx.timings.close_timeout, Duration::from_secs);
    let retries = retries.unwrap_or(ctx.timings.max_retries);

    let outcome = ctx
        .controller
        .smart_close(&resolved.label, &resolved.query, timeout, retries)
        .await;
    report(outcome)
}

/// Execute the wait command.
pub async fn wait(ctx: &CliContext, target: &TargetArgs, timeout_secs: u64) -> Result<()> {
    let resolved = ctx.resolve_target(target)?;
    let timeout = Duration::from_secs(timeout_secs);

    if ctx.controller.wait_for_exit(&resolved.query, timeout).await {
        println!("{} is not running", resolved.label);
        Ok(())
    } else {
        Err(CliError::Process(format!(
            "{} still running after {timeout_secs}s",
            resolved.label
        ))
        .into())
    }
}

fn report(outcome: TerminationOutcome) -> Result<()> {
    if outcome.success {
        println!("{}", outcome.message);
        Ok(())
    } else {
        Err(CliError::Process(outcome.message).into())
    }
}
