//! Backup, restore and reset command handlers.
//!
//! Each command optionally smart-closes the application, then runs one
//! transfer job through a `WorkerCoordinator` while drawing its progress.
//! Ctrl-C cancels the job; the handler still waits for its `Finished` event.

use std::path::PathBuf;

use anyhow::Result;
use surfmgr_core::{AppProfile, BackupMetadata, OperationEvent, TransferResult, TransferSpec};
use surfmgr_runtime::{
    AccountRestoreWorker, AutoBackupPlan, ResetSpec, ResetWorker, SessionError, SessionStore,
    TransferJob, TransferWorker, WorkerCoordinator, regenerate_ids,
};
use tracing::warn;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::TransferProgressBar;

/// What to do when the application cannot be closed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnCloseFailure {
    Warn,
    Abort,
}

/// Execute the backup command.
pub async fn backup(ctx: &CliContext, profile: &str, session: &str, skip_close: bool) -> Result<()> {
    let profile = ctx.profile(profile)?;
    let key = profile.key();
    SessionStore::validate_name(session).map_err(CliError::from)?;

    let data_root = existing_data_root(&profile)?;
    let archive = ctx.sessions.session_path(&key, session).map_err(CliError::from)?;
    if archive.is_dir() {
        return Err(CliError::from(SessionError::AlreadyExists(session.to_string())).into());
    }

    close_first(ctx, &profile, skip_close, OnCloseFailure::Warn).await?;

    let spec = TransferSpec::backup(data_root, archive)
        .with_items(profile.backup_items.clone())
        .with_addons(profile.addon_paths())
        .with_metadata(BackupMetadata::now(&key, session));

    let result = run_job(TransferWorker::new(spec), "Backup").await?;
    println!("{}: {} saved as '{session}'", result.message, profile.label());
    Ok(())
}

/// Execute the restore command.
///
/// On success the restored session becomes the active one.
pub async fn restore(ctx: &CliContext, profile: &str, session: &str, skip_close: bool) -> Result<()> {
    let profile = ctx.profile(profile)?;
    let key = profile.key();
    let (archive, data_root) = restore_paths(ctx, &profile, session)?;

    close_first(ctx, &profile, skip_close, OnCloseFailure::Warn).await?;

    let spec = TransferSpec::restore(archive, data_root).with_addons(profile.addon_paths());
    let result = run_job(TransferWorker::new(spec), "Restore").await?;

    if let Err(e) = ctx.sessions.set_active(&key, session) {
        warn!(app = %key, session, error = %e, "Could not mark session active");
    }
    println!("{}: {} is now on '{session}'", result.message, profile.label());
    Ok(())
}

/// Execute `restore --account-only`: switch the signed-in account without
/// touching other data. The active session is left unchanged.
pub async fn restore_account(ctx: &CliContext, profile: &str, session: &str, skip_close: bool) -> Result<()> {
    let profile = ctx.profile(profile)?;
    let (archive, data_root) = restore_paths(ctx, &profile, session)?;

    close_first(ctx, &profile, skip_close, OnCloseFailure::Warn).await?;

    let result = run_job(AccountRestoreWorker::new(archive, data_root), "Account switch").await?;
    println!("{}: {} now uses the account from '{session}'", result.message, profile.label());
    Ok(())
}

/// Execute the new-id command.
pub async fn new_id(ctx: &CliContext, profile: &str, skip_close: bool) -> Result<()> {
    let profile = ctx.profile(profile)?;
    let data_root = existing_data_root(&profile)?;

    close_first(ctx, &profile, skip_close, OnCloseFailure::Warn).await?;

    let refresh = tokio::task::spawn_blocking(move || regenerate_ids(&data_root))
        .await
        .map_err(|e| CliError::Core(format!("identifier refresh task failed: {e}")))?
        .map_err(|e| CliError::Transfer(e.to_string()))?;

    println!(
        "Updated {} identifier(s) in {} file(s) for {}",
        refresh.keys_updated,
        refresh.files_updated,
        profile.label()
    );
    println!("  machineId: {}", refresh.machine_id);
    println!("  sessionId: {}", refresh.session_id);
    Ok(())
}

/// Execute the reset command.
///
/// Unlike backup and restore, a reset does not proceed while the
/// application is still running.
pub async fn reset(
    ctx: &CliContext,
    profile: &str,
    auto_backup: bool,
    skip_close: bool,
    confirmed: bool,
) -> Result<()> {
    let profile = ctx.profile(profile)?;
    if !confirmed {
        return Err(CliError::Arguments(format!(
            "reset deletes all {} data; pass --yes to confirm",
            profile.label()
        ))
        .into());
    }
    let key = profile.key();
    let data_root = existing_data_root(&profile)?;

    close_first(ctx, &profile, skip_close, OnCloseFailure::Abort).await?;

    let auto_backup = auto_backup.then(|| AutoBackupPlan {
        dest: ctx.sessions.new_auto_backup_path(&key),
        keep: ctx.settings.effective_auto_backup_keep(),
    });
    let spec = ResetSpec {
        data_root,
        addon_paths: profile.addon_paths(),
        auto_backup,
    };

    let result = run_job(ResetWorker::new(spec), "Reset").await?;
    println!("{}: {}", result.message, profile.label());
    Ok(())
}

/// Archive and destination of a restore; the archive must exist.
fn restore_paths(ctx: &CliContext, profile: &AppProfile, session: &str) -> Result<(PathBuf, PathBuf), CliError> {
    let archive = ctx.sessions.session_path(&profile.key(), session)?;
    if !archive.is_dir() {
        return Err(SessionError::NotFound(session.to_string()).into());
    }
    let data_root = profile.data_root().ok_or_else(|| {
        CliError::Config(format!("No data path configured for {}", profile.label()))
    })?;
    Ok((archive, data_root))
}

fn existing_data_root(profile: &AppProfile) -> Result<PathBuf, CliError> {
    profile
        .data_root()
        .filter(|path| path.exists())
        .ok_or_else(|| CliError::Config(format!("No data folder found for {}", profile.label())))
}

async fn close_first(
    ctx: &CliContext,
    profile: &AppProfile,
    skip_close: bool,
    on_failure: OnCloseFailure,
) -> Result<(), CliError> {
    let query = profile.process_query();
    if skip_close || query.is_empty() {
        return Ok(());
    }

    println!("Closing {}...", profile.label());
    let outcome = ctx
        .controller
        .smart_close(
            profile.label(),
            &query,
            ctx.timings.close_timeout,
            ctx.timings.max_retries,
        )
        .await;
    if outcome.success {
        return Ok(());
    }
    match on_failure {
        OnCloseFailure::Warn => {
            println!("Warning: {}; continuing", outcome.message);
            Ok(())
        }
        OnCloseFailure::Abort => Err(CliError::Process(format!(
            "Failed to close {}: {}",
            profile.label(),
            outcome.message
        ))),
    }
}

/// Run `job` to completion, cancelling it on Ctrl-C.
async fn run_job<J: TransferJob>(job: J, title: &str) -> Result<TransferResult, CliError> {
    let interrupt = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    drive(job, &TransferProgressBar::new(title), interrupt).await
}

/// Drive one job through a fresh coordinator until its `Finished` event.
///
/// When `interrupt` completes the job is cancelled and driving continues,
/// so the reported result is always the job's own.
pub(crate) async fn drive<J, I>(
    job: J,
    bar: &TransferProgressBar,
    interrupt: I,
) -> Result<TransferResult, CliError>
where
    J: TransferJob,
    I: Future<Output = ()>,
{
    let mut coordinator = WorkerCoordinator::new();
    let operation = coordinator.start(job);
    let cancel = coordinator.cancel_token(operation);

    tokio::pin!(interrupt);
    let mut interrupted = false;
    loop {
        tokio::select! {
            () = &mut interrupt, if !interrupted => {
                interrupted = true;
                bar.println("Cancelling...");
                if let Some(token) = &cancel {
                    token.cancel();
                }
            }
            envelope = coordinator.next_event() => {
                let Some(envelope) = envelope else { break };
                bar.handle(&envelope.event);
                if let OperationEvent::Finished(result) = envelope.event {
                    return into_outcome(result);
                }
            }
        }
    }
    Err(CliError::Core("operation ended without a result".to_string()))
}

fn into_outcome(result: TransferResult) -> Result<TransferResult, CliError> {
    if result.is_cancelled() {
        Err(CliError::Cancelled)
    } else if result.success {
        Ok(result)
    } else {
        Err(CliError::Transfer(result.message))
    }
}
