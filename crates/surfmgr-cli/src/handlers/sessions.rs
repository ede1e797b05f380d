//! Session management command handlers.

use anyhow::Result;
use surfmgr_core::Session;
use surfmgr_runtime::{SessionError, format_size};

use crate::bootstrap::CliContext;
use crate::commands::SessionsCommand;
use crate::error::CliError;
use crate::presentation::{format_session_flags, print_separator, truncate_string};

/// Execute a `sessions` subcommand.
pub fn execute(ctx: &CliContext, command: &SessionsCommand) -> Result<()> {
    match command {
        SessionsCommand::List { profile, all, json } => list(ctx, profile.as_deref(), *all, *json),
        SessionsCommand::Delete { profile, session } => {
            let key = ctx.profile(profile)?.key();
            ctx.sessions.delete(&key, session).map_err(CliError::from)?;
            println!("Deleted session '{session}'");
            Ok(())
        }
        SessionsCommand::Rename { profile, old, new } => {
            let key = ctx.profile(profile)?.key();
            ctx.sessions.rename(&key, old, new).map_err(CliError::from)?;
            println!("Renamed '{old}' to '{new}'");
            Ok(())
        }
        SessionsCommand::Activate { profile, session } => {
            let key = ctx.profile(profile)?.key();
            if !ctx.sessions.exists(&key, session).map_err(CliError::from)? {
                return Err(CliError::from(SessionError::NotFound(session.clone())).into());
            }
            ctx.sessions.set_active(&key, session).map_err(CliError::from)?;
            println!("'{session}' is now the active session");
            Ok(())
        }
        SessionsCommand::Prune { profile, keep } => {
            let key = ctx.profile(profile)?.key();
            let keep = keep.unwrap_or_else(|| ctx.settings.effective_auto_backup_keep());
            if keep == 0 {
                return Err(CliError::Arguments("--keep must be at least 1".to_string()).into());
            }
            let removed = ctx.sessions.prune_auto_backups(&key, keep);
            println!(
                "Removed {removed} automatic backup(s), {} left",
                ctx.sessions.count_auto_backups(&key)
            );
            Ok(())
        }
    }
}

fn list(ctx: &CliContext, profile: Option<&str>, include_auto: bool, json: bool) -> Result<()> {
    let keys = match profile {
        Some(name) => vec![ctx.profile(name)?.key()],
        None => ctx.active_profiles()?.iter().map(|p| p.key()).collect(),
    };

    let mut sessions: Vec<Session> = Vec::new();
    for key in &keys {
        sessions.extend(ctx.sessions.list(key, include_auto).map_err(CliError::from)?);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!("No sessions found.");
        println!("Use 'surfmgr backup <profile> <session>' to create one.");
        return Ok(());
    }

    println!("Found {} session(s):\n", sessions.len());
    println!(
        "{:<2} {:<12} {:<28} {:>10} Modified",
        "", "App", "Session", "Size"
    );
    print_separator(80);
    for session in &sessions {
        println!(
            "{:<2} {:<12} {:<28} {:>10} {}",
            format_session_flags(session),
            truncate_string(&session.app, 11),
            truncate_string(&session.name, 27),
            format_size(session.size),
            session.modified.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    Ok(())
}
