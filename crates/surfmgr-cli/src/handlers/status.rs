//! Status command handler.
//!
//! Shows whether applications are running and which session is active.

use anyhow::Result;

use crate::bootstrap::CliContext;
use crate::commands::TargetArgs;
use crate::presentation::{print_separator, truncate_string};

/// Execute the status command.
///
/// Without a target every active profile is listed in a table; with one the
/// matching processes are printed individually.
pub fn execute(ctx: &CliContext, target: &TargetArgs) -> Result<()> {
    if target.is_empty() {
        return list_profiles(ctx);
    }

    let resolved = ctx.resolve_target(target)?;
    let handles = ctx.matcher().query(&resolved.query);
    if handles.is_empty() {
        println!("{} is not running", resolved.label);
    } else {
        println!("{} is running ({} process(es)):", resolved.label, handles.len());
        for handle in &handles {
            println!("  {handle}");
        }
    }

    if let Some(name) = &target.profile {
        let profile = ctx.profile(name)?;
        match ctx.sessions.active_session(&profile.key()) {
            Some(session) => println!("Active session: {session}"),
            None => println!("Active session: --"),
        }
    }
    Ok(())
}

fn list_profiles(ctx: &CliContext) -> Result<()> {
    let profiles = ctx.active_profiles()?;
    if profiles.is_empty() {
        println!("No application profiles found in {}", ctx.profiles_dir.display());
        return Ok(());
    }

    println!("{:<20} {:<10} {:<22} Data folder", "App", "State", "Active session");
    print_separator(90);
    for profile in &profiles {
        let query = profile.process_query();
        let state = if query.is_empty() {
            "--"
        } else if ctx.matcher().is_running(&query) {
            "running"
        } else {
            "stopped"
        };
        let active = ctx
            .sessions
            .active_session(&profile.key())
            .unwrap_or_else(|| "--".to_string());
        let data = profile
            .data_root()
            .map_or_else(|| "--".to_string(), |path| path.display().to_string());
        println!(
            "{:<20} {:<10} {:<22} {}",
            truncate_string(profile.label(), 19),
            state,
            truncate_string(&active, 21),
            data
        );
    }
    Ok(())
}
