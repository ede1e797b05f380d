//! CLI bootstrap - the composition root.
//!
//! This module is the only place where the CLI wires infrastructure together:
//! - Settings file and directory defaults (via surfmgr-core)
//! - Process table, matcher and termination controller (via surfmgr-runtime)
//! - Session store for backup archives
//!
//! Command handlers receive the composed `CliContext`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use surfmgr_core::paths::{
    default_auto_backup_root, default_backup_root, default_profiles_dir, default_settings_path,
};
use surfmgr_core::{AppProfile, OperationEventSink, ProcessQuery, ProcessTable, Settings, Timings};
use surfmgr_runtime::{ProcessMatcher, SessionStore, SystemProcessTable, TerminationController};
use tracing::debug;

use crate::commands::TargetArgs;
use crate::error::CliError;
use crate::parser::Cli;
use crate::presentation::ConsoleSink;

/// Bootstrap configuration for the CLI.
///
/// Every field overrides what the settings file or the platform defaults
/// would otherwise provide.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub settings_path: Option<PathBuf>,
    pub profiles_dir: Option<PathBuf>,
    pub backup_root: Option<PathBuf>,
    pub auto_root: Option<PathBuf>,
}

impl CliConfig {
    /// Take the overrides given on the command line (or through `SURFMGR_*`).
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            settings_path: cli.settings.clone(),
            profiles_dir: cli.profiles_dir.clone(),
            backup_root: cli.backup_root.clone(),
            auto_root: cli.auto_root.clone(),
        }
    }
}

/// Processes selected by a command, with a label for messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub label: String,
    pub query: ProcessQuery,
}

/// Fully composed application context for CLI commands.
pub struct CliContext {
    pub settings: Settings,
    pub timings: Timings,
    pub profiles_dir: PathBuf,
    pub sessions: SessionStore,
    pub controller: TerminationController,
}

impl CliContext {
    /// Access the process matcher shared with the controller.
    pub fn matcher(&self) -> &ProcessMatcher {
        self.controller.matcher()
    }

    /// Look up one profile by name (case-insensitive).
    pub fn profile(&self, name: &str) -> Result<AppProfile, CliError> {
        Ok(AppProfile::find(&self.profiles_dir, name)?)
    }

    /// Every profile marked active.
    pub fn active_profiles(&self) -> Result<Vec<AppProfile>, CliError> {
        let mut profiles = AppProfile::load_dir(&self.profiles_dir)?;
        profiles.retain(|profile| profile.active);
        Ok(profiles)
    }

    /// Turn `--name`/`--profile` into a process query.
    pub fn resolve_target(&self, target: &TargetArgs) -> Result<ResolvedTarget, CliError> {
        if let Some(name) = &target.profile {
            let profile = self.profile(name)?;
            let query = profile.process_query();
            if query.is_empty() {
                return Err(CliError::Config(format!(
                    "Profile '{}' lists no executables",
                    profile.app_name
                )));
            }
            return Ok(ResolvedTarget {
                label: profile.label().to_string(),
                query,
            });
        }

        let query = ProcessQuery::new(&target.names);
        if query.is_empty() {
            return Err(CliError::Arguments(
                "specify a process with --name or --profile".to_string(),
            ));
        }
        Ok(ResolvedTarget {
            label: query.names().collect::<Vec<_>>().join(", "),
            query,
        })
    }
}

/// Bootstrap the CLI application against the real process table.
pub fn bootstrap(config: CliConfig) -> Result<CliContext, CliError> {
    bootstrap_with(config, Arc::new(SystemProcessTable::new()), Arc::new(ConsoleSink))
}

/// Bootstrap with an injected process table and event sink (for testing).
pub fn bootstrap_with(
    config: CliConfig,
    table: Arc<dyn ProcessTable>,
    sink: Arc<dyn OperationEventSink>,
) -> Result<CliContext, CliError> {
    let settings = load_settings(config.settings_path.as_deref())?;
    let timings = settings.timings();

    let profiles_dir = config
        .profiles_dir
        .or_else(default_profiles_dir)
        .ok_or_else(|| missing_dir("profiles", "--profiles-dir"))?;
    let backup_root = config
        .backup_root
        .or_else(|| settings.backup_root.clone())
        .or_else(default_backup_root)
        .ok_or_else(|| missing_dir("backup", "--backup-root"))?;
    let auto_root = config
        .auto_root
        .or_else(|| settings.auto_backup_root.clone())
        .or_else(default_auto_backup_root)
        .ok_or_else(|| missing_dir("auto-backup", "--auto-root"))?;

    debug!(
        profiles = %profiles_dir.display(),
        backups = %backup_root.display(),
        auto_backups = %auto_root.display(),
        "CLI context ready"
    );

    let matcher = Arc::new(ProcessMatcher::new(table, &timings));
    let controller = TerminationController::new(matcher, timings).with_sink(sink);

    Ok(CliContext {
        settings,
        timings,
        profiles_dir,
        sessions: SessionStore::new(backup_root, auto_root),
        controller,
    })
}

/// An explicit settings file must load; the default one is optional.
fn load_settings(explicit: Option<&Path>) -> Result<Settings, CliError> {
    if let Some(path) = explicit {
        return Ok(Settings::load(path)?);
    }
    match default_settings_path() {
        Some(path) if path.is_file() => Ok(Settings::load(&path)?),
        _ => Ok(Settings::default()),
    }
}

fn missing_dir(what: &str, flag: &str) -> CliError {
    CliError::Config(format!("cannot determine the {what} directory; pass {flag}"))
}
