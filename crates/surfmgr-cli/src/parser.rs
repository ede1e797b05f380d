//! Main CLI parser and top-level argument handling.
//!
//! This module defines the root CLI structure with global options.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface for closing applications and managing their
/// data snapshots.
///
/// This is the top-level parser that handles global options and dispatches
/// to subcommands.
#[derive(Parser)]
#[command(name = "surfmgr")]
#[command(about = "Close applications and back up, restore or reset their data")]
#[command(version)]
pub struct Cli {
    /// Settings file (JSON) with timing overrides
    #[arg(long = "settings", global = true, env = "SURFMGR_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Directory containing application profiles
    #[arg(long = "profiles-dir", global = true, env = "SURFMGR_PROFILES_DIR")]
    pub profiles_dir: Option<PathBuf>,

    /// Root folder for manual backup sessions
    #[arg(long = "backup-root", global = true, env = "SURFMGR_BACKUP_ROOT")]
    pub backup_root: Option<PathBuf>,

    /// Root folder for automatic pre-reset backups
    #[arg(long = "auto-root", global = true, env = "SURFMGR_AUTO_ROOT")]
    pub auto_root: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
