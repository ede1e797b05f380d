//! Main commands enum and subcommands.
//!
//! This module defines the available commands for the CLI tool.

use clap::{Args, Subcommand};

/// How a command picks the processes it acts on.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetArgs {
    /// Process image name to match (repeatable, case-insensitive)
    #[arg(short = 'n', long = "name", conflicts_with = "profile")]
    pub names: Vec<String>,

    /// Application profile whose executables should be matched
    #[arg(short = 'p', long = "profile")]
    pub profile: Option<String>,
}

impl TargetArgs {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.profile.is_none()
    }
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Show whether applications are running and their active session
    Status {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Stop processes: terminate, then force kill after the timeout
    Kill {
        #[command(flatten)]
        target: TargetArgs,
        /// Kill a single process by PID instead of by name
        #[arg(long, conflicts_with_all = ["names", "profile"])]
        pid: Option<u32>,
        /// Seconds to wait for a graceful exit before force killing
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Close an application with retries and wait for it to release its files
    Close {
        #[command(flatten)]
        target: TargetArgs,
        /// Seconds each attempt waits for a graceful exit
        #[arg(short, long)]
        timeout: Option<u64>,
        /// Number of close attempts
        #[arg(short, long)]
        retries: Option<u32>,
    },

    /// Wait until no matching process is running
    Wait {
        #[command(flatten)]
        target: TargetArgs,
        /// Seconds to wait before giving up
        #[arg(short, long, default_value_t = 30)]
        timeout: u64,
    },

    /// Copy an application's data into a new backup session
    Backup {
        /// Application profile
        profile: String,
        /// Name of the session to create
        session: String,
        /// Do not close the application first
        #[arg(long)]
        skip_close: bool,
    },

    /// Replace an application's data with a backup session
    Restore {
        /// Application profile
        profile: String,
        /// Session to restore (auto-backups are addressed by their auto-... name)
        session: String,
        /// Only switch the signed-in account, leaving other data as it is
        #[arg(long)]
        account_only: bool,
        /// Do not close the application first
        #[arg(long)]
        skip_close: bool,
    },

    /// Delete an application's data, optionally taking an automatic backup first
    Reset {
        /// Application profile
        profile: String,
        /// Skip the automatic backup
        #[arg(long)]
        no_auto_backup: bool,
        /// Do not close the application first
        #[arg(long)]
        skip_close: bool,
        /// Confirm the reset
        #[arg(short, long)]
        yes: bool,
    },

    /// Give an application new machine and session identifiers
    NewId {
        /// Application profile
        profile: String,
        /// Do not close the application first
        #[arg(long)]
        skip_close: bool,
    },

    /// Manage stored backup sessions
    Sessions {
        #[command(subcommand)]
        command: SessionsCommand,
    },
}

/// Session management subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SessionsCommand {
    /// List sessions, newest first
    List {
        /// Application profile (all active profiles when omitted)
        profile: Option<String>,
        /// Include automatic backups
        #[arg(short, long)]
        all: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Delete a session
    Delete {
        profile: String,
        session: String,
    },

    /// Rename a session
    Rename {
        profile: String,
        old: String,
        new: String,
    },

    /// Mark a session as the active one
    Activate {
        profile: String,
        session: String,
    },

    /// Delete old automatic backups
    Prune {
        profile: String,
        /// Number of automatic backups to keep (defaults to the configured retention)
        #[arg(short, long)]
        keep: Option<usize>,
    },
}
