//! Settings domain types and validation.
//!
//! `Settings` is the persisted, partially-filled form (every field optional so
//! a settings file only needs the values it overrides). `Timings` is the
//! resolved form the runtime consumes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Graceful-terminate timeout used by plain kill requests.
pub const DEFAULT_KILL_TIMEOUT: Duration = Duration::from_secs(5);
/// Graceful-terminate timeout used by smart close.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(10);
/// Retry budget for smart close.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Number of automatic backups kept per application.
pub const DEFAULT_AUTO_BACKUP_KEEP: usize = 5;

const MAX_TIMEOUT: Duration = Duration::from_secs(300);
const MAX_RETRIES: u32 = 10;

/// Fully resolved timing parameters for process control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub kill_timeout: Duration,
    pub close_timeout: Duration,
    /// Wait after a forceful kill before declaring failure.
    pub force_kill_grace: Duration,
    /// Pause between kill passes in `kill_all`.
    pub kill_settle: Duration,
    /// Wait when smart close finds the app already stopped.
    pub idle_settle: Duration,
    /// Wait after a successful close so the OS releases file handles.
    pub file_release_wait: Duration,
    pub retry_delay: Duration,
    pub max_retries: u32,
    /// Poll period of `wait_for_exit`.
    pub exit_poll_interval: Duration,
    /// Poll period while waiting on one process handle.
    pub alive_poll_interval: Duration,
    /// Lifetime of a process query cache entry.
    pub cache_ttl: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            kill_timeout: DEFAULT_KILL_TIMEOUT,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            force_kill_grace: Duration::from_secs(2),
            kill_settle: Duration::from_millis(500),
            idle_settle: Duration::from_secs(2),
            file_release_wait: Duration::from_secs(3),
            retry_delay: Duration::from_secs(2),
            max_retries: DEFAULT_MAX_RETRIES,
            exit_poll_interval: Duration::from_millis(500),
            alive_poll_interval: Duration::from_millis(100),
            cache_ttl: Duration::from_secs(2),
        }
    }
}

/// Application settings structure.
///
/// All fields are optional to support partial files and graceful defaults.
/// Durations use humantime notation (`"2s"`, `"500ms"`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub kill_timeout: Option<Duration>,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub close_timeout: Option<Duration>,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub force_kill_grace: Option<Duration>,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub kill_settle: Option<Duration>,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub idle_settle: Option<Duration>,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub file_release_wait: Option<Duration>,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub retry_delay: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub cache_ttl: Option<Duration>,

    /// Automatic backups to keep per application.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_backup_keep: Option<usize>,
    /// Root folder for manual session archives.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_root: Option<PathBuf>,
    /// Root folder for automatic pre-reset archives.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_backup_root: Option<PathBuf>,
}

impl Settings {
    /// Settings with every timing spelled out.
    #[must_use]
    pub fn with_defaults() -> Self {
        let t = Timings::default();
        Self {
            kill_timeout: Some(t.kill_timeout),
            close_timeout: Some(t.close_timeout),
            force_kill_grace: Some(t.force_kill_grace),
            kill_settle: Some(t.kill_settle),
            idle_settle: Some(t.idle_settle),
            file_release_wait: Some(t.file_release_wait),
            retry_delay: Some(t.retry_delay),
            max_retries: Some(t.max_retries),
            cache_ttl: Some(t.cache_ttl),
            auto_backup_keep: Some(DEFAULT_AUTO_BACKUP_KEEP),
            backup_root: None,
            auto_backup_root: None,
        }
    }

    /// Load settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let settings: Self = serde_json::from_str(&raw).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        validate_settings(&settings)?;
        tracing::debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Resolve into concrete timings, falling back to defaults.
    pub fn timings(&self) -> Timings {
        let d = Timings::default();
        Timings {
            kill_timeout: self.kill_timeout.unwrap_or(d.kill_timeout),
            close_timeout: self.close_timeout.unwrap_or(d.close_timeout),
            force_kill_grace: self.force_kill_grace.unwrap_or(d.force_kill_grace),
            kill_settle: self.kill_settle.unwrap_or(d.kill_settle),
            idle_settle: self.idle_settle.unwrap_or(d.idle_settle),
            file_release_wait: self.file_release_wait.unwrap_or(d.file_release_wait),
            retry_delay: self.retry_delay.unwrap_or(d.retry_delay),
            max_retries: self.max_retries.unwrap_or(d.max_retries),
            exit_poll_interval: d.exit_poll_interval,
            alive_poll_interval: d.alive_poll_interval,
            cache_ttl: self.cache_ttl.unwrap_or(d.cache_ttl),
        }
    }

    /// Get the effective auto-backup retention (with default fallback).
    pub fn effective_auto_backup_keep(&self) -> usize {
        self.auto_backup_keep.unwrap_or(DEFAULT_AUTO_BACKUP_KEEP)
    }
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Failed to read settings {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Invalid settings file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("{field} must be between 1ms and 5m, got {value:?}")]
    InvalidDuration { field: &'static str, value: Duration },

    #[error("max_retries must be at most 10, got {0}")]
    InvalidRetries(u32),

    #[error("auto_backup_keep must be at least 1")]
    InvalidRetention,
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    let durations = [
        ("kill_timeout", settings.kill_timeout),
        ("close_timeout", settings.close_timeout),
        ("force_kill_grace", settings.force_kill_grace),
        ("retry_delay", settings.retry_delay),
        ("cache_ttl", settings.cache_ttl),
    ];
    for (field, value) in durations {
        if let Some(value) = value
            && (value.is_zero() || value > MAX_TIMEOUT)
        {
            return Err(SettingsError::InvalidDuration { field, value });
        }
    }

    // Settle windows may legitimately be zero; only bound them from above.
    let settles = [
        ("kill_settle", settings.kill_settle),
        ("idle_settle", settings.idle_settle),
        ("file_release_wait", settings.file_release_wait),
    ];
    for (field, value) in settles {
        if let Some(value) = value
            && value > MAX_TIMEOUT
        {
            return Err(SettingsError::InvalidDuration { field, value });
        }
    }

    if let Some(retries) = settings.max_retries
        && retries > MAX_RETRIES
    {
        return Err(SettingsError::InvalidRetries(retries));
    }
    if settings.auto_backup_keep == Some(0) {
        return Err(SettingsError::InvalidRetention);
    }
    Ok(())
}
