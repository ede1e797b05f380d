//! On-disk session archives.
//!
//! Layout:
//!
//! ```text
//! <backup_root>/<app>/<session>/...        manual sessions
//! <backup_root>/<app>/.active              name of the active session
//! <auto_root>/<app>/auto-YYYYMMDD_HHMMSS/  automatic pre-reset backups
//! ```
//!
//! App keys are lowercased.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use surfmgr_core::{AUTO_SESSION_PREFIX, Session};
use thiserror::Error;
use tracing::{debug, warn};

use crate::transfer::fsops::{dir_size, entry_name, remove_entry};
use crate::transfer::prune_auto_backups;

const ACTIVE_MARKER: &str = ".active";

/// Errors from session management.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid session name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SessionError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Session archives for every application.
#[derive(Debug, Clone)]
pub struct SessionStore {
    backup_root: PathBuf,
    auto_root: PathBuf,
}

impl SessionStore {
    pub fn new(backup_root: impl Into<PathBuf>, auto_root: impl Into<PathBuf>) -> Self {
        Self {
            backup_root: backup_root.into(),
            auto_root: auto_root.into(),
        }
    }

    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    pub fn auto_root(&self) -> &Path {
        &self.auto_root
    }

    fn app_dir(&self, app: &str) -> PathBuf {
        self.backup_root.join(app.to_lowercase())
    }

    fn auto_dir(&self, app: &str) -> PathBuf {
        self.auto_root.join(app.to_lowercase())
    }

    /// Check a user-supplied name for a new manual session.
    pub fn validate_name(name: &str) -> Result<(), SessionError> {
        let invalid = |reason| {
            Err(SessionError::InvalidName {
                name: name.to_string(),
                reason,
            })
        };
        if name.trim().is_empty() {
            return invalid("name is empty");
        }
        if name.contains(['/', '\\']) {
            return invalid("name must not contain path separators");
        }
        if name.starts_with('.') {
            return invalid("name must not start with '.'");
        }
        if Session::is_auto_name(name) {
            return invalid("the 'auto-' prefix is reserved for automatic backups");
        }
        Ok(())
    }

    /// Check the name of an existing session before it is joined to a path.
    ///
    /// Looser than `validate_name`: `auto-` names are accepted, anything that
    /// would leave the app folder is not.
    pub fn check_lookup_name(name: &str) -> Result<(), SessionError> {
        let reason = if name.trim().is_empty() {
            "name is empty"
        } else if name.contains(['/', '\\']) {
            "name must not contain path separators"
        } else if name == "." || name == ".." {
            "name must not refer to a parent folder"
        } else {
            return Ok(());
        };
        Err(SessionError::InvalidName {
            name: name.to_string(),
            reason,
        })
    }

    /// Folder of a session. `auto-` names resolve under the auto root.
    pub fn session_path(&self, app: &str, name: &str) -> Result<PathBuf, SessionError> {
        Self::check_lookup_name(name)?;
        Ok(if Session::is_auto_name(name) {
            self.auto_dir(app).join(name)
        } else {
            self.app_dir(app).join(name)
        })
    }

    pub fn exists(&self, app: &str, name: &str) -> Result<bool, SessionError> {
        Ok(self.session_path(app, name)?.is_dir())
    }

    /// Sessions of `app`, newest first.
    pub fn list(&self, app: &str, include_auto: bool) -> Result<Vec<Session>, SessionError> {
        let active = self.active_session(app);
        let mut sessions = Self::scan(&self.app_dir(app), app, active.as_deref(), false)?;
        if include_auto {
            sessions.extend(Self::scan(&self.auto_dir(app), app, None, true)?);
        }
        sessions.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(sessions)
    }

    fn scan(
        dir: &Path,
        app: &str,
        active: Option<&str>,
        auto: bool,
    ) -> Result<Vec<Session>, SessionError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SessionError::io(dir, e)),
        };

        let mut sessions = Vec::new();
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            let name = entry_name(&path);
            if !path.is_dir() || name.starts_with('.') || Session::is_auto_name(&name) != auto {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .map_or_else(|_| Local::now(), DateTime::<Local>::from);
            sessions.push(Session {
                is_active: active == Some(name.as_str()),
                size: dir_size(&path),
                app: app.to_lowercase(),
                name,
                modified,
                is_auto: auto,
            });
        }
        Ok(sessions)
    }

    /// Delete a session, clearing the active marker if it pointed at it.
    pub fn delete(&self, app: &str, name: &str) -> Result<(), SessionError> {
        let path = self.session_path(app, name)?;
        if !path.is_dir() {
            return Err(SessionError::NotFound(name.to_string()));
        }
        if self.active_session(app).as_deref() == Some(name) {
            self.clear_active(app)?;
        }
        remove_entry(&path).map_err(|e| SessionError::io(&path, e))?;
        debug!(app, session = name, "Deleted session");
        Ok(())
    }

    /// Rename a manual session. Moves the active marker along.
    pub fn rename(&self, app: &str, old: &str, new: &str) -> Result<(), SessionError> {
        Self::check_lookup_name(old)?;
        Self::validate_name(new)?;
        let from = self.app_dir(app).join(old);
        let to = self.app_dir(app).join(new);
        if !from.is_dir() {
            return Err(SessionError::NotFound(old.to_string()));
        }
        if to.exists() {
            return Err(SessionError::AlreadyExists(new.to_string()));
        }
        fs::rename(&from, &to).map_err(|e| SessionError::io(&from, e))?;

        if self.active_session(app).as_deref() == Some(old) {
            self.set_active(app, new)?;
        }
        Ok(())
    }

    /// Name of the session last restored for `app`.
    pub fn active_session(&self, app: &str) -> Option<String> {
        let marker = self.app_dir(app).join(ACTIVE_MARKER);
        let name = fs::read_to_string(marker).ok()?;
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_string())
    }

    pub fn set_active(&self, app: &str, name: &str) -> Result<(), SessionError> {
        Self::check_lookup_name(name)?;
        let dir = self.app_dir(app);
        fs::create_dir_all(&dir).map_err(|e| SessionError::io(&dir, e))?;
        let marker = dir.join(ACTIVE_MARKER);
        fs::write(&marker, name).map_err(|e| SessionError::io(&marker, e))
    }

    pub fn clear_active(&self, app: &str) -> Result<(), SessionError> {
        let marker = self.app_dir(app).join(ACTIVE_MARKER);
        match fs::remove_file(&marker) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::io(&marker, e)),
        }
    }

    /// Fresh, timestamped folder path for an automatic backup of `app`.
    pub fn new_auto_backup_path(&self, app: &str) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        self.auto_dir(app)
            .join(format!("{AUTO_SESSION_PREFIX}{stamp}"))
    }

    /// Keep only the newest `keep` automatic backups of `app`.
    pub fn prune_auto_backups(&self, app: &str, keep: usize) -> usize {
        let removed = prune_auto_backups(&self.auto_dir(app), keep);
        if removed > 0 {
            warn!(app, removed, keep, "Pruned old auto-backups");
        }
        removed
    }

    pub fn count_auto_backups(&self, app: &str) -> usize {
        fs::read_dir(self.auto_dir(app)).map_or(0, |entries| {
            entries
                .filter_map(Result::ok)
                .filter(|entry| {
                    entry.path().is_dir()
                        && Session::is_auto_name(&entry.file_name().to_string_lossy())
                })
                .count()
        })
    }
}

/// Human-readable byte count (`"1.5 MB"`).
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    match bytes {
        b if b >= GB => format!("{:.1} GB", b as f64 / GB as f64),
        b if b >= MB => format!("{:.1} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.1} KB", b as f64 / KB as f64),
        b => format!("{b} B"),
    }
}
