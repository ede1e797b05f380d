//! Application profiles.
//!
//! A profile is a read-only JSON description of one managed application:
//! where its data lives, which executables belong to it, and which items a
//! backup should contain. Profiles are produced elsewhere (the desktop editor
//! writes them); this module only reads them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::domain::{ProcessQuery, TransferItem};

/// Errors while reading profiles.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Failed to read profile {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Invalid profile {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Profile {0} has no app_name")]
    MissingName(PathBuf),

    #[error("No profile named '{0}'")]
    NotFound(String),
}

/// Filesystem locations of an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppPaths {
    /// Candidate data folders, in order of preference.
    pub data_paths: Vec<PathBuf>,
    /// Executables belonging to the application. Their file names are the
    /// process names matched when closing the app.
    pub exe_paths: Vec<PathBuf>,
    pub reset_folder: Option<String>,
}

/// One managed application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppProfile {
    pub app_name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub paths: AppPaths,
    #[serde(default)]
    pub backup_items: Vec<TransferItem>,
    #[serde(default, rename = "addon_backup_paths")]
    pub addon_paths: Vec<PathBuf>,
}

const fn default_active() -> bool {
    true
}

impl AppProfile {
    /// Load a single profile file.
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ProfileError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let profile: Self = serde_json::from_str(&raw).map_err(|e| ProfileError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if profile.app_name.trim().is_empty() {
            return Err(ProfileError::MissingName(path.to_path_buf()));
        }
        Ok(profile)
    }

    /// Load every `*.json` profile in `dir`, sorted by key.
    ///
    /// Unreadable or malformed files are skipped with a warning so that one
    /// broken profile does not hide the others. A missing directory yields
    /// an empty list.
    pub fn load_dir(dir: &Path) -> Result<Vec<Self>, ProfileError> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(dir).map_err(|e| ProfileError::Read {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut profiles: Vec<Self> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
            })
            .filter_map(|path| match Self::load(&path) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping profile");
                    None
                }
            })
            .collect();

        profiles.sort_by_key(Self::key);
        Ok(profiles)
    }

    /// Find a profile by key (case-insensitive app name) in `dir`.
    pub fn find(dir: &Path, app: &str) -> Result<Self, ProfileError> {
        let wanted = app.to_lowercase();
        Self::load_dir(dir)?
            .into_iter()
            .find(|profile| profile.key() == wanted)
            .ok_or_else(|| ProfileError::NotFound(app.to_string()))
    }

    /// Lowercased app name used for archive folders.
    pub fn key(&self) -> String {
        self.app_name.trim().to_lowercase()
    }

    /// Human-facing name.
    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.app_name
        } else {
            &self.display_name
        }
    }

    /// File names of the configured executables.
    pub fn process_names(&self) -> Vec<String> {
        self.paths
            .exe_paths
            .iter()
            .filter_map(|exe| exe.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect()
    }

    /// Query matching this application's processes.
    pub fn process_query(&self) -> ProcessQuery {
        ProcessQuery::new(self.process_names())
    }

    /// Data folder: the first configured path that exists, else the first one.
    pub fn data_root(&self) -> Option<PathBuf> {
        let candidates: Vec<PathBuf> = self
            .paths
            .data_paths
            .iter()
            .map(|path| expand_home(path))
            .collect();
        candidates
            .iter()
            .find(|path| path.exists())
            .or_else(|| candidates.first())
            .cloned()
    }

    /// Addon paths with `~` expanded.
    pub fn addon_paths(&self) -> Vec<PathBuf> {
        self.addon_paths.iter().map(|path| expand_home(path)).collect()
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir().map_or_else(|| path.to_path_buf(), |home| home.join(rest)),
        Err(_) => path.to_path_buf(),
    }
}
