//! Default directory locations.
//!
//! Only defaults live here; every engine takes explicit paths, and the CLI
//! lets flags or settings override each of these.

use std::path::PathBuf;

/// Folder name used under the documents directory for archives.
pub const APP_DIR_NAME: &str = "SurfManager";

/// Environment variable overriding the configuration home.
pub const HOME_ENV: &str = "SURFMGR_HOME";

/// Configuration home: `$SURFMGR_HOME`, else `~/.surfmanager`.
pub fn config_home() -> Option<PathBuf> {
    std::env::var_os(HOME_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".surfmanager")))
}

/// Directory holding application profile JSON files: `<config home>/AppConfigs`.
pub fn default_profiles_dir() -> Option<PathBuf> {
    config_home().map(|home| home.join("AppConfigs"))
}

/// Default settings file: `<config home>/settings.json`.
pub fn default_settings_path() -> Option<PathBuf> {
    config_home().map(|home| home.join("settings.json"))
}

fn documents_root() -> Option<PathBuf> {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .map(|docs| docs.join(APP_DIR_NAME))
}

/// Root of manual session archives: `<Documents>/SurfManager/backup`.
pub fn default_backup_root() -> Option<PathBuf> {
    documents_root().map(|root| root.join("backup"))
}

/// Root of automatic archives: `<Documents>/SurfManager/auto-backups`.
pub fn default_auto_backup_root() -> Option<PathBuf> {
    documents_root().map(|root| root.join("auto-backups"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_roots_share_parent() {
        if let (Some(manual), Some(auto)) = (default_backup_root(), default_auto_backup_root()) {
            assert_eq!(manual.parent(), auto.parent());
            assert!(manual.ends_with("SurfManager/backup"));
        }
    }

    #[test]
    fn config_files_live_under_config_home() {
        if let (Some(home), Some(profiles), Some(settings)) =
            (config_home(), default_profiles_dir(), default_settings_path())
        {
            assert_eq!(profiles.parent(), Some(home.as_path()));
            assert_eq!(settings.parent(), Some(home.as_path()));
        }
    }
}
