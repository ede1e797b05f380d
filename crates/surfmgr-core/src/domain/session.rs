//! Session archive descriptors.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Name prefix that marks an automatic (pre-reset) backup.
pub const AUTO_SESSION_PREFIX: &str = "auto-";

/// A stored backup session as listed to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub name: String,
    pub app: String,
    /// Total size of all files in bytes.
    pub size: u64,
    pub modified: DateTime<Local>,
    pub is_active: bool,
    pub is_auto: bool,
}

impl Session {
    /// Whether a session name denotes an automatic backup.
    pub fn is_auto_name(name: &str) -> bool {
        name.starts_with(AUTO_SESSION_PREFIX)
    }
}

/// Contents of `.backup_meta.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupMetadata {
    pub app: String,
    pub session: String,
    pub created: DateTime<Utc>,
}

impl BackupMetadata {
    /// Metadata stamped with the current time.
    pub fn now(app: impl Into<String>, session: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            session: session.into(),
            created: Utc::now(),
        }
    }
}
