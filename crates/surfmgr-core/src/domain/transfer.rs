//! Transfer manifests, progress and results.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::session::BackupMetadata;

/// Reserved archive subfolder holding addon copies.
pub const ADDONS_DIR: &str = "_addons";

/// Metadata file written at the root of a backup archive.
pub const METADATA_FILE: &str = ".backup_meta.json";

/// Declared kind of a manifest entry.
///
/// Informational only: the worker copies whatever is actually on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    #[default]
    #[serde(alias = "directory", alias = "dir")]
    Folder,
    File,
}

/// One unit of a transfer manifest, relative to the source and destination roots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferItem {
    #[serde(rename = "path")]
    pub relative_path: String,
    #[serde(rename = "type", default)]
    pub kind: ItemKind,
    #[serde(default)]
    pub optional: bool,
}

impl TransferItem {
    /// Required folder item.
    pub fn folder(relative_path: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            kind: ItemKind::Folder,
            optional: false,
        }
    }

    /// Required file item.
    pub fn file(relative_path: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            kind: ItemKind::File,
            optional: false,
        }
    }

    /// Mark the item optional: a missing source is skipped silently.
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Which way data flows between the application and the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    /// Application data → archive. Addons are copied into `_addons`.
    Backup,
    /// Archive → application data. The destination is cleared first and
    /// addons are restored to their original absolute paths.
    Restore,
}

impl TransferDirection {
    /// Capitalised label used in progress messages.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Backup => "Backup",
            Self::Restore => "Restore",
        }
    }
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything a transfer worker needs for one operation.
///
/// An empty `items` list means "copy every entry directly under `source_root`".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSpec {
    pub direction: TransferDirection,
    pub source_root: PathBuf,
    pub dest_root: PathBuf,
    pub items: Vec<TransferItem>,
    pub addon_paths: Vec<PathBuf>,
    /// Written as `.backup_meta.json` after a successful backup.
    pub metadata: Option<BackupMetadata>,
}

impl TransferSpec {
    /// Back up `data_root` into the archive folder `archive`.
    pub fn backup(data_root: impl Into<PathBuf>, archive: impl Into<PathBuf>) -> Self {
        Self::new(TransferDirection::Backup, data_root.into(), archive.into())
    }

    /// Restore the archive folder `archive` over `data_root`.
    pub fn restore(archive: impl Into<PathBuf>, data_root: impl Into<PathBuf>) -> Self {
        Self::new(TransferDirection::Restore, archive.into(), data_root.into())
    }

    const fn new(direction: TransferDirection, source_root: PathBuf, dest_root: PathBuf) -> Self {
        Self {
            direction,
            source_root,
            dest_root,
            items: Vec::new(),
            addon_paths: Vec::new(),
            metadata: None,
        }
    }

    /// Set the item manifest.
    #[must_use]
    pub fn with_items(mut self, items: Vec<TransferItem>) -> Self {
        self.items = items;
        self
    }

    /// Set the addon paths (absolute).
    #[must_use]
    pub fn with_addons<I, P>(mut self, addons: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.addon_paths = addons.into_iter().map(Into::into).collect();
        self
    }

    /// Attach archive metadata (backup only).
    #[must_use]
    pub fn with_metadata(mut self, metadata: BackupMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// The archive side of the transfer, whichever direction it runs.
    pub fn archive_root(&self) -> &Path {
        match self.direction {
            TransferDirection::Backup => &self.dest_root,
            TransferDirection::Restore => &self.source_root,
        }
    }
}

/// A progress report. Percent is monotonic within one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferProgress {
    pub percent: u8,
    pub message: String,
}

impl TransferProgress {
    pub fn new(percent: u8, message: impl Into<String>) -> Self {
        Self {
            percent: percent.min(100),
            message: message.into(),
        }
    }
}

/// Terminal status of one operation. Exactly one is produced per operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub success: bool,
    pub message: String,
}

impl TransferResult {
    /// Message carried by a cancelled operation.
    pub const CANCELLED: &'static str = "Cancelled";

    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::failed(Self::CANCELLED)
    }

    pub fn is_cancelled(&self) -> bool {
        !self.success && self.message == Self::CANCELLED
    }
}
