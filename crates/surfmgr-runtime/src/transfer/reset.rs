//! Reset an application to a clean state.

use std::fs;
use std::path::{Path, PathBuf};

use surfmgr_core::{
    AUTO_SESSION_PREFIX, OperationEventSink, TransferError, TransferResult, TransferSpec,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::TransferJob;
use super::fsops::{entry_name, remove_entry};
use super::progress::{ProgressReporter, ScaledSink};
use super::worker::TransferWorker;

/// Where to put the safety backup taken before a reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoBackupPlan {
    /// Archive folder, usually `<auto_root>/<app>/auto-YYYYMMDD_HHMMSS`.
    pub dest: PathBuf,
    /// Automatic backups kept in `dest`'s parent afterwards.
    pub keep: usize,
}

/// What a reset touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetSpec {
    pub data_root: PathBuf,
    pub addon_paths: Vec<PathBuf>,
    pub auto_backup: Option<AutoBackupPlan>,
}

/// Deletes an application's data folder and addon folders, optionally
/// backing them up first.
#[derive(Debug, Clone)]
pub struct ResetWorker {
    spec: ResetSpec,
}

impl ResetWorker {
    pub const fn new(spec: ResetSpec) -> Self {
        Self { spec }
    }

    pub fn execute(&self, cancel: &CancellationToken, sink: &dyn OperationEventSink) -> TransferResult {
        match self.reset(cancel, sink) {
            Ok(()) => TransferResult::ok("Reset complete"),
            Err(TransferError::Cancelled) => TransferResult::cancelled(),
            Err(e) => {
                warn!(data_root = %self.spec.data_root.display(), error = %e, "Reset failed");
                TransferResult::failed(e.to_string())
            }
        }
    }

    fn reset(&self, cancel: &CancellationToken, sink: &dyn OperationEventSink) -> Result<(), TransferError> {
        let spec = &self.spec;

        if let Some(plan) = &spec.auto_backup {
            let mut progress = ProgressReporter::new(sink);
            progress.report(20, "Creating auto-backup...");
            self.auto_backup(plan, cancel, sink, &progress)?;
        }

        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }

        let mut progress = ProgressReporter::new(sink);
        progress.report(50, format!("Deleting {} data...", entry_name(&spec.data_root)));
        if spec.data_root.exists() {
            remove_entry(&spec.data_root).map_err(|e| TransferError::io(&spec.data_root, &e))?;
        }
        fs::create_dir_all(&spec.data_root).map_err(|e| TransferError::io(&spec.data_root, &e))?;
        progress.log(format!("[OK] Deleted {}", spec.data_root.display()));

        if !spec.addon_paths.is_empty() {
            progress.report(80, "Deleting additional folders...");
            for addon in spec.addon_paths.iter().filter(|p| p.exists()) {
                if let Err(e) = remove_entry(addon) {
                    progress.log(format!(
                        "[Reset] Failed to delete addon folder {}: {e}",
                        addon.display()
                    ));
                }
            }
        }

        progress.report(100, "Reset complete!");
        info!(data_root = %spec.data_root.display(), "Reset complete");
        Ok(())
    }

    /// Back up the whole data folder and addons. Failure is logged, not fatal,
    /// except for cancellation.
    fn auto_backup(
        &self,
        plan: &AutoBackupPlan,
        cancel: &CancellationToken,
        sink: &dyn OperationEventSink,
        progress: &ProgressReporter<'_>,
    ) -> Result<(), TransferError> {
        let spec = TransferSpec::backup(&self.spec.data_root, &plan.dest)
            .with_addons(self.spec.addon_paths.clone());
        let nested = ScaledSink::new(sink, 20, 5);
        let result = TransferWorker::new(spec).execute(cancel, &nested);

        if result.is_cancelled() {
            return Err(TransferError::Cancelled);
        }
        if result.success {
            if let Some(parent) = plan.dest.parent() {
                prune_auto_backups(parent, plan.keep);
            }
        } else {
            progress.log(format!("[AutoBackup] Failed: {}", result.message));
        }
        Ok(())
    }
}

impl TransferJob for ResetWorker {
    fn label(&self) -> String {
        "reset".to_string()
    }

    fn run(self, cancel: &CancellationToken, sink: &dyn OperationEventSink) -> TransferResult {
        self.execute(cancel, sink)
    }
}

/// Delete the oldest `auto-*` folders in `dir`, keeping the newest `keep`.
///
/// Names embed a sortable timestamp, so name order is age order. Returns the
/// number of folders removed.
pub fn prune_auto_backups(dir: &Path, keep: usize) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    let mut autos: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir() && entry_name(path).starts_with(AUTO_SESSION_PREFIX))
        .collect();
    if autos.len() <= keep {
        return 0;
    }

    autos.sort();
    let excess = autos.len() - keep;
    autos
        .iter()
        .take(excess)
        .filter(|path| match remove_entry(path) {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not prune auto-backup");
                false
            }
        })
        .count()
}
