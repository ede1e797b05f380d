//! Account switch: restore only the sign-in state of a session.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use surfmgr_core::{OperationEventSink, TransferError, TransferResult};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::TransferJob;
use super::progress::ProgressReporter;
use super::worker::check_cancel;

/// Database holding the signed-in account, relative to the data root.
pub const AUTH_STATE_FILE: &str = "User/globalStorage/state.vscdb";

/// Copies `AUTH_STATE_FILE` from an archive over the live data folder and
/// leaves everything else alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRestoreWorker {
    archive: PathBuf,
    data_root: PathBuf,
}

impl AccountRestoreWorker {
    pub fn new(archive: impl Into<PathBuf>, data_root: impl Into<PathBuf>) -> Self {
        Self {
            archive: archive.into(),
            data_root: data_root.into(),
        }
    }

    pub fn execute(&self, cancel: &CancellationToken, sink: &dyn OperationEventSink) -> TransferResult {
        let mut progress = ProgressReporter::new(sink);
        match self.switch(cancel, &mut progress) {
            Ok(()) => {
                info!(archive = %self.archive.display(), "Account switched");
                TransferResult::ok("Account switched")
            }
            Err(TransferError::Cancelled) => TransferResult::cancelled(),
            Err(e) => {
                warn!(archive = %self.archive.display(), error = %e, "Account switch failed");
                TransferResult::failed(e.to_string())
            }
        }
    }

    fn switch(&self, cancel: &CancellationToken, progress: &mut ProgressReporter<'_>) -> Result<(), TransferError> {
        if !self.archive.is_dir() {
            return Err(not_found(&self.archive, "Backup not found"));
        }
        let src = self.archive.join(AUTH_STATE_FILE);
        if !src.is_file() {
            return Err(not_found(&src, "Auth state file not found in backup"));
        }
        check_cancel(cancel)?;

        let dst = self.data_root.join(AUTH_STATE_FILE);
        progress.report(30, "Removing existing auth state...");
        match fs::remove_file(&dst) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(TransferError::io(&dst, &e)),
        }
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).map_err(|e| TransferError::io(parent, &e))?;
        }

        progress.report(60, "Copying auth state...");
        fs::copy(&src, &dst).map_err(|e| TransferError::io(&src, &e))?;
        progress.log(format!("[OK] {AUTH_STATE_FILE}"));
        progress.report(100, "Account switched!");
        Ok(())
    }
}

fn not_found(path: &Path, message: &str) -> TransferError {
    TransferError::Io {
        path: path.to_path_buf(),
        kind: io::ErrorKind::NotFound,
        message: message.to_string(),
    }
}

impl TransferJob for AccountRestoreWorker {
    fn label(&self) -> String {
        "account switch".to_string()
    }

    fn run(self, cancel: &CancellationToken, sink: &dyn OperationEventSink) -> TransferResult {
        self.execute(cancel, sink)
    }
}
