//! Backup and restore between an application's data folder and an archive.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use surfmgr_core::{
    ADDONS_DIR, BackupMetadata, METADATA_FILE, OperationEventSink, TransferDirection,
    TransferError, TransferItem, TransferResult, TransferSpec,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::TransferJob;
use super::fsops::{copy_entry, entry_name, remove_entry, sorted_entries};
use super::progress::{ProgressReporter, phase_percent};

const ITEMS_START: u8 = 30;
const ITEMS_SPAN: u8 = 50;
const ADDONS_START: u8 = 80;
const ADDONS_SPAN: u8 = 15;
const CLEAR_START: u8 = 10;
const CLEAR_SPAN: u8 = 20;

/// Archive entries that are not application data.
fn is_reserved(name: &str) -> bool {
    name == ADDONS_DIR || name == METADATA_FILE
}

/// True when `relative` stays below whatever root it is joined to.
fn is_contained(relative: &str) -> bool {
    Path::new(relative)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Copies a `TransferSpec` in one direction.
#[derive(Debug, Clone)]
pub struct TransferWorker {
    spec: TransferSpec,
}

impl TransferWorker {
    pub const fn new(spec: TransferSpec) -> Self {
        Self { spec }
    }

    pub const fn spec(&self) -> &TransferSpec {
        &self.spec
    }

    /// Run the transfer, converting every failure into a `TransferResult`.
    pub fn execute(&self, cancel: &CancellationToken, sink: &dyn OperationEventSink) -> TransferResult {
        let mut progress = ProgressReporter::new(sink);
        let direction = self.spec.direction;
        let outcome = match direction {
            TransferDirection::Backup => self.backup(cancel, &mut progress),
            TransferDirection::Restore => self.restore(cancel, &mut progress),
        };

        match outcome {
            Ok(message) => {
                info!(direction = %direction, dest = %self.spec.dest_root.display(), "Transfer complete");
                TransferResult::ok(message)
            }
            Err(TransferError::Cancelled) => {
                info!(direction = %direction, percent = progress.percent(), "Transfer cancelled");
                TransferResult::cancelled()
            }
            Err(e) => {
                warn!(direction = %direction, error = %e, "Transfer failed");
                TransferResult::failed(e.to_string())
            }
        }
    }

    fn backup(&self, cancel: &CancellationToken, progress: &mut ProgressReporter<'_>) -> Result<String, TransferError> {
        let spec = &self.spec;
        fs::create_dir_all(&spec.dest_root).map_err(|e| TransferError::io(&spec.dest_root, &e))?;
        progress.report(10, "Starting backup...");

        if spec.items.is_empty() {
            let entries = sorted_entries(&spec.source_root)
                .map_err(|e| TransferError::io(&spec.source_root, &e))?;
            self.copy_entries(&entries, "Copying", cancel, progress)?;
        } else {
            self.copy_items(&spec.items, "Copying", cancel, progress)?;
        }

        if !spec.addon_paths.is_empty() {
            self.backup_addons(cancel, progress)?;
        }

        if let Some(metadata) = &spec.metadata {
            if let Err(e) = write_metadata(&spec.dest_root, metadata) {
                warn!(error = %e, "Could not write backup metadata");
                progress.log(format!("[WARN] Could not write backup metadata: {e}"));
            }
        }

        progress.report(100, "Backup complete!");
        Ok("Backup complete".to_string())
    }

    fn restore(&self, cancel: &CancellationToken, progress: &mut ProgressReporter<'_>) -> Result<String, TransferError> {
        let spec = &self.spec;
        if !spec.source_root.is_dir() {
            return Err(TransferError::Io {
                path: spec.source_root.clone(),
                kind: io::ErrorKind::NotFound,
                message: "Backup not found".to_string(),
            });
        }

        let entries: Vec<PathBuf> = sorted_entries(&spec.source_root)
            .map_err(|e| TransferError::io(&spec.source_root, &e))?
            .into_iter()
            .filter(|path| !is_reserved(&entry_name(path)))
            .collect();

        // An archive holding only addons must not wipe the data folder.
        if entries.is_empty() {
            progress.report(50, "No main data to restore, processing addons...");
        } else {
            progress.report(CLEAR_START, "Removing existing data...");
            self.clear_destination(cancel, progress)?;
            progress.report(ITEMS_START, "Restoring data...");

            if spec.items.is_empty() {
                self.copy_entries(&entries, "Restoring", cancel, progress)?;
            } else {
                self.copy_items(&spec.items, "Restoring", cancel, progress)?;
            }
        }

        if !spec.addon_paths.is_empty() {
            self.restore_addons(cancel, progress)?;
        }

        progress.report(100, "Restore complete!");
        Ok("Restore complete".to_string())
    }

    /// Declared items, in order. Missing items are logged and skipped.
    fn copy_items(
        &self,
        items: &[TransferItem],
        verb: &str,
        cancel: &CancellationToken,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<(), TransferError> {
        let total = items.len();
        for (index, item) in items.iter().enumerate() {
            check_cancel(cancel)?;
            let relative = item.relative_path.trim();
            if relative.is_empty() {
                continue;
            }
            if !is_contained(relative) {
                warn!(path = relative, "Skipping item outside the data folder");
                progress.log(format!("[SKIP] {relative} (invalid path)"));
                continue;
            }

            let src = self.spec.source_root.join(relative);
            let dst = self.spec.dest_root.join(relative);
            if src.exists() {
                copy_entry(&src, &dst).map_err(|e| TransferError::io(&src, &e))?;
                progress.log(format!("[OK] {relative}"));
            } else if !item.optional {
                progress.log(format!("[SKIP] {relative} (not found)"));
            }

            progress.report(
                phase_percent(ITEMS_START, ITEMS_SPAN, index + 1, total),
                format!("{verb} {relative}..."),
            );
        }
        Ok(())
    }

    /// Whole entries of the source root, used when no manifest is given.
    fn copy_entries(
        &self,
        entries: &[PathBuf],
        verb: &str,
        cancel: &CancellationToken,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<(), TransferError> {
        let total = entries.len();
        for (index, src) in entries.iter().enumerate() {
            check_cancel(cancel)?;
            let name = entry_name(src);
            let dst = self.spec.dest_root.join(&name);
            copy_entry(src, &dst).map_err(|e| TransferError::io(src, &e))?;
            progress.log(format!("[OK] {name}"));
            progress.report(
                phase_percent(ITEMS_START, ITEMS_SPAN, index + 1, total),
                format!("{verb} {name}..."),
            );
        }
        Ok(())
    }

    /// Empty the restore destination, keeping any `_addons` folder.
    fn clear_destination(&self, cancel: &CancellationToken, progress: &mut ProgressReporter<'_>) -> Result<(), TransferError> {
        let dest = &self.spec.dest_root;
        if !dest.exists() {
            return fs::create_dir_all(dest).map_err(|e| TransferError::io(dest, &e));
        }

        let entries: Vec<PathBuf> = sorted_entries(dest)
            .map_err(|e| TransferError::io(dest, &e))?
            .into_iter()
            .filter(|path| entry_name(path) != ADDONS_DIR)
            .collect();

        let total = entries.len();
        for (index, path) in entries.iter().enumerate() {
            check_cancel(cancel)?;
            let name = entry_name(path);
            match remove_entry(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                    progress.log(format!("[WARN] Cannot delete: {name}"));
                }
                Err(e) => return Err(TransferError::io(path, &e)),
            }
            progress.report(
                phase_percent(CLEAR_START, CLEAR_SPAN, index + 1, total),
                "Removing existing data...",
            );
        }
        Ok(())
    }

    fn backup_addons(&self, cancel: &CancellationToken, progress: &mut ProgressReporter<'_>) -> Result<(), TransferError> {
        let addon_dir = self.spec.dest_root.join(ADDONS_DIR);
        fs::create_dir_all(&addon_dir).map_err(|e| TransferError::io(&addon_dir, &e))?;

        let total = self.spec.addon_paths.len();
        for (index, addon) in self.spec.addon_paths.iter().enumerate() {
            check_cancel(cancel)?;
            let name = entry_name(addon);
            if addon.exists() {
                match copy_entry(addon, &addon_dir.join(&name)) {
                    Ok(()) => progress.log(format!("[OK] Addon: {name}")),
                    Err(e) => progress.log(format!("[FAIL] Addon: {name} - {e}")),
                }
            } else {
                progress.log(format!("[SKIP] Addon: {name} (not found)"));
            }
            progress.report(
                phase_percent(ADDONS_START, ADDONS_SPAN, index + 1, total),
                format!("Addon: {name}..."),
            );
        }
        Ok(())
    }

    fn restore_addons(&self, cancel: &CancellationToken, progress: &mut ProgressReporter<'_>) -> Result<(), TransferError> {
        let addon_dir = self.spec.source_root.join(ADDONS_DIR);
        if !addon_dir.is_dir() {
            return Ok(());
        }

        let total = self.spec.addon_paths.len();
        for (index, target) in self.spec.addon_paths.iter().enumerate() {
            check_cancel(cancel)?;
            let name = entry_name(target);
            let archived = addon_dir.join(&name);
            if archived.exists() {
                restore_addon(&archived, target, &name, progress);
            }
            progress.report(
                phase_percent(ADDONS_START, ADDONS_SPAN, index + 1, total),
                format!("Addon: {name}..."),
            );
        }
        Ok(())
    }
}

/// Replace `target` with the archived copy. A target that cannot be removed
/// is left alone so no stale files get mixed into the restored copy.
fn restore_addon(archived: &Path, target: &Path, name: &str, progress: &ProgressReporter<'_>) {
    if target.exists() {
        if let Err(e) = remove_entry(target) {
            warn!(target = %target.display(), error = %e, "Could not remove addon folder");
            progress.log(format!("[FAIL] Addon: {name} - {e}"));
            return;
        }
    }
    match copy_entry(archived, target) {
        Ok(()) => progress.log(format!("[OK] Addon restored: {name}")),
        Err(e) => progress.log(format!("[FAIL] Addon: {name} - {e}")),
    }
}

fn write_metadata(archive: &Path, metadata: &BackupMetadata) -> io::Result<()> {
    let json = serde_json::to_vec_pretty(metadata).map_err(io::Error::other)?;
    fs::write(archive.join(METADATA_FILE), json)
}

pub(super) fn check_cancel(cancel: &CancellationToken) -> Result<(), TransferError> {
    if cancel.is_cancelled() {
        Err(TransferError::Cancelled)
    } else {
        Ok(())
    }
}

impl TransferJob for TransferWorker {
    fn label(&self) -> String {
        self.spec.direction.label().to_lowercase()
    }

    fn run(self, cancel: &CancellationToken, sink: &dyn OperationEventSink) -> TransferResult {
        self.execute(cancel, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surfmgr_core::CollectingSink;

    fn write(root: &Path, relative: &str, body: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn missing_required_item_is_skipped_not_fatal() {
        let data = tempfile::tempdir().unwrap();
        let archive = tempfile::tempdir().unwrap();
        let spec = TransferSpec::backup(data.path(), archive.path())
            .with_items(vec![TransferItem::folder("User")]);
        let sink = CollectingSink::new();

        let result = TransferWorker::new(spec).execute(&CancellationToken::new(), &sink);

        assert!(result.success);
        assert!(sink.logs().contains(&"[SKIP] User (not found)".to_string()));
    }

    #[test]
    fn missing_optional_item_is_silent() {
        let data = tempfile::tempdir().unwrap();
        let archive = tempfile::tempdir().unwrap();
        let spec = TransferSpec::backup(data.path(), archive.path())
            .with_items(vec![TransferItem::file("machineid").optional()]);
        let sink = CollectingSink::new();

        let result = TransferWorker::new(spec).execute(&CancellationToken::new(), &sink);
        assert!(result.success);
        assert!(sink.logs().is_empty());
    }

    #[test]
    fn backup_copies_items_and_reports_progress() {
        let data = tempfile::tempdir().unwrap();
        let archive = tempfile::tempdir().unwrap();
        write(data.path(), "User/settings.json", "{}");
        write(data.path(), "machineid", "abc");
        write(data.path(), "Cache/blob", "ignored");
        let spec = TransferSpec::backup(data.path(), archive.path()).with_items(vec![
            TransferItem::folder("User"),
            TransferItem::file("machineid"),
        ]);
        let sink = CollectingSink::new();

        let result = TransferWorker::new(spec).execute(&CancellationToken::new(), &sink);

        assert_eq!(result, TransferResult::ok("Backup complete"));
        assert!(archive.path().join("User/settings.json").exists());
        assert!(archive.path().join("machineid").exists());
        assert!(!archive.path().join("Cache").exists());
        assert_eq!(sink.percents(), vec![10, 55, 80, 100]);
    }

    #[test]
    fn backup_without_manifest_copies_everything() {
        let data = tempfile::tempdir().unwrap();
        let archive = tempfile::tempdir().unwrap();
        write(data.path(), "a.txt", "a");
        write(data.path(), "dir/b.txt", "b");
        let spec = TransferSpec::backup(data.path(), archive.path());
        let sink = CollectingSink::new();

        let result = TransferWorker::new(spec).execute(&CancellationToken::new(), &sink);

        assert!(result.success);
        assert!(archive.path().join("a.txt").exists());
        assert!(archive.path().join("dir/b.txt").exists());
        assert_eq!(sink.logs(), vec!["[OK] a.txt", "[OK] dir"]);
    }

    #[test]
    fn backup_of_missing_source_without_manifest_fails() {
        let archive = tempfile::tempdir().unwrap();
        let spec = TransferSpec::backup("/definitely/not/here", archive.path());
        let result = TransferWorker::new(spec).execute(&CancellationToken::new(), &CollectingSink::new());
        assert!(!result.success);
        assert!(result.message.contains("/definitely/not/here"));
    }

    #[test]
    fn addons_and_metadata_land_in_archive() {
        let data = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        let archive = tempfile::tempdir().unwrap();
        write(data.path(), "a.txt", "a");
        write(home.path(), ".aws/credentials", "secret");
        let spec = TransferSpec::backup(data.path(), archive.path())
            .with_addons([home.path().join(".aws"), home.path().join(".missing")])
            .with_metadata(BackupMetadata::now("code", "work"));
        let sink = CollectingSink::new();

        let result = TransferWorker::new(spec).execute(&CancellationToken::new(), &sink);

        assert!(result.success);
        assert!(archive.path().join("_addons/.aws/credentials").exists());
        let logs = sink.logs();
        assert!(logs.contains(&"[OK] Addon: .aws".to_string()));
        assert!(logs.contains(&"[SKIP] Addon: .missing (not found)".to_string()));

        let meta: BackupMetadata =
            serde_json::from_slice(&fs::read(archive.path().join(METADATA_FILE)).unwrap()).unwrap();
        assert_eq!(meta.session, "work");
    }

    #[test]
    fn restore_replaces_data_but_keeps_addon_folder() {
        let archive = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        write(archive.path(), "User/settings.json", "restored");
        write(archive.path(), METADATA_FILE, "{}");
        write(data.path(), "User/settings.json", "current");
        write(data.path(), "stale.txt", "stale");
        write(data.path(), "_addons/keep", "keep");
        let spec = TransferSpec::restore(archive.path(), data.path());
        let sink = CollectingSink::new();

        let result = TransferWorker::new(spec).execute(&CancellationToken::new(), &sink);

        assert_eq!(result, TransferResult::ok("Restore complete"));
        assert_eq!(
            fs::read_to_string(data.path().join("User/settings.json")).unwrap(),
            "restored"
        );
        assert!(!data.path().join("stale.txt").exists());
        assert!(data.path().join("_addons/keep").exists());
        assert!(!data.path().join(METADATA_FILE).exists());
    }

    #[test]
    fn addon_only_archive_leaves_data_untouched() {
        let archive = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        write(archive.path(), "_addons/.aws/credentials", "archived");
        write(data.path(), "precious.txt", "keep me");
        write(home.path(), ".aws/credentials", "current");
        write(home.path(), ".aws/extra", "gone after restore");
        let spec = TransferSpec::restore(archive.path(), data.path())
            .with_addons([home.path().join(".aws")]);
        let sink = CollectingSink::new();

        let result = TransferWorker::new(spec).execute(&CancellationToken::new(), &sink);

        assert!(result.success);
        assert!(data.path().join("precious.txt").exists());
        assert_eq!(
            fs::read_to_string(home.path().join(".aws/credentials")).unwrap(),
            "archived"
        );
        assert!(!home.path().join(".aws/extra").exists());
        assert!(sink.logs().contains(&"[OK] Addon restored: .aws".to_string()));
        assert_eq!(sink.percents().first(), Some(&50));
    }

    #[test]
    fn dot_entries_survive_backup_and_restore() {
        let data = tempfile::tempdir().unwrap();
        let archive = tempfile::tempdir().unwrap();
        write(data.path(), ".config.json", "{\"theme\":\"dark\"}");
        write(data.path(), "a.txt", "a");
        let backup = TransferWorker::new(TransferSpec::backup(data.path(), archive.path()))
            .execute(&CancellationToken::new(), &CollectingSink::new());
        assert!(backup.success);
        assert!(archive.path().join(".config.json").exists());

        fs::remove_file(data.path().join(".config.json")).unwrap();
        write(data.path(), "a.txt", "changed");
        let sink = CollectingSink::new();
        let restore = TransferWorker::new(TransferSpec::restore(archive.path(), data.path()))
            .execute(&CancellationToken::new(), &sink);

        assert_eq!(restore, TransferResult::ok("Restore complete"));
        assert_eq!(
            fs::read_to_string(data.path().join(".config.json")).unwrap(),
            "{\"theme\":\"dark\"}"
        );
        assert_eq!(fs::read_to_string(data.path().join("a.txt")).unwrap(), "a");
        assert!(sink.logs().contains(&"[OK] .config.json".to_string()));
    }

    #[test]
    fn items_escaping_the_roots_are_skipped() {
        let outside = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let archive = tempfile::tempdir().unwrap();
        write(outside.path(), "secret.txt", "s");
        write(data.path(), "User/settings.json", "{}");
        let absolute = outside.path().join("secret.txt").display().to_string();
        let spec = TransferSpec::backup(data.path(), archive.path()).with_items(vec![
            TransferItem::file(absolute.clone()),
            TransferItem::file("../secret.txt"),
            TransferItem::folder("User"),
        ]);
        let sink = CollectingSink::new();

        let result = TransferWorker::new(spec).execute(&CancellationToken::new(), &sink);

        assert!(result.success);
        assert!(archive.path().join("User/settings.json").exists());
        assert!(!archive.path().join("secret.txt").exists());
        assert!(!archive.path().parent().unwrap().join("secret.txt").exists());
        let logs = sink.logs();
        assert!(logs.contains(&format!("[SKIP] {absolute} (invalid path)")));
        assert!(logs.contains(&"[SKIP] ../secret.txt (invalid path)".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn addon_that_cannot_be_cleared_is_not_merged() {
        use std::os::unix::fs::PermissionsExt;

        let archive = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        write(archive.path(), "_addons/.ext/new.txt", "archived");
        write(home.path(), ".ext/locked/old.txt", "stale");
        let locked = home.path().join(".ext/locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();
        // Privileged users ignore directory permissions.
        if fs::write(locked.join("canary"), "").is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let spec = TransferSpec::restore(archive.path(), data.path())
            .with_addons([home.path().join(".ext")]);
        let sink = CollectingSink::new();
        let result = TransferWorker::new(spec).execute(&CancellationToken::new(), &sink);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(result.success);
        let logs = sink.logs();
        assert!(logs.iter().any(|l| l.starts_with("[FAIL] Addon: .ext - ")), "{logs:?}");
        assert!(!logs.contains(&"[OK] Addon restored: .ext".to_string()));
        assert!(!home.path().join(".ext/new.txt").exists());
        assert!(home.path().join(".ext/locked/old.txt").exists());
    }

    #[test]
    fn restore_of_missing_archive_fails() {
        let data = tempfile::tempdir().unwrap();
        let spec = TransferSpec::restore(data.path().join("nope"), data.path());
        let result = TransferWorker::new(spec).execute(&CancellationToken::new(), &CollectingSink::new());
        assert!(!result.success);
        assert!(result.message.starts_with("Backup not found"));
    }

    #[test]
    fn cancelled_token_stops_before_first_item() {
        let data = tempfile::tempdir().unwrap();
        let archive = tempfile::tempdir().unwrap();
        write(data.path(), "a.txt", "a");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = TransferWorker::new(TransferSpec::backup(data.path(), archive.path()))
            .execute(&cancel, &CollectingSink::new());

        assert!(result.is_cancelled());
        assert!(!archive.path().join("a.txt").exists());
    }
}
