//! Backup, restore and reset driven through the coordinator.

use std::fs;
use std::path::Path;

use surfmgr_core::{OperationEvent, TransferItem, TransferResult, TransferSpec};
use surfmgr_runtime::{
    AutoBackupPlan, ResetSpec, ResetWorker, SessionStore, TransferJob, TransferWorker,
    WorkerCoordinator,
};
use tokio_test::assert_ok;
use tokio_util::sync::CancellationToken;

fn write(root: &Path, relative: &str, body: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn logs(events: &[OperationEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            OperationEvent::Log { line } => Some(line.clone()),
            _ => None,
        })
        .collect()
}

fn percents(events: &[OperationEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|event| match event {
            OperationEvent::Progress(progress) => Some(progress.percent),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn missing_required_folder_is_skipped() {
    let data = tempfile::tempdir().unwrap();
    let archive = tempfile::tempdir().unwrap();
    let spec = TransferSpec::backup(data.path(), archive.path())
        .with_items(vec![TransferItem::folder("User")]);

    let mut coordinator = WorkerCoordinator::new();
    let mut events = Vec::new();
    let result = coordinator
        .run_to_completion(TransferWorker::new(spec), |e| events.push(e.clone()))
        .await;

    assert!(result.success);
    assert!(logs(&events).contains(&"[SKIP] User (not found)".to_string()));
    assert!(events.last().unwrap().is_finished());
}

#[tokio::test]
async fn backup_then_restore_round_trips_data_and_addons() {
    let data = tempfile::tempdir().unwrap();
    let home = tempfile::tempdir().unwrap();
    let roots = tempfile::tempdir().unwrap();
    let store = SessionStore::new(roots.path().join("backup"), roots.path().join("auto"));
    write(data.path(), "User/settings.json", "original");
    write(data.path(), "machineid", "id-1");
    write(home.path(), ".ext/plugin.js", "plugin");

    let archive = store.session_path("code", "work").unwrap();
    let items = vec![
        TransferItem::folder("User"),
        TransferItem::file("machineid"),
        TransferItem::file("optional.db").optional(),
    ];
    let addons = [home.path().join(".ext")];
    let mut coordinator = WorkerCoordinator::new();

    let mut backup_events = Vec::new();
    let backup = TransferSpec::backup(data.path(), &archive)
        .with_items(items.clone())
        .with_addons(addons.clone());
    let result = coordinator
        .run_to_completion(TransferWorker::new(backup), |e| backup_events.push(e.clone()))
        .await;
    assert_eq!(result, TransferResult::ok("Backup complete"));
    assert_eq!(percents(&backup_events).last(), Some(&100));

    write(data.path(), "User/settings.json", "changed");
    write(data.path(), "junk.tmp", "junk");
    fs::remove_dir_all(home.path().join(".ext")).unwrap();

    let mut restore_events = Vec::new();
    let restore = TransferSpec::restore(&archive, data.path()).with_addons(addons);
    let result = coordinator
        .run_to_completion(TransferWorker::new(restore), |e| restore_events.push(e.clone()))
        .await;
    assert_eq!(result, TransferResult::ok("Restore complete"));
    assert_ok!(store.set_active("code", "work"));

    assert_eq!(
        fs::read_to_string(data.path().join("User/settings.json")).unwrap(),
        "original"
    );
    assert!(!data.path().join("junk.tmp").exists());
    assert!(home.path().join(".ext/plugin.js").exists());
    assert_eq!(store.active_session("code").as_deref(), Some("work"));

    for events in [&backup_events, &restore_events] {
        let p = percents(events);
        assert!(p.windows(2).all(|w| w[0] <= w[1]), "{p:?}");
        assert_eq!(p.last(), Some(&100));
        assert_eq!(events.iter().filter(|e| e.is_finished()).count(), 1);
    }
}

/// Wraps a worker and cancels its own token after the first copied item.
struct CancelAfterFirstItem(TransferWorker);

impl TransferJob for CancelAfterFirstItem {
    fn label(&self) -> String {
        "cancel-after-first".to_string()
    }

    fn run(
        self,
        cancel: &CancellationToken,
        sink: &dyn surfmgr_core::OperationEventSink,
    ) -> TransferResult {
        let trigger = cancel.clone();
        let tripwire = move |event: OperationEvent| {
            if matches!(&event, OperationEvent::Log { line } if line.starts_with("[OK]")) {
                trigger.cancel();
            }
            sink.emit(event);
        };
        self.0.execute(cancel, &tripwire)
    }
}

#[tokio::test]
async fn cancellation_stops_before_the_next_item() {
    let data = tempfile::tempdir().unwrap();
    let archive = tempfile::tempdir().unwrap();
    for name in ["a", "b", "c"] {
        write(data.path(), &format!("{name}/file"), name);
    }
    let spec = TransferSpec::backup(data.path(), archive.path());

    let mut coordinator = WorkerCoordinator::new();
    let mut events = Vec::new();
    let result = coordinator
        .run_to_completion(CancelAfterFirstItem(TransferWorker::new(spec)), |e| {
            events.push(e.clone());
        })
        .await;

    assert_eq!(result, TransferResult::cancelled());
    assert!(archive.path().join("a/file").exists());
    assert!(!archive.path().join("b").exists());
    assert!(!archive.path().join("c").exists());
    assert!(events.last().unwrap().is_finished());
}

#[tokio::test]
async fn reset_keeps_a_pruned_auto_backup() {
    let data = tempfile::tempdir().unwrap();
    let roots = tempfile::tempdir().unwrap();
    let store = SessionStore::new(roots.path().join("backup"), roots.path().join("auto"));
    write(data.path(), "state.db", "state");
    for stamp in ["20200101_000000", "20200102_000000"] {
        fs::create_dir_all(store.session_path("code", &format!("auto-{stamp}")).unwrap()).unwrap();
    }

    let dest = store.new_auto_backup_path("code");
    let worker = ResetWorker::new(ResetSpec {
        data_root: data.path().to_path_buf(),
        addon_paths: Vec::new(),
        auto_backup: Some(AutoBackupPlan {
            dest: dest.clone(),
            keep: 2,
        }),
    });

    let mut coordinator = WorkerCoordinator::new();
    let result = coordinator.run_to_completion(worker, |_| {}).await;

    assert!(result.success, "{}", result.message);
    assert!(dest.join("state.db").exists());
    assert!(!data.path().join("state.db").exists());
    assert_eq!(store.count_auto_backups("code"), 2);
    assert!(!store.exists("code", "auto-20200101_000000").unwrap());
}
