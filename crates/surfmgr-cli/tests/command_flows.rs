//! Handlers driven end to end against a fake process table and temp folders.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use surfmgr_cli::handlers;
use surfmgr_cli::{CliConfig, CliContext, CliError, SessionsCommand, TargetArgs, bootstrap_with};
use surfmgr_core::NoopSink;
use surfmgr_core::testing::{FakeBehaviour, FakeProcessTable};
use surfmgr_runtime::AUTH_STATE_FILE;
use tempfile::TempDir;
use tokio_test::assert_ok;

const FAST_SETTINGS: &str = r#"{
    "close_timeout": "200ms",
    "kill_timeout": "200ms",
    "force_kill_grace": "100ms",
    "kill_settle": "0s",
    "idle_settle": "0s",
    "file_release_wait": "0s",
    "retry_delay": "10ms",
    "max_retries": 2,
    "auto_backup_keep": 2
}"#;

struct Fixture {
    dir: TempDir,
    table: Arc<FakeProcessTable>,
    ctx: CliContext,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        write(&data, "User/settings.json", "{\"theme\":\"dark\"}");
        write(&data, "state.db", "v1");

        let profiles = dir.path().join("profiles");
        fs::create_dir_all(&profiles).unwrap();
        let profile = serde_json::json!({
            "app_name": "Cursor",
            "display_name": "Cursor Editor",
            "paths": {
                "data_paths": [data],
                "exe_paths": ["/opt/cursor/Cursor.exe"]
            }
        });
        fs::write(profiles.join("cursor.json"), profile.to_string()).unwrap();

        let settings = dir.path().join("settings.json");
        fs::write(&settings, FAST_SETTINGS).unwrap();

        let config = CliConfig {
            settings_path: Some(settings),
            profiles_dir: Some(profiles),
            backup_root: Some(dir.path().join("backup")),
            auto_root: Some(dir.path().join("auto")),
        };
        let table = Arc::new(FakeProcessTable::new());
        let ctx = bootstrap_with(config, table.clone(), Arc::new(NoopSink)).unwrap();
        Self { dir, table, ctx }
    }

    fn data(&self) -> PathBuf {
        self.dir.path().join("data")
    }
}

fn write(root: &Path, relative: &str, body: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<CliError>().map_or(1, CliError::exit_code)
}

#[tokio::test]
async fn backup_closes_the_app_and_restore_marks_the_session_active() {
    let fx = Fixture::new();
    fx.table.spawn("Cursor.exe", FakeBehaviour::ExitsOnTerminate);

    assert_ok!(handlers::transfer::backup(&fx.ctx, "cursor", "work", false).await);
    assert_eq!(fx.table.alive_count(), 0);
    let archive = fx.ctx.sessions.session_path("cursor", "work").unwrap();
    assert!(archive.join("User/settings.json").is_file());

    fs::write(fx.data().join("state.db"), "v2").unwrap();
    write(&fx.data(), "junk.tmp", "x");

    assert_ok!(handlers::transfer::restore(&fx.ctx, "cursor", "work", false).await);
    assert_eq!(fs::read_to_string(fx.data().join("state.db")).unwrap(), "v1");
    assert!(!fx.data().join("junk.tmp").exists());
    assert_eq!(fx.ctx.sessions.active_session("cursor").as_deref(), Some("work"));
}

#[tokio::test]
async fn backup_refuses_an_existing_session() {
    let fx = Fixture::new();
    assert_ok!(handlers::transfer::backup(&fx.ctx, "cursor", "work", true).await);

    let err = handlers::transfer::backup(&fx.ctx, "cursor", "work", true)
        .await
        .unwrap_err();
    assert_eq!(exit_code(&err), 2);
}

#[tokio::test]
async fn backup_rejects_reserved_session_names() {
    let fx = Fixture::new();
    let err = handlers::transfer::backup(&fx.ctx, "cursor", "auto-manual", true)
        .await
        .unwrap_err();
    assert_eq!(exit_code(&err), 2);
}

#[tokio::test]
async fn restore_of_unknown_session_fails_without_touching_data() {
    let fx = Fixture::new();
    let err = handlers::transfer::restore(&fx.ctx, "cursor", "ghost", true)
        .await
        .unwrap_err();
    assert_eq!(exit_code(&err), 2);
    assert!(fx.data().join("state.db").is_file());
}

#[tokio::test]
async fn restore_rejects_names_outside_the_app_folder() {
    let fx = Fixture::new();
    assert_ok!(handlers::transfer::backup(&fx.ctx, "cursor", "work", true).await);

    for name in ["..", "../cursor", "."] {
        let err = handlers::transfer::restore(&fx.ctx, "cursor", name, true)
            .await
            .unwrap_err();
        assert_eq!(exit_code(&err), 2, "{name}");
    }
    assert_eq!(fs::read_to_string(fx.data().join("state.db")).unwrap(), "v1");
}

#[tokio::test]
async fn account_only_restore_switches_just_the_auth_state() {
    let fx = Fixture::new();
    write(&fx.data(), AUTH_STATE_FILE, "work account");
    assert_ok!(handlers::transfer::backup(&fx.ctx, "cursor", "work", true).await);

    write(&fx.data(), AUTH_STATE_FILE, "personal account");
    fs::write(fx.data().join("state.db"), "v2").unwrap();
    fx.table.spawn("Cursor.exe", FakeBehaviour::ExitsOnTerminate);

    assert_ok!(handlers::transfer::restore_account(&fx.ctx, "cursor", "work", false).await);
    assert_eq!(fx.table.alive_count(), 0);
    assert_eq!(
        fs::read_to_string(fx.data().join(AUTH_STATE_FILE)).unwrap(),
        "work account"
    );
    assert_eq!(fs::read_to_string(fx.data().join("state.db")).unwrap(), "v2");
    assert!(fx.ctx.sessions.active_session("cursor").is_none());
}

#[tokio::test]
async fn new_id_rewrites_identifiers_in_the_data_folder() {
    let fx = Fixture::new();
    write(&fx.data(), "User/globalStorage/storage.json", r#"{"theme":"dark"}"#);
    write(&fx.data(), "User/session.json", r#"{"sessionId":"old"}"#);

    assert_ok!(handlers::transfer::new_id(&fx.ctx, "cursor", true).await);

    let storage: serde_json::Value =
        serde_json::from_slice(&fs::read(fx.data().join("User/globalStorage/storage.json")).unwrap())
            .unwrap();
    assert!(storage["machineId"].is_string());
    assert_eq!(storage["machineId"], storage["telemetry.machineId"]);
    assert_eq!(storage["theme"], "dark");

    let session: serde_json::Value =
        serde_json::from_slice(&fs::read(fx.data().join("User/session.json")).unwrap()).unwrap();
    assert!(session["sessionId"].is_string());
    assert_ne!(session["sessionId"], "old");
}

#[tokio::test]
async fn reset_requires_confirmation() {
    let fx = Fixture::new();
    let err = handlers::transfer::reset(&fx.ctx, "cursor", true, true, false)
        .await
        .unwrap_err();
    assert_eq!(exit_code(&err), 2);
    assert!(fx.data().join("state.db").is_file());
}

#[tokio::test]
async fn reset_aborts_when_the_app_survives_closing() {
    let fx = Fixture::new();
    fx.table.spawn("Cursor.exe", FakeBehaviour::Unkillable);

    let err = handlers::transfer::reset(&fx.ctx, "cursor", true, false, true)
        .await
        .unwrap_err();
    assert_eq!(exit_code(&err), 71);
    assert!(fx.data().join("state.db").is_file());
    assert_eq!(fx.ctx.sessions.count_auto_backups("cursor"), 0);
}

#[tokio::test]
async fn reset_takes_an_auto_backup_and_empties_the_data_folder() {
    let fx = Fixture::new();

    assert_ok!(handlers::transfer::reset(&fx.ctx, "cursor", true, true, true).await);

    assert!(fx.data().is_dir());
    assert_eq!(fs::read_dir(fx.data()).unwrap().count(), 0);
    assert_eq!(fx.ctx.sessions.count_auto_backups("cursor"), 1);
}

#[tokio::test]
async fn kill_by_pid_stops_that_process_only() {
    let fx = Fixture::new();
    let target = fx.table.spawn("Cursor.exe", FakeBehaviour::ExitsOnTerminate);
    fx.table.spawn("Cursor.exe", FakeBehaviour::ExitsOnTerminate);

    assert_ok!(handlers::process::kill(&fx.ctx, &TargetArgs::default(), Some(target.pid), None).await);
    assert_eq!(fx.table.alive_count(), 1);
}

#[tokio::test]
async fn kill_unknown_pid_is_a_process_error() {
    let fx = Fixture::new();
    let err = handlers::process::kill(&fx.ctx, &TargetArgs::default(), Some(4242), None)
        .await
        .unwrap_err();
    assert_eq!(exit_code(&err), 71);
}

#[tokio::test]
async fn close_by_profile_stops_every_matching_process() {
    let fx = Fixture::new();
    fx.table.spawn("Cursor.exe", FakeBehaviour::ExitsOnTerminate);
    fx.table.spawn("cursor.exe", FakeBehaviour::IgnoresTerminate);
    let target = TargetArgs {
        names: Vec::new(),
        profile: Some("cursor".into()),
    };

    assert_ok!(handlers::process::close(&fx.ctx, &target, None, None).await);
    assert_eq!(fx.table.alive_count(), 0);
}

#[tokio::test]
async fn wait_times_out_while_the_process_runs() {
    let fx = Fixture::new();
    fx.table.spawn("Cursor.exe", FakeBehaviour::IgnoresTerminate);
    let target = TargetArgs {
        names: vec!["cursor.exe".into()],
        profile: None,
    };

    let err = handlers::process::wait(&fx.ctx, &target, 0).await.unwrap_err();
    assert_eq!(exit_code(&err), 71);
}

#[test]
fn sessions_rename_and_activate() {
    let fx = Fixture::new();
    fs::create_dir_all(fx.ctx.sessions.session_path("cursor", "old").unwrap()).unwrap();

    assert_ok!(handlers::sessions::execute(
        &fx.ctx,
        &SessionsCommand::Rename {
            profile: "cursor".into(),
            old: "old".into(),
            new: "new".into(),
        },
    ));
    assert_ok!(handlers::sessions::execute(
        &fx.ctx,
        &SessionsCommand::Activate {
            profile: "cursor".into(),
            session: "new".into(),
        },
    ));
    assert_eq!(fx.ctx.sessions.active_session("cursor").as_deref(), Some("new"));

    let err = handlers::sessions::execute(
        &fx.ctx,
        &SessionsCommand::Activate {
            profile: "cursor".into(),
            session: "old".into(),
        },
    )
    .unwrap_err();
    assert_eq!(exit_code(&err), 2);
}

#[test]
fn sessions_delete_cannot_climb_out_of_the_app_folder() {
    let fx = Fixture::new();
    fs::create_dir_all(fx.ctx.sessions.session_path("cursor", "work").unwrap()).unwrap();
    fs::create_dir_all(fx.ctx.sessions.session_path("code", "personal").unwrap()).unwrap();

    let err = handlers::sessions::execute(
        &fx.ctx,
        &SessionsCommand::Delete {
            profile: "cursor".into(),
            session: "..".into(),
        },
    )
    .unwrap_err();

    assert_eq!(exit_code(&err), 2);
    assert!(fx.ctx.sessions.exists("cursor", "work").unwrap());
    assert!(fx.ctx.sessions.exists("code", "personal").unwrap());
}

#[test]
fn sessions_list_as_json() {
    let fx = Fixture::new();
    fs::create_dir_all(fx.ctx.sessions.session_path("cursor", "work").unwrap()).unwrap();

    assert_ok!(handlers::sessions::execute(
        &fx.ctx,
        &SessionsCommand::List {
            profile: None,
            all: true,
            json: true,
        },
    ));
}
