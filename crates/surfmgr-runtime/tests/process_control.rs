//! Process matching and termination against fake and real process tables.

use std::sync::Arc;
use std::time::Duration;

use surfmgr_core::testing::{FakeBehaviour, FakeProcessTable};
use surfmgr_core::{CollectingSink, ProcessQuery, ProcessTable, Timings};
use surfmgr_runtime::{ProcessMatcher, SystemProcessTable, TerminationController};

fn fake_controller(table: &Arc<FakeProcessTable>) -> TerminationController {
    let timings = Timings::default();
    let matcher = Arc::new(ProcessMatcher::new(table.clone(), &timings));
    TerminationController::new(matcher, timings)
}

#[test]
fn absent_process_is_not_running() {
    let table = Arc::new(FakeProcessTable::new());
    table.spawn("explorer.exe", FakeBehaviour::Unkillable);
    let matcher = ProcessMatcher::new(table, &Timings::default());
    let names = ProcessQuery::new(["Code.exe"]);

    assert!(!matcher.is_running(&names));
    assert!(matcher.query(&names).is_empty());
}

#[test]
fn repeated_query_is_served_from_cache() {
    let table = Arc::new(FakeProcessTable::new());
    table.spawn("Foo.exe", FakeBehaviour::Unkillable);
    let matcher = ProcessMatcher::new(table.clone(), &Timings::default());
    let names = ProcessQuery::new(["Foo.exe"]);

    let first = matcher.query(&names);
    let second = matcher.query(&names);

    assert_eq!(first.len(), 1);
    assert_eq!(first, second);
    assert_eq!(table.snapshot_count(), 1);
}

#[test]
fn is_running_agrees_with_query() {
    let table = Arc::new(FakeProcessTable::new());
    table.spawn("Code.exe", FakeBehaviour::Unkillable);
    table.spawn("cursor", FakeBehaviour::Unkillable);
    let matcher = ProcessMatcher::new(table, &Timings::default());

    for names in [
        vec!["code.exe"],
        vec!["windsurf"],
        vec!["CURSOR", "missing"],
        vec![],
    ] {
        let query = ProcessQuery::new(names);
        assert_eq!(matcher.is_running(&query), !matcher.query(&query).is_empty());
    }
}

#[tokio::test(start_paused = true)]
async fn process_exiting_during_terminate_counts_as_success() {
    let table = Arc::new(FakeProcessTable::new());
    let handle = table.spawn("Code.exe", FakeBehaviour::VanishesOnTerminate);
    let controller = fake_controller(&table);

    let outcome = controller.kill_process(&handle, Duration::from_secs(5)).await;

    assert!(outcome.success);
    assert!(
        outcome.message.contains("already terminated")
            || outcome.message.contains("terminated gracefully")
    );
}

#[tokio::test(start_paused = true)]
async fn kill_all_without_matches_sends_no_signals() {
    let table = Arc::new(FakeProcessTable::new());
    table.spawn("explorer.exe", FakeBehaviour::ExitsOnTerminate);
    let sink = Arc::new(CollectingSink::new());
    let controller = fake_controller(&table).with_sink(sink.clone());

    let outcome = controller.close_all(&ProcessQuery::new(["Code.exe"])).await;

    assert!(outcome.success);
    assert_eq!(outcome.message, "No processes running");
    assert_eq!(table.terminate_count() + table.kill_count(), 0);
    assert!(sink.logs().is_empty());
}

#[tokio::test(start_paused = true)]
async fn smart_close_fails_only_when_processes_survive() {
    for (behaviour, expect_success) in [
        (FakeBehaviour::ExitsOnTerminate, true),
        (FakeBehaviour::IgnoresTerminate, true),
        (FakeBehaviour::VanishesOnTerminate, true),
        (FakeBehaviour::Unkillable, false),
        (FakeBehaviour::DeniesAccess, false),
    ] {
        let table = Arc::new(FakeProcessTable::new());
        table.spawn("Code.exe", behaviour);
        let controller = fake_controller(&table);
        let query = ProcessQuery::new(["Code.exe"]);

        let outcome = controller
            .smart_close("Code", &query, Duration::from_secs(10), 3)
            .await;

        assert_eq!(outcome.success, expect_success, "{behaviour:?}: {}", outcome.message);
        assert_eq!(
            outcome.success,
            !controller.matcher().is_running(&query),
            "{behaviour:?}"
        );
    }
}

#[cfg(unix)]
mod real_processes {
    use super::*;
    use std::process::{Command, Stdio};

    #[tokio::test]
    async fn terminates_a_real_child() {
        let mut child = Command::new("sleep")
            .arg("30")
            .stdout(Stdio::null())
            .spawn()
            .expect("spawn sleep");
        let pid = child.id();

        let table: Arc<dyn ProcessTable> = Arc::new(SystemProcessTable::new());
        let handle = table
            .snapshot()
            .unwrap()
            .into_iter()
            .find(|h| h.pid == pid)
            .expect("child visible in process table");
        assert!(handle.image_name.contains("sleep"));

        // Reap in the background so the child does not linger as a zombie.
        let reaper = std::thread::spawn(move || child.wait());

        let timings = Timings::default();
        let matcher = Arc::new(ProcessMatcher::new(table, &timings));
        let controller = TerminationController::new(matcher, timings);
        let outcome = controller.kill_process(&handle, Duration::from_secs(5)).await;

        assert!(outcome.success, "{}", outcome.message);
        let status = reaper.join().unwrap().unwrap();
        assert!(!status.success());
    }
}
