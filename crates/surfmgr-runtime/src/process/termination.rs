//! Graceful-then-forceful process termination and multi-attempt app close.
//!
//! Every step reports a human-readable line through the controller's event
//! sink (`[KILL] ...`, `[FORCE] ...`, `[OK] ...`), mirrored to `tracing` at
//! debug level. Failures never escape as errors: each operation resolves to a
//! `TerminationOutcome`.

use std::sync::Arc;
use std::time::Duration;

use surfmgr_core::{
    NoopSink, OperationEvent, OperationEventSink, ProcessError, ProcessHandle, ProcessQuery,
    TerminationOutcome, Timings,
};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use super::matcher::ProcessMatcher;

/// Smart-close progress.
#[derive(Debug)]
enum CloseState {
    CheckRunning { attempt: u32 },
    Closing { attempt: u32 },
    Settling,
    Exhausted,
    Done(TerminationOutcome),
}

/// Terminates processes found by a `ProcessMatcher`.
pub struct TerminationController {
    matcher: Arc<ProcessMatcher>,
    timings: Timings,
    sink: Arc<dyn OperationEventSink>,
}

impl std::fmt::Debug for TerminationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminationController")
            .field("timings", &self.timings)
            .finish_non_exhaustive()
    }
}

impl TerminationController {
    pub fn new(matcher: Arc<ProcessMatcher>, timings: Timings) -> Self {
        Self {
            matcher,
            timings,
            sink: Arc::new(NoopSink),
        }
    }

    /// Route step-by-step log lines to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn OperationEventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn matcher(&self) -> &ProcessMatcher {
        &self.matcher
    }

    pub const fn timings(&self) -> &Timings {
        &self.timings
    }

    fn log(&self, line: String) {
        debug!(target: "surfmgr::termination", "{line}");
        self.sink.emit(OperationEvent::log(line));
    }

    /// Stop one process: terminate, wait up to `timeout`, then kill and wait
    /// out the force-kill grace period.
    pub async fn kill_process(&self, handle: &ProcessHandle, timeout: Duration) -> TerminationOutcome {
        match self.escalate(handle, timeout).await {
            Ok(message) => {
                self.log(format!("[OK] {message}"));
                TerminationOutcome::ok(message)
            }
            Err(ProcessError::TimedOut { .. }) => {
                TerminationOutcome::failed(format!("failed to kill {handle}"))
            }
            Err(e) => TerminationOutcome::failed(e.to_string()),
        }
    }

    /// Kill a process by PID, looking it up first.
    pub async fn kill_pid(&self, pid: u32) -> TerminationOutcome {
        match self.matcher.find_pid(pid) {
            Some(handle) => self.kill_process(&handle, self.timings.kill_timeout).await,
            None => TerminationOutcome::failed(format!("process not found: PID {pid}")),
        }
    }

    async fn escalate(&self, handle: &ProcessHandle, timeout: Duration) -> Result<String, ProcessError> {
        let table = self.matcher.table();
        let name = &handle.image_name;
        if !table.is_alive(handle) {
            return Ok(format!("{handle} already terminated"));
        }

        self.log(format!("[KILL] Terminating {handle}..."));
        match table.terminate(handle) {
            Ok(()) => {}
            Err(e) if e.is_gone() => return Ok(format!("{handle} already terminated")),
            Err(e @ ProcessError::AccessDenied { .. }) => return Err(e),
            Err(e) => self.log(format!("[WARNING] Graceful terminate failed: {e}")),
        }

        if self.wait_until_dead(handle, timeout).await {
            return Ok(format!("{name} terminated gracefully"));
        }

        self.log(format!("[FORCE] Force killing {handle}..."));
        match table.kill(handle) {
            Ok(()) => {}
            Err(e) if e.is_gone() => return Ok(format!("{handle} already terminated")),
            Err(e) => return Err(e),
        }

        if self.wait_until_dead(handle, self.timings.force_kill_grace).await {
            Ok(format!("{name} force killed"))
        } else {
            Err(ProcessError::TimedOut {
                pid: handle.pid,
                name: name.clone(),
                waited_ms: (timeout + self.timings.force_kill_grace).as_millis(),
            })
        }
    }

    /// Poll until the process is gone or `timeout` elapses.
    async fn wait_until_dead(&self, handle: &ProcessHandle, timeout: Duration) -> bool {
        let table = self.matcher.table();
        let deadline = Instant::now() + timeout;
        loop {
            if !table.is_alive(handle) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            sleep(self.timings.alive_poll_interval.min(deadline - now)).await;
        }
    }

    /// Kill every process matching `query`, then force-kill any survivors.
    pub async fn kill_all(&self, query: &ProcessQuery, timeout: Duration) -> TerminationOutcome {
        let running = self.matcher.query(query);
        if running.is_empty() {
            return TerminationOutcome::ok("No processes running");
        }

        self.log(format!("[KILL] Found {} process(es) to kill", running.len()));
        let mut killed = 0usize;
        for handle in &running {
            let outcome = self.kill_process(handle, timeout).await;
            if outcome.success {
                killed += 1;
            } else {
                self.log(format!("[FAIL] {}", outcome.message));
            }
        }

        sleep(self.timings.kill_settle).await;
        let remaining = self.matcher.query(query);
        if remaining.is_empty() {
            return TerminationOutcome::ok(format!("Killed {killed} process(es)"));
        }

        self.log(format!("[RETRY] {} still running, force killing...", remaining.len()));
        let table = self.matcher.table();
        for handle in &remaining {
            match table.kill(handle) {
                Ok(()) => {
                    if self.wait_until_dead(handle, self.timings.force_kill_grace).await {
                        killed += 1;
                    }
                }
                Err(e) if e.is_gone() => killed += 1,
                Err(e) => warn!(pid = handle.pid, name = %handle.image_name, error = %e, "Force kill failed"),
            }
        }

        sleep(self.timings.kill_settle).await;
        let survivors = self.matcher.query(query).len();
        if survivors > 0 {
            TerminationOutcome::failed(format!("Failed to kill {survivors} process(es)"))
        } else {
            TerminationOutcome::ok(format!("Killed {killed} process(es)"))
        }
    }

    /// `kill_all` with the configured kill timeout.
    pub async fn close_all(&self, query: &ProcessQuery) -> TerminationOutcome {
        self.kill_all(query, self.timings.kill_timeout).await
    }

    /// Close an application with retries, then wait for its file handles.
    ///
    /// Fails only when, after `max_retries` attempts, matching processes are
    /// still running.
    pub async fn smart_close(
        &self,
        app: &str,
        query: &ProcessQuery,
        timeout: Duration,
        max_retries: u32,
    ) -> TerminationOutcome {
        let max_retries = max_retries.max(1);
        self.log(format!("[SMART CLOSE] {app}"));

        let mut state = CloseState::CheckRunning { attempt: 1 };
        loop {
            state = match state {
                CloseState::Done(outcome) => return outcome,
                CloseState::CheckRunning { attempt } if attempt > max_retries => {
                    CloseState::Exhausted
                }
                CloseState::CheckRunning { attempt } => {
                    if self.matcher.is_running(query) {
                        CloseState::Closing { attempt }
                    } else {
                        self.log(format!("[OK] {app} is not running"));
                        sleep(self.timings.idle_settle).await;
                        CloseState::Done(TerminationOutcome::ok(format!("{app} is not running")))
                    }
                }
                CloseState::Closing { attempt } => {
                    self.log(format!("[ATTEMPT] {attempt}/{max_retries}"));
                    let outcome = self.kill_all(query, timeout).await;
                    if outcome.success {
                        self.log(format!("[OK] {app} closed - waiting for file release..."));
                        CloseState::Settling
                    } else {
                        info!(app, attempt, reason = %outcome.message, "Close attempt failed");
                        if attempt < max_retries {
                            self.log("[RETRY] Waiting...".to_string());
                            sleep(self.timings.retry_delay).await;
                        }
                        CloseState::CheckRunning {
                            attempt: attempt + 1,
                        }
                    }
                }
                CloseState::Settling => {
                    sleep(self.timings.file_release_wait).await;
                    CloseState::Done(TerminationOutcome::ok(format!("{app} closed")))
                }
                CloseState::Exhausted => {
                    self.matcher.reload();
                    if self.matcher.is_running(query) {
                        CloseState::Done(TerminationOutcome::failed(format!(
                            "Failed to close {app} after {max_retries} attempts"
                        )))
                    } else {
                        // Every attempt failed, yet nothing matches any more.
                        warn!(app, attempts = max_retries, "Close attempts failed but no process remains");
                        sleep(self.timings.file_release_wait).await;
                        CloseState::Done(TerminationOutcome::ok(format!(
                            "{app} closed after {max_retries} attempts"
                        )))
                    }
                }
            };
        }
    }

    /// Poll until nothing matches `query` or `timeout` elapses.
    pub async fn wait_for_exit(&self, query: &ProcessQuery, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.matcher.is_running(query) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            sleep(self.timings.exit_poll_interval.min(deadline - now)).await;
        }
    }
}
