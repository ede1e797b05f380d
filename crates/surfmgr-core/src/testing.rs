//! Scriptable in-memory process table for tests.
//!
//! Enabled for this crate's own tests and, through the `test-utils` feature,
//! for downstream crates that need a deterministic `ProcessTable`.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use crate::domain::ProcessHandle;
use crate::errors::ProcessError;
use crate::ports::ProcessTable;

/// How a fake process reacts to signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeBehaviour {
    /// Exits as soon as it is asked to terminate.
    ExitsOnTerminate,
    /// Ignores terminate; dies on kill.
    IgnoresTerminate,
    /// Terminate and kill both fail with `AccessDenied`.
    DeniesAccess,
    /// Exits on its own just before the terminate lands.
    VanishesOnTerminate,
    /// Survives every signal.
    Unkillable,
}

#[derive(Debug)]
struct FakeProcess {
    handle: ProcessHandle,
    behaviour: FakeBehaviour,
    alive: bool,
    /// Snapshots that still list the process before it exits on its own.
    snapshots_left: Option<usize>,
}

/// In-memory `ProcessTable` with call counters.
#[derive(Debug)]
pub struct FakeProcessTable {
    processes: Mutex<Vec<FakeProcess>>,
    next_pid: AtomicU32,
    enumeration_unavailable: AtomicBool,
    snapshots: AtomicUsize,
    terminates: AtomicUsize,
    kills: AtomicUsize,
}

impl Default for FakeProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeProcessTable {
    pub fn new() -> Self {
        Self {
            processes: Mutex::new(Vec::new()),
            next_pid: AtomicU32::new(1000),
            enumeration_unavailable: AtomicBool::new(false),
            snapshots: AtomicUsize::new(0),
            terminates: AtomicUsize::new(0),
            kills: AtomicUsize::new(0),
        }
    }

    /// Start a fake process and return its handle.
    pub fn spawn(&self, image_name: &str, behaviour: FakeBehaviour) -> ProcessHandle {
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        let handle = ProcessHandle::new(pid, image_name, u64::from(pid));
        self.lock().push(FakeProcess {
            handle: handle.clone(),
            behaviour,
            alive: true,
            snapshots_left: None,
        });
        handle
    }

    /// Make a process exit on its own.
    pub fn exit(&self, handle: &ProcessHandle) {
        self.set_alive(handle, false);
    }

    /// Keep a process listed by the next `snapshots` snapshots; it exits on
    /// its own right before the one after.
    pub fn exit_after_snapshots(&self, handle: &ProcessHandle, snapshots: usize) {
        if let Some(process) = self.lock().iter_mut().find(|p| p.handle == *handle) {
            process.snapshots_left = Some(snapshots);
        }
    }

    /// Make every subsequent `snapshot` fail.
    pub fn set_enumeration_unavailable(&self, unavailable: bool) {
        self.enumeration_unavailable
            .store(unavailable, Ordering::SeqCst);
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.load(Ordering::SeqCst)
    }

    pub fn terminate_count(&self) -> usize {
        self.terminates.load(Ordering::SeqCst)
    }

    pub fn kill_count(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }

    /// Number of processes still running.
    pub fn alive_count(&self) -> usize {
        self.lock().iter().filter(|p| p.alive).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<FakeProcess>> {
        self.processes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn set_alive(&self, handle: &ProcessHandle, alive: bool) {
        if let Some(process) = self.lock().iter_mut().find(|p| p.handle == *handle) {
            process.alive = alive;
        }
    }

    fn signal(&self, handle: &ProcessHandle, forceful: bool) -> Result<(), ProcessError> {
        let mut processes = self.lock();
        let Some(process) = processes
            .iter_mut()
            .find(|p| p.handle == *handle && p.alive)
        else {
            return Err(ProcessError::AlreadyGone { pid: handle.pid });
        };

        match (process.behaviour, forceful) {
            (FakeBehaviour::DeniesAccess, _) => Err(ProcessError::AccessDenied {
                pid: handle.pid,
                name: handle.image_name.clone(),
            }),
            (FakeBehaviour::VanishesOnTerminate, _) => {
                process.alive = false;
                Err(ProcessError::AlreadyGone { pid: handle.pid })
            }
            (FakeBehaviour::Unkillable, _) | (FakeBehaviour::IgnoresTerminate, false) => Ok(()),
            (FakeBehaviour::ExitsOnTerminate | FakeBehaviour::IgnoresTerminate, _) => {
                process.alive = false;
                Ok(())
            }
        }
    }
}

impl ProcessTable for FakeProcessTable {
    fn snapshot(&self) -> Result<Vec<ProcessHandle>, ProcessError> {
        self.snapshots.fetch_add(1, Ordering::SeqCst);
        if self.enumeration_unavailable.load(Ordering::SeqCst) {
            return Err(ProcessError::EnumerationUnavailable(
                "fake table disabled".to_string(),
            ));
        }
        let mut processes = self.lock();
        for process in processes.iter_mut().filter(|p| p.alive) {
            match process.snapshots_left {
                Some(0) => process.alive = false,
                Some(left) => process.snapshots_left = Some(left - 1),
                None => {}
            }
        }
        Ok(processes
            .iter()
            .filter(|p| p.alive)
            .map(|p| p.handle.clone())
            .collect())
    }

    fn is_alive(&self, handle: &ProcessHandle) -> bool {
        self.lock().iter().any(|p| p.handle == *handle && p.alive)
    }

    fn terminate(&self, handle: &ProcessHandle) -> Result<(), ProcessError> {
        self.terminates.fetch_add(1, Ordering::SeqCst);
        self.signal(handle, false)
    }

    fn kill(&self, handle: &ProcessHandle) -> Result<(), ProcessError> {
        self.kills.fetch_add(1, Ordering::SeqCst);
        self.signal(handle, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn behaviours_follow_signal_strength() {
        let table = FakeProcessTable::new();
        let polite = table.spawn("a.exe", FakeBehaviour::ExitsOnTerminate);
        let stubborn = table.spawn("b.exe", FakeBehaviour::IgnoresTerminate);

        table.terminate(&polite).unwrap();
        table.terminate(&stubborn).unwrap();
        assert!(!table.is_alive(&polite));
        assert!(table.is_alive(&stubborn));

        table.kill(&stubborn).unwrap();
        assert!(!table.is_alive(&stubborn));
        assert!(table.terminate(&polite).unwrap_err().is_gone());
        assert_eq!(table.terminate_count(), 3);
        assert_eq!(table.kill_count(), 1);
    }

    #[test]
    fn snapshot_lists_only_live_processes() {
        let table = FakeProcessTable::new();
        let a = table.spawn("a.exe", FakeBehaviour::Unkillable);
        table.spawn("b.exe", FakeBehaviour::Unkillable);
        table.exit(&a);

        let names: Vec<_> = table
            .snapshot()
            .unwrap()
            .into_iter()
            .map(|h| h.image_name)
            .collect();
        assert_eq!(names, vec!["b.exe"]);

        table.set_enumeration_unavailable(true);
        assert!(table.snapshot().is_err());
        assert_eq!(table.snapshot_count(), 2);
    }

    #[test]
    fn scheduled_exit_happens_after_the_given_snapshots() {
        let table = FakeProcessTable::new();
        let handle = table.spawn("a.exe", FakeBehaviour::DeniesAccess);
        table.exit_after_snapshots(&handle, 2);

        assert_eq!(table.snapshot().unwrap().len(), 1);
        assert_eq!(table.snapshot().unwrap().len(), 1);
        assert!(table.is_alive(&handle));
        assert!(table.snapshot().unwrap().is_empty());
        assert!(!table.is_alive(&handle));
    }
}
