//! `ProcessTable` backed by the real OS process list.
//!
//! Enumeration and liveness go through `sysinfo`. Signals are sent with
//! `nix` on Unix (SIGTERM, then SIGKILL) and with `sysinfo` elsewhere.

use std::sync::{Mutex, MutexGuard, PoisonError};

use surfmgr_core::{ProcessError, ProcessHandle, ProcessTable};
use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};
use tracing::debug;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{self, Signal};

/// The live OS process table.
pub struct SystemProcessTable {
    system: Mutex<System>,
}

impl Default for SystemProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SystemProcessTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemProcessTable").finish_non_exhaustive()
    }
}

impl SystemProcessTable {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    fn system(&self) -> MutexGuard<'_, System> {
        self.system.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refresh one PID and report whether it is still the same, running process.
    fn refresh_identity(&self, handle: &ProcessHandle) -> bool {
        let pid = Pid::from_u32(handle.pid);
        let mut system = self.system();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

        system.process(pid).is_some_and(|process| {
            let same_process = handle.start_time == 0 || process.start_time() == handle.start_time;
            same_process && !matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead)
        })
    }

    #[cfg(unix)]
    fn send(handle: &ProcessHandle, sig: Signal) -> Result<(), ProcessError> {
        let raw = i32::try_from(handle.pid).map_err(|_| ProcessError::Signal {
            pid: handle.pid,
            message: "PID out of range".to_string(),
        })?;

        match signal::kill(nix::unistd::Pid::from_raw(raw), sig) {
            Ok(()) => Ok(()),
            Err(Errno::ESRCH) => Err(ProcessError::AlreadyGone { pid: handle.pid }),
            Err(Errno::EPERM) => Err(ProcessError::AccessDenied {
                pid: handle.pid,
                name: handle.image_name.clone(),
            }),
            Err(e) => Err(ProcessError::Signal {
                pid: handle.pid,
                message: e.to_string(),
            }),
        }
    }

    #[cfg(not(unix))]
    fn send(&self, handle: &ProcessHandle, forceful: bool) -> Result<(), ProcessError> {
        let system = self.system();
        let Some(process) = system.process(Pid::from_u32(handle.pid)) else {
            return Err(ProcessError::AlreadyGone { pid: handle.pid });
        };

        let delivered = if forceful {
            process.kill()
        } else {
            // Not every platform has a polite signal; fall back to a hard kill.
            process
                .kill_with(sysinfo::Signal::Term)
                .unwrap_or_else(|| process.kill())
        };

        if delivered {
            Ok(())
        } else {
            Err(ProcessError::AccessDenied {
                pid: handle.pid,
                name: handle.image_name.clone(),
            })
        }
    }
}

impl ProcessTable for SystemProcessTable {
    fn snapshot(&self) -> Result<Vec<ProcessHandle>, ProcessError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(ProcessError::EnumerationUnavailable(
                "process listing is not supported on this platform".to_string(),
            ));
        }

        let mut system = self.system();
        system.refresh_processes(ProcessesToUpdate::All, true);

        let handles: Vec<ProcessHandle> = system
            .processes()
            .iter()
            .filter(|(_, process)| {
                !matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead)
            })
            .map(|(pid, process)| {
                ProcessHandle::new(
                    pid.as_u32(),
                    process.name().to_string_lossy(),
                    process.start_time(),
                )
            })
            .collect();

        debug!(count = handles.len(), "Enumerated processes");
        Ok(handles)
    }

    fn is_alive(&self, handle: &ProcessHandle) -> bool {
        self.refresh_identity(handle)
    }

    fn terminate(&self, handle: &ProcessHandle) -> Result<(), ProcessError> {
        if !self.refresh_identity(handle) {
            return Err(ProcessError::AlreadyGone { pid: handle.pid });
        }
        #[cfg(unix)]
        {
            Self::send(handle, Signal::SIGTERM)
        }
        #[cfg(not(unix))]
        {
            self.send(handle, false)
        }
    }

    fn kill(&self, handle: &ProcessHandle) -> Result<(), ProcessError> {
        if !self.refresh_identity(handle) {
            return Err(ProcessError::AlreadyGone { pid: handle.pid });
        }
        #[cfg(unix)]
        {
            Self::send(handle, Signal::SIGKILL)
        }
        #[cfg(not(unix))]
        {
            self.send(handle, true)
        }
    }
}
