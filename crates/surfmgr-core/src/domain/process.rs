//! Process identity, name queries, and termination outcomes.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A process observed in one snapshot of the OS process table.
///
/// Handles are ephemeral. A PID can be recycled once its process exits, so the
/// process start time travels with the handle and liveness checks compare it
/// before acting on the PID again.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessHandle {
    /// OS process identifier.
    pub pid: u32,
    /// Executable image name as reported by the OS (e.g. `Code.exe`).
    pub image_name: String,
    /// Start time in seconds since the epoch; `0` when the platform cannot tell.
    pub start_time: u64,
}

impl ProcessHandle {
    /// Create a new process handle.
    #[must_use]
    pub fn new(pid: u32, image_name: impl Into<String>, start_time: u64) -> Self {
        Self {
            pid,
            image_name: image_name.into(),
            start_time,
        }
    }
}

impl fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (PID {})", self.image_name, self.pid)
    }
}

/// A set of candidate executable names.
///
/// Matching is a case-insensitive substring test against each running
/// process's image name. Names are trimmed, lowercased and deduplicated on
/// construction; blank names are dropped because they would match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProcessQuery {
    names: BTreeSet<String>,
}

impl ProcessQuery {
    /// Build a query from any list of names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|name| name.as_ref().trim().to_lowercase())
            .filter(|name| !name.is_empty())
            .collect();
        Self { names }
    }

    /// True when the query holds no usable names.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Normalised names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Cache key: the sorted, deduplicated name set.
    pub fn cache_key(&self) -> String {
        self.names().collect::<Vec<_>>().join("|")
    }

    /// Whether `image_name` contains any of the query names, ignoring case.
    pub fn matches(&self, image_name: &str) -> bool {
        let image = image_name.to_lowercase();
        self.names.iter().any(|name| image.contains(name.as_str()))
    }
}

impl<S: AsRef<str>> FromIterator<S> for ProcessQuery {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Terminal result of a kill, kill-all or smart-close request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationOutcome {
    pub success: bool,
    pub message: String,
}

impl TerminationOutcome {
    /// Successful outcome with a human-readable message.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// Failed outcome with a human-readable message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl fmt::Display for TerminationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
