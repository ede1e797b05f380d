//! Name-based process lookup with a short-lived result cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use surfmgr_core::{ProcessHandle, ProcessQuery, ProcessTable, Timings};
use tokio::time::Instant;
use tracing::{debug, warn};

struct CacheEntry {
    handles: Vec<ProcessHandle>,
    expires_at: Instant,
}

/// Finds running processes by executable name.
///
/// Results are cached per query for `Timings::cache_ttl`. A cached result is
/// only reused while at least one of its processes is still alive, so a stale
/// entry can hide a newly started process for at most one TTL but never
/// reports a dead one.
pub struct ProcessMatcher {
    table: Arc<dyn ProcessTable>,
    cache: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl std::fmt::Debug for ProcessMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessMatcher")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl ProcessMatcher {
    pub fn new(table: Arc<dyn ProcessTable>, timings: &Timings) -> Self {
        Self {
            table,
            cache: Mutex::new(HashMap::new()),
            ttl: timings.cache_ttl,
        }
    }

    /// The underlying process table.
    pub fn table(&self) -> &Arc<dyn ProcessTable> {
        &self.table
    }

    /// Running processes whose image name contains any of the query's names.
    ///
    /// Never fails: an unreadable process table is logged and reported as
    /// "nothing running".
    pub fn query(&self, query: &ProcessQuery) -> Vec<ProcessHandle> {
        if query.is_empty() {
            return Vec::new();
        }
        let key = query.cache_key();

        if let Some(cached) = self.cached(&key) {
            debug!(query = %key, count = cached.len(), "Process query served from cache");
            return cached;
        }

        let handles = match self.table.snapshot() {
            Ok(all) => all
                .into_iter()
                .filter(|handle| query.matches(&handle.image_name))
                .collect::<Vec<_>>(),
            Err(e) => {
                warn!(query = %key, error = %e, "Cannot enumerate processes; assuming none running");
                Vec::new()
            }
        };

        let mut cache = self.lock();
        if handles.is_empty() {
            cache.remove(&key);
        } else {
            cache.insert(
                key,
                CacheEntry {
                    handles: handles.clone(),
                    expires_at: Instant::now() + self.ttl,
                },
            );
        }
        handles
    }

    pub fn is_running(&self, query: &ProcessQuery) -> bool {
        !self.query(query).is_empty()
    }

    /// Look up a single process by PID, bypassing the cache.
    pub fn find_pid(&self, pid: u32) -> Option<ProcessHandle> {
        match self.table.snapshot() {
            Ok(all) => all.into_iter().find(|handle| handle.pid == pid),
            Err(e) => {
                warn!(pid, error = %e, "Cannot enumerate processes");
                None
            }
        }
    }

    /// Drop every cached result.
    pub fn reload(&self) {
        self.lock().clear();
    }

    /// Live handles from an unexpired entry, if any remain.
    fn cached(&self, key: &str) -> Option<Vec<ProcessHandle>> {
        let mut cache = self.lock();
        let entry = cache.get_mut(key)?;
        if Instant::now() >= entry.expires_at {
            cache.remove(key);
            return None;
        }

        entry.handles.retain(|handle| self.table.is_alive(handle));
        if entry.handles.is_empty() {
            cache.remove(key);
            return None;
        }
        Some(entry.handles.clone())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
