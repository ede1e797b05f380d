//! Runs transfer jobs off the caller's task and relays their events.
//!
//! Each job runs on tokio's blocking pool. Its progress and log events, and
//! a `Finished` event added by a relay task once the job returns, travel over
//! one channel of `Envelope`s that the caller drains with `next_event`. The
//! relay also converts a panicking job into a failed result, so every
//! operation produces exactly one `Finished`, always as its last event.

use std::collections::HashMap;
use std::fmt;

use surfmgr_core::{OperationEvent, OperationEventSink, TransferResult};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::transfer::TransferJob;

/// Identifies one started operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(u64);

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op-{}", self.0)
    }
}

/// An event tagged with the operation that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub operation: OperationId,
    pub event: OperationEvent,
}

/// Sink that forwards into the coordinator channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    operation: OperationId,
    tx: mpsc::UnboundedSender<Envelope>,
}

impl OperationEventSink for ChannelSink {
    fn emit(&self, event: OperationEvent) {
        // A closed channel means nobody is listening any more.
        let _ = self.tx.send(Envelope {
            operation: self.operation,
            event,
        });
    }
}

struct InFlight {
    cancel: CancellationToken,
    _relay: JoinHandle<()>,
}

/// Starts jobs and hands their events to a single consuming loop.
///
/// There is no queue. Starting a job while another runs makes the new one
/// current; the old one keeps running and still delivers its own `Finished`.
pub struct WorkerCoordinator {
    tx: mpsc::UnboundedSender<Envelope>,
    rx: mpsc::UnboundedReceiver<Envelope>,
    next_id: u64,
    current: Option<OperationId>,
    in_flight: HashMap<OperationId, InFlight>,
}

impl Default for WorkerCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WorkerCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerCoordinator")
            .field("current", &self.current)
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl WorkerCoordinator {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            next_id: 1,
            current: None,
            in_flight: HashMap::new(),
        }
    }

    /// Spawn `job` and make it the current operation.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<J: TransferJob>(&mut self, job: J) -> OperationId {
        let id = OperationId(self.next_id);
        self.next_id += 1;

        let label = job.label();
        let cancel = CancellationToken::new();
        let job_cancel = cancel.clone();
        let sink = ChannelSink {
            operation: id,
            tx: self.tx.clone(),
        };
        let worker = tokio::task::spawn_blocking(move || job.run(&job_cancel, &sink));

        let tx = self.tx.clone();
        let relay = tokio::spawn(async move {
            let result = match worker.await {
                Ok(result) => result,
                Err(e) => {
                    error!(operation = %id, error = %e, "Transfer job aborted");
                    TransferResult::failed(join_error_message(e))
                }
            };
            let _ = tx.send(Envelope {
                operation: id,
                event: OperationEvent::finished(result),
            });
        });

        if let Some(previous) = self.current.replace(id) {
            debug!(%previous, current = %id, "Operation superseded");
        }
        debug!(operation = %id, label = %label, "Operation started");
        self.in_flight.insert(
            id,
            InFlight {
                cancel,
                _relay: relay,
            },
        );
        id
    }

    pub const fn current(&self) -> Option<OperationId> {
        self.current
    }

    /// Operations whose `Finished` has not been consumed yet.
    pub fn active_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Request cancellation of the current operation.
    pub fn cancel_current(&self) -> bool {
        self.current.is_some_and(|id| self.cancel(id))
    }

    /// Request cancellation of `operation`. Returns false if it already finished.
    pub fn cancel(&self, operation: OperationId) -> bool {
        self.in_flight.get(&operation).is_some_and(|flight| {
            flight.cancel.cancel();
            true
        })
    }

    /// Token that cancels `operation`, for use while `next_event` is pending.
    pub fn cancel_token(&self, operation: OperationId) -> Option<CancellationToken> {
        self.in_flight
            .get(&operation)
            .map(|flight| flight.cancel.clone())
    }

    /// Wait for the next event from any operation.
    ///
    /// Returns `None` once every started operation has delivered `Finished`.
    /// Consuming a `Finished` releases that operation's bookkeeping.
    pub async fn next_event(&mut self) -> Option<Envelope> {
        if self.in_flight.is_empty() {
            return None;
        }
        let envelope = self.rx.recv().await?;
        if envelope.event.is_finished() {
            self.in_flight.remove(&envelope.operation);
            if self.current == Some(envelope.operation) {
                self.current = None;
            }
            debug!(operation = %envelope.operation, "Operation finished");
        }
        Some(envelope)
    }

    /// Start `job` and drive it to its result, passing each of its events to
    /// `on_event`. Events of other operations are consumed silently.
    pub async fn run_to_completion<J, F>(&mut self, job: J, mut on_event: F) -> TransferResult
    where
        J: TransferJob,
        F: FnMut(&OperationEvent),
    {
        let id = self.start(job);
        while let Some(envelope) = self.next_event().await {
            if envelope.operation != id {
                continue;
            }
            on_event(&envelope.event);
            if let OperationEvent::Finished(result) = envelope.event {
                return result;
            }
        }
        TransferResult::failed("operation ended without a result")
    }
}

fn join_error_message(err: JoinError) -> String {
    if err.is_cancelled() {
        return "Cancelled".to_string();
    }
    match err.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "transfer panicked".to_string()),
        Err(e) => e.to_string(),
    }
}
