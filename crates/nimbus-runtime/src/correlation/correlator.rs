//! The outstanding-request registry.

use super::error::CorrelationError;
use super::handle::{MulticastHandle, ResponseHandle};
use nimbus_message::Envelope;
use nimbus_types::{Clock, MessageId};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::debug;

/// How often the reaper sweeps for expired records.
const REAP_INTERVAL: Duration = Duration::from_secs(1);

pub(crate) type ReplyResult = Result<Value, CorrelationError>;

pub(crate) enum Completion {
    Single(oneshot::Sender<ReplyResult>),
    Stream(mpsc::UnboundedSender<ReplyResult>),
}

pub(crate) struct Outstanding {
    expires_at: SystemTime,
    completion: Completion,
}

#[derive(Default)]
pub(crate) struct CorrelatorState {
    pending: Mutex<HashMap<MessageId, Outstanding>>,
}

impl CorrelatorState {
    pub(crate) fn remove(&self, id: MessageId) -> bool {
        self.pending.lock().remove(&id).is_some()
    }

    fn sweep(&self, now: SystemTime) {
        let expired: Vec<(MessageId, Outstanding)> = {
            let mut pending = self.pending.lock();
            let ids: Vec<MessageId> = pending
                .iter()
                .filter(|(_, outstanding)| outstanding.expires_at < now)
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| pending.remove(&id).map(|outstanding| (id, outstanding)))
                .collect()
        };

        for (id, outstanding) in expired {
            debug!(request = %id, "pending request expired");
            match outstanding.completion {
                Completion::Single(tx) => {
                    let _ = tx.send(Err(CorrelationError::Timeout(id)));
                }
                // Dropping the stream sender ends the caller's collect loop.
                Completion::Stream(_) => {}
            }
        }
    }
}

/// Maps outstanding request ids to pending completions.
///
/// `record_request` is called between envelope build and send; the
/// returned handle is awaited after the send. Incoming reply traffic runs
/// through [`try_complete`](Self::try_complete), which drops anything it
/// cannot match. A reaper task is the single source of timeout truth:
/// every second it signals and removes records whose deadline passed.
pub struct RequestCorrelator {
    state: Arc<CorrelatorState>,
    clock: Arc<dyn Clock>,
}

impl RequestCorrelator {
    /// Creates a correlator reading deadlines from the given clock.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(CorrelatorState::default()),
            clock,
        }
    }

    /// Records a pending single-reply request.
    #[must_use]
    pub fn record_request<R>(&self, id: MessageId, expires_at: SystemTime) -> ResponseHandle<R> {
        let (tx, rx) = oneshot::channel();
        self.state.pending.lock().insert(
            id,
            Outstanding {
                expires_at,
                completion: Completion::Single(tx),
            },
        );
        ResponseHandle::new(id, rx, Arc::clone(&self.state))
    }

    /// Records a pending multicast request accepting a stream of replies
    /// until its window closes.
    #[must_use]
    pub fn record_multicast<R>(&self, id: MessageId, expires_at: SystemTime) -> MulticastHandle<R> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.pending.lock().insert(
            id,
            Outstanding {
                expires_at,
                completion: Completion::Stream(tx),
            },
        );
        MulticastHandle::new(id, rx, Arc::clone(&self.state))
    }

    /// Offers a received envelope as a reply.
    ///
    /// Unmatched, expired, or uncorrelated envelopes are dropped without
    /// error. Completion is single-shot for plain requests; multicast
    /// records accept every reply until reaped.
    pub fn try_complete(&self, envelope: &Envelope) {
        let Some(correlation) = envelope.correlation_id else {
            debug!(message = %envelope.message_id, "reply without correlation id dropped");
            return;
        };
        let id = correlation.message_id();
        let now = self.clock.now();

        let mut pending = self.state.pending.lock();
        let Some(outstanding) = pending.get(&id) else {
            debug!(request = %id, "unmatched reply dropped");
            return;
        };
        if outstanding.expires_at < now {
            debug!(request = %id, "reply after deadline dropped");
            return;
        }

        let result = if envelope.is_faulted() {
            Err(CorrelationError::RemoteFault {
                id,
                detail: envelope.payload.to_string(),
            })
        } else {
            Ok(envelope.payload.clone())
        };

        match &outstanding.completion {
            Completion::Single(_) => {
                if let Some(outstanding) = pending.remove(&id) {
                    if let Completion::Single(tx) = outstanding.completion {
                        let _ = tx.send(result);
                    }
                }
            }
            Completion::Stream(tx) => {
                let _ = tx.send(result);
            }
        }
    }

    /// Cancels a pending request.
    ///
    /// The record is signalled `Cancelled` and removed; the already-sent
    /// envelope is not recalled.
    pub fn cancel(&self, id: MessageId) {
        if let Some(outstanding) = self.state.pending.lock().remove(&id) {
            if let Completion::Single(tx) = outstanding.completion {
                let _ = tx.send(Err(CorrelationError::Cancelled(id)));
            }
        }
    }

    /// Number of outstanding records.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.state.pending.lock().len()
    }

    /// Spawns the reaper task.
    ///
    /// Sweep failures never propagate; the task runs until the shutdown
    /// signal flips.
    #[must_use]
    pub fn spawn_reaper(&self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        let clock = Arc::clone(&self.clock);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(REAP_INTERVAL);
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        state.sweep(clock.now());
                    }
                }
            }
            debug!("correlation reaper stopped");
        })
    }
}
