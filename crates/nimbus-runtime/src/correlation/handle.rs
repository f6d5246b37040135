//! Awaitable handles for pending requests.

use super::correlator::{CorrelatorState, ReplyResult};
use super::error::CorrelationError;
use nimbus_message::BusMessage;
use nimbus_types::MessageId;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

/// The caller's side of a pending request: awaits exactly one reply.
pub struct ResponseHandle<R> {
    id: MessageId,
    rx: oneshot::Receiver<ReplyResult>,
    state: Arc<CorrelatorState>,
    _marker: PhantomData<fn() -> R>,
}

impl<R> ResponseHandle<R> {
    pub(crate) fn new(
        id: MessageId,
        rx: oneshot::Receiver<ReplyResult>,
        state: Arc<CorrelatorState>,
    ) -> Self {
        Self {
            id,
            rx,
            state,
            _marker: PhantomData,
        }
    }

    /// Id of the request this handle is waiting on.
    #[must_use]
    pub fn message_id(&self) -> MessageId {
        self.id
    }

    /// Abandons the request. The record is removed; the sent envelope is
    /// not recalled.
    pub fn cancel(self) {
        self.state.remove(self.id);
    }
}

impl<R: BusMessage> ResponseHandle<R> {
    /// Waits for the reply, up to `timeout`.
    ///
    /// # Errors
    ///
    /// - [`CorrelationError::Timeout`] when the deadline passes first; the
    ///   correlation record is removed.
    /// - [`CorrelationError::RemoteFault`] when the reply was faulted.
    /// - [`CorrelationError::ResponsePayload`] when the reply cannot be
    ///   decoded into `R`.
    /// - [`CorrelationError::Cancelled`] when the request was cancelled.
    pub async fn wait(self, timeout: Duration) -> Result<R, CorrelationError> {
        let Self { id, rx, state, .. } = self;
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Ok(value))) => serde_json::from_value(value)
                .map_err(|source| CorrelationError::ResponsePayload { id, source }),
            Ok(Ok(Err(err))) => Err(err),
            Ok(Err(_)) => Err(CorrelationError::Cancelled(id)),
            Err(_) => {
                state.remove(id);
                Err(CorrelationError::Timeout(id))
            }
        }
    }
}

/// The caller's side of a multicast request: collects every reply that
/// arrives inside the window.
pub struct MulticastHandle<R> {
    id: MessageId,
    rx: mpsc::UnboundedReceiver<ReplyResult>,
    state: Arc<CorrelatorState>,
    _marker: PhantomData<fn() -> R>,
}

impl<R> MulticastHandle<R> {
    pub(crate) fn new(
        id: MessageId,
        rx: mpsc::UnboundedReceiver<ReplyResult>,
        state: Arc<CorrelatorState>,
    ) -> Self {
        Self {
            id,
            rx,
            state,
            _marker: PhantomData,
        }
    }

    /// Id of the request this handle is collecting for.
    #[must_use]
    pub fn message_id(&self) -> MessageId {
        self.id
    }

    /// Abandons the request. The record is removed; the sent envelope is
    /// not recalled.
    pub fn cancel(self) {
        self.state.remove(self.id);
    }
}

impl<R: BusMessage> MulticastHandle<R> {
    /// Collects replies until the window closes, returning them in
    /// arrival order.
    ///
    /// Undecodable or faulted replies are logged and skipped; the
    /// surviving responses are returned.
    pub async fn collect(self, window: Duration) -> Vec<R> {
        let Self {
            id, mut rx, state, ..
        } = self;
        let deadline = tokio::time::Instant::now() + window;
        let mut responses = Vec::new();

        loop {
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Some(Ok(value))) => match serde_json::from_value(value) {
                    Ok(response) => responses.push(response),
                    Err(err) => {
                        warn!(request = %id, error = %err, "multicast reply payload dropped");
                    }
                },
                Ok(Some(Err(err))) => {
                    warn!(request = %id, error = %err, "multicast reply carried a fault");
                }
                // Sender dropped: the reaper removed the record.
                Ok(None) => break,
                // Window closed.
                Err(_) => break,
            }
        }

        state.remove(id);
        responses
    }
}
