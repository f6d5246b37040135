//! Receive loops driving dispatch.
//!
//! One pump task per hosted queue or subscription: receive, dispatch,
//! translate the outcome into a transport complete or abandon. The pump
//! also enforces the delivery-attempt cap (overflow goes to the
//! dead-letter queue) and drops or dead-letters envelopes that expired on
//! the wire. A separate, simpler pump feeds reply traffic to the
//! correlator.

use crate::correlation::RequestCorrelator;
use crate::dispatch::Dispatcher;
use crate::transport::{Delivery, MessageReceiver, MessageSender};
use nimbus_types::{Clock, ErrorCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Backoff applied when a receive fails transiently.
const RECEIVE_BACKOFF: Duration = Duration::from_secs(1);

pub(crate) struct MessagePump {
    label: String,
    receiver: Arc<dyn MessageReceiver>,
    dispatcher: Arc<dyn Dispatcher>,
    dead_letter: Arc<dyn MessageSender>,
    max_delivery_attempts: u32,
    dead_letter_expired: bool,
    clock: Arc<dyn Clock>,
    shutdown: watch::Receiver<bool>,
}

impl MessagePump {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        label: String,
        receiver: Arc<dyn MessageReceiver>,
        dispatcher: Arc<dyn Dispatcher>,
        dead_letter: Arc<dyn MessageSender>,
        max_delivery_attempts: u32,
        dead_letter_expired: bool,
        clock: Arc<dyn Clock>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            label,
            receiver,
            dispatcher,
            dead_letter,
            max_delivery_attempts,
            dead_letter_expired,
            clock,
            shutdown,
        }
    }

    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        info!(pump = %self.label, "message pump started");
        loop {
            tokio::select! {
                biased;

                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }

                delivery = self.receiver.receive() => {
                    match delivery {
                        Ok(delivery) => self.process(delivery).await,
                        Err(err) if err.is_recoverable() => {
                            warn!(pump = %self.label, error = %err, "receive failed, backing off");
                            tokio::time::sleep(RECEIVE_BACKOFF).await;
                        }
                        Err(err) => {
                            error!(pump = %self.label, error = %err, "receive failed, pump stopping");
                            break;
                        }
                    }
                }
            }
        }
        info!(pump = %self.label, "message pump stopped");
    }

    async fn process(&self, delivery: Delivery) {
        if delivery.envelope.is_expired(self.clock.now()) {
            if self.dead_letter_expired {
                self.dead_letter(delivery, "expired").await;
            } else {
                debug!(message = %delivery.envelope.message_id, "expired message dropped");
                let _ = self.receiver.complete(delivery).await;
            }
            return;
        }

        match self.dispatcher.dispatch(delivery.envelope.clone()).await {
            Ok(()) => {
                if let Err(err) = self.receiver.complete(delivery).await {
                    warn!(pump = %self.label, error = %err, "complete failed");
                }
            }
            Err(err) => {
                warn!(
                    pump = %self.label,
                    message = %delivery.envelope.message_id,
                    attempt = delivery.envelope.delivery_attempt,
                    code = err.code(),
                    error = %err,
                    "dispatch failed"
                );
                if delivery.envelope.delivery_attempt >= self.max_delivery_attempts {
                    self.dead_letter(delivery, "attempts exhausted").await;
                } else if let Err(err) = self.receiver.abandon(delivery).await {
                    warn!(pump = %self.label, error = %err, "abandon failed");
                }
            }
        }
    }

    async fn dead_letter(&self, delivery: Delivery, reason: &str) {
        error!(
            pump = %self.label,
            message = %delivery.envelope.message_id,
            reason,
            "dead-lettering message"
        );
        match self.dead_letter.send(delivery.envelope.clone()).await {
            Ok(()) => {
                let _ = self.receiver.complete(delivery).await;
            }
            Err(err) => {
                warn!(pump = %self.label, error = %err, "dead-letter send failed");
                let _ = self.receiver.abandon(delivery).await;
            }
        }
    }
}

/// Feeds the instance's reply queue into the correlator.
pub(crate) struct ReplyPump {
    label: String,
    receiver: Arc<dyn MessageReceiver>,
    correlator: Arc<RequestCorrelator>,
    shutdown: watch::Receiver<bool>,
}

impl ReplyPump {
    pub(crate) fn new(
        label: String,
        receiver: Arc<dyn MessageReceiver>,
        correlator: Arc<RequestCorrelator>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            label,
            receiver,
            correlator,
            shutdown,
        }
    }

    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        info!(pump = %self.label, "reply pump started");
        loop {
            tokio::select! {
                biased;

                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }

                delivery = self.receiver.receive() => {
                    match delivery {
                        Ok(delivery) => {
                            self.correlator.try_complete(&delivery.envelope);
                            let _ = self.receiver.complete(delivery).await;
                        }
                        Err(err) if err.is_recoverable() => {
                            warn!(pump = %self.label, error = %err, "receive failed, backing off");
                            tokio::time::sleep(RECEIVE_BACKOFF).await;
                        }
                        Err(err) => {
                            error!(pump = %self.label, error = %err, "receive failed, pump stopping");
                            break;
                        }
                    }
                }
            }
        }
        info!(pump = %self.label, "reply pump stopped");
    }
}
