//! Transport abstraction.
//!
//! The bus talks to its backing broker through three seams: the namespace
//! operations on [`Transport`] (create, probe, list), [`MessageSender`]s
//! bound to a path, and [`MessageReceiver`]s delivering envelopes with
//! ack/nack semantics. Wire-level framing lives entirely behind these
//! traits; the core never sees bytes.
//!
//! Acknowledgement is modeled by ownership: a received [`Delivery`] must be
//! given back to the receiver, either via `complete` (done, remove it) or
//! `abandon` (failed, make it deliverable again). The transport increments
//! the envelope's delivery attempt each time it hands the message out.

mod error;
mod in_memory;

pub use error::TransportError;
pub use in_memory::InMemoryTransport;

use crate::config::BusConfig;
use async_trait::async_trait;
use nimbus_message::Envelope;
use nimbus_types::{QueuePath, SubscriptionKey, TopicPath};
use std::sync::Arc;
use std::time::Duration;

/// Creation parameters for queues, topics, and subscriptions.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    /// Default time-to-live for messages on the entity.
    pub default_message_time_to_live: Duration,
    /// Idle time after which the entity may be deleted, if any.
    pub auto_delete_on_idle: Option<Duration>,
    /// Peek-lock duration for receives.
    pub lock_duration: Duration,
    /// Whether expired messages are dead-lettered by the transport.
    pub enable_dead_lettering_on_message_expiration: bool,
}

impl EntityDescriptor {
    /// Derives a descriptor from the bus configuration.
    #[must_use]
    pub fn from_config(config: &BusConfig) -> Self {
        Self {
            default_message_time_to_live: config.default_message_time_to_live,
            auto_delete_on_idle: config.auto_delete_on_idle,
            lock_duration: config.default_message_lock_duration,
            enable_dead_lettering_on_message_expiration: config
                .enable_dead_lettering_on_message_expiration,
        }
    }
}

/// An envelope checked out from a receiver, pending ack or nack.
#[derive(Debug)]
pub struct Delivery {
    /// The delivered envelope, with `delivery_attempt` already bumped.
    pub envelope: Envelope,
}

/// Sends envelopes to one queue or topic.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Sends one envelope.
    async fn send(&self, envelope: Envelope) -> Result<(), TransportError>;
}

/// Receives envelopes from one queue or subscription.
#[async_trait]
pub trait MessageReceiver: Send + Sync {
    /// Waits for the next delivery.
    async fn receive(&self) -> Result<Delivery, TransportError>;

    /// Acknowledges a delivery: the message is done and removed.
    async fn complete(&self, delivery: Delivery) -> Result<(), TransportError>;

    /// Rejects a delivery: the message becomes deliverable again.
    async fn abandon(&self, delivery: Delivery) -> Result<(), TransportError>;
}

/// A connection to the backing broker.
///
/// Entity creation must classify failures per [`TransportError`]: the
/// entity manager's idempotence protocol depends on distinguishing
/// `AlreadyExists` and `Conflict` from genuinely transient failures.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Creates a queue.
    async fn create_queue(
        &self,
        path: &QueuePath,
        descriptor: &EntityDescriptor,
    ) -> Result<(), TransportError>;

    /// Creates a topic.
    async fn create_topic(
        &self,
        path: &TopicPath,
        descriptor: &EntityDescriptor,
    ) -> Result<(), TransportError>;

    /// Creates a subscription on an existing topic.
    async fn create_subscription(
        &self,
        key: &SubscriptionKey,
        descriptor: &EntityDescriptor,
    ) -> Result<(), TransportError>;

    /// Probes whether a queue exists.
    async fn queue_exists(&self, path: &QueuePath) -> Result<bool, TransportError>;

    /// Probes whether a topic exists.
    async fn topic_exists(&self, path: &TopicPath) -> Result<bool, TransportError>;

    /// Probes whether a subscription exists.
    async fn subscription_exists(&self, key: &SubscriptionKey) -> Result<bool, TransportError>;

    /// Lists all queues. Used once per connection for known-set warm-up.
    async fn list_queues(&self) -> Result<Vec<QueuePath>, TransportError>;

    /// Lists all topics.
    async fn list_topics(&self) -> Result<Vec<TopicPath>, TransportError>;

    /// Lists all subscriptions.
    async fn list_subscriptions(&self) -> Result<Vec<SubscriptionKey>, TransportError>;

    /// Returns a sender bound to a queue.
    fn queue_sender(&self, path: &QueuePath) -> Arc<dyn MessageSender>;

    /// Returns a sender bound to a topic.
    fn topic_sender(&self, path: &TopicPath) -> Arc<dyn MessageSender>;

    /// Returns a receiver bound to a queue.
    fn queue_receiver(&self, path: &QueuePath) -> Arc<dyn MessageReceiver>;

    /// Returns a receiver bound to a subscription.
    fn subscription_receiver(&self, key: &SubscriptionKey) -> Arc<dyn MessageReceiver>;
}
