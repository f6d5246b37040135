//! In-process reference transport.
//!
//! Queues are VecDeques guarded by a mutex with a `Notify` for wakeups;
//! topics fan out to their subscriptions' queues at send time. Suitable for
//! tests and single-process deployments; a distributed deployment plugs in
//! a broker-backed driver instead.
//!
//! The transport also counts `create_*` calls per path so tests can assert
//! the entity manager's at-most-once creation protocol.

use super::{Delivery, EntityDescriptor, MessageReceiver, MessageSender, Transport, TransportError};
use async_trait::async_trait;
use nimbus_message::Envelope;
use nimbus_types::{QueuePath, SubscriptionKey, TopicPath};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, warn};

#[derive(Default)]
struct MessageQueue {
    messages: Mutex<VecDeque<Envelope>>,
    notify: Notify,
}

impl MessageQueue {
    fn push(&self, envelope: Envelope) {
        self.messages.lock().push_back(envelope);
        self.notify.notify_one();
    }

    async fn pop(&self) -> Envelope {
        loop {
            {
                let mut messages = self.messages.lock();
                if let Some(envelope) = messages.pop_front() {
                    // Re-arm the notify when more work is queued, so a
                    // second competing receiver is not left sleeping.
                    if !messages.is_empty() {
                        self.notify.notify_one();
                    }
                    return envelope;
                }
            }
            self.notify.notified().await;
        }
    }
}

#[derive(Default)]
struct Topic {
    subscriptions: Mutex<HashMap<String, Arc<MessageQueue>>>,
}

#[derive(Default)]
struct State {
    queues: Mutex<HashMap<String, Arc<MessageQueue>>>,
    topics: Mutex<HashMap<String, Arc<Topic>>>,
    create_calls: Mutex<HashMap<String, u32>>,
}

impl State {
    fn queue(&self, path: &str) -> Arc<MessageQueue> {
        Arc::clone(
            self.queues
                .lock()
                .entry(path.to_string())
                .or_default(),
        )
    }

    fn topic(&self, path: &str) -> Arc<Topic> {
        Arc::clone(
            self.topics
                .lock()
                .entry(path.to_string())
                .or_default(),
        )
    }

    fn count_create(&self, path: &str) {
        *self
            .create_calls
            .lock()
            .entry(path.to_string())
            .or_insert(0) += 1;
    }
}

/// In-memory [`Transport`] implementation.
#[derive(Default, Clone)]
pub struct InMemoryTransport {
    state: Arc<State>,
}

impl InMemoryTransport {
    /// Creates an empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `create_*` calls observed for a path or subscription key.
    #[must_use]
    pub fn create_calls(&self, path: &str) -> u32 {
        self.state
            .create_calls
            .lock()
            .get(path)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn create_queue(
        &self,
        path: &QueuePath,
        _descriptor: &EntityDescriptor,
    ) -> Result<(), TransportError> {
        self.state.count_create(path.as_str());
        let mut queues = self.state.queues.lock();
        if queues.contains_key(path.as_str()) {
            return Err(TransportError::AlreadyExists(path.to_string()));
        }
        queues.insert(path.to_string(), Arc::default());
        debug!(path = %path, "queue created");
        Ok(())
    }

    async fn create_topic(
        &self,
        path: &TopicPath,
        _descriptor: &EntityDescriptor,
    ) -> Result<(), TransportError> {
        self.state.count_create(path.as_str());
        let mut topics = self.state.topics.lock();
        if topics.contains_key(path.as_str()) {
            return Err(TransportError::AlreadyExists(path.to_string()));
        }
        topics.insert(path.to_string(), Arc::default());
        debug!(path = %path, "topic created");
        Ok(())
    }

    async fn create_subscription(
        &self,
        key: &SubscriptionKey,
        _descriptor: &EntityDescriptor,
    ) -> Result<(), TransportError> {
        self.state.count_create(&key.to_string());
        let topic = {
            let topics = self.state.topics.lock();
            topics
                .get(key.topic().as_str())
                .cloned()
                .ok_or_else(|| TransportError::NotFound(key.topic().to_string()))?
        };
        let mut subscriptions = topic.subscriptions.lock();
        if subscriptions.contains_key(key.name()) {
            return Err(TransportError::AlreadyExists(key.to_string()));
        }
        subscriptions.insert(key.name().to_string(), Arc::default());
        debug!(key = %key, "subscription created");
        Ok(())
    }

    async fn queue_exists(&self, path: &QueuePath) -> Result<bool, TransportError> {
        Ok(self.state.queues.lock().contains_key(path.as_str()))
    }

    async fn topic_exists(&self, path: &TopicPath) -> Result<bool, TransportError> {
        Ok(self.state.topics.lock().contains_key(path.as_str()))
    }

    async fn subscription_exists(&self, key: &SubscriptionKey) -> Result<bool, TransportError> {
        let topic = self.state.topics.lock().get(key.topic().as_str()).cloned();
        Ok(topic
            .map(|t| t.subscriptions.lock().contains_key(key.name()))
            .unwrap_or(false))
    }

    async fn list_queues(&self) -> Result<Vec<QueuePath>, TransportError> {
        Ok(self
            .state
            .queues
            .lock()
            .keys()
            .map(|path| QueuePath::new(path.as_str()))
            .collect())
    }

    async fn list_topics(&self) -> Result<Vec<TopicPath>, TransportError> {
        Ok(self
            .state
            .topics
            .lock()
            .keys()
            .map(|path| TopicPath::new(path.as_str()))
            .collect())
    }

    async fn list_subscriptions(&self) -> Result<Vec<SubscriptionKey>, TransportError> {
        let topics = self.state.topics.lock();
        let mut keys = Vec::new();
        for (path, topic) in topics.iter() {
            for name in topic.subscriptions.lock().keys() {
                keys.push(SubscriptionKey::new(
                    TopicPath::new(path.as_str()),
                    name.as_str(),
                ));
            }
        }
        Ok(keys)
    }

    fn queue_sender(&self, path: &QueuePath) -> Arc<dyn MessageSender> {
        Arc::new(QueueSender {
            state: Arc::clone(&self.state),
            path: path.clone(),
        })
    }

    fn topic_sender(&self, path: &TopicPath) -> Arc<dyn MessageSender> {
        Arc::new(TopicSender {
            state: Arc::clone(&self.state),
            path: path.clone(),
        })
    }

    fn queue_receiver(&self, path: &QueuePath) -> Arc<dyn MessageReceiver> {
        Arc::new(QueueReceiver {
            queue: self.state.queue(path.as_str()),
        })
    }

    fn subscription_receiver(&self, key: &SubscriptionKey) -> Arc<dyn MessageReceiver> {
        let topic = self.state.topic(key.topic().as_str());
        let queue = Arc::clone(
            topic
                .subscriptions
                .lock()
                .entry(key.name().to_string())
                .or_default(),
        );
        Arc::new(QueueReceiver { queue })
    }
}

struct QueueSender {
    state: Arc<State>,
    path: QueuePath,
}

#[async_trait]
impl MessageSender for QueueSender {
    async fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        self.state.queue(self.path.as_str()).push(envelope);
        Ok(())
    }
}

struct TopicSender {
    state: Arc<State>,
    path: TopicPath,
}

#[async_trait]
impl MessageSender for TopicSender {
    async fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        let topic = self.state.topic(self.path.as_str());
        let subscriptions: Vec<Arc<MessageQueue>> =
            topic.subscriptions.lock().values().cloned().collect();

        if subscriptions.is_empty() {
            warn!(topic = %self.path, "event dropped (no subscriptions)");
            return Ok(());
        }
        for queue in subscriptions {
            queue.push(envelope.clone());
        }
        Ok(())
    }
}

struct QueueReceiver {
    queue: Arc<MessageQueue>,
}

#[async_trait]
impl MessageReceiver for QueueReceiver {
    async fn receive(&self) -> Result<Delivery, TransportError> {
        let mut envelope = self.queue.pop().await;
        envelope.record_delivery();
        Ok(Delivery { envelope })
    }

    async fn complete(&self, _delivery: Delivery) -> Result<(), TransportError> {
        Ok(())
    }

    async fn abandon(&self, delivery: Delivery) -> Result<(), TransportError> {
        self.queue.push(delivery.envelope);
        Ok(())
    }
}
