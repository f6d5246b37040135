//! Lazy, idempotent transport entity creation.

use super::error::EntityError;
use super::retry::RetryPolicy;
use crate::transport::{EntityDescriptor, Transport, TransportError};
use nimbus_types::{ErrorCode, QueuePath, SubscriptionKey, TopicPath};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, error};

enum EntityRef<'a> {
    Queue(&'a QueuePath),
    Topic(&'a TopicPath),
    Subscription(&'a SubscriptionKey),
}

impl EntityRef<'_> {
    fn known_key(&self) -> String {
        match self {
            Self::Queue(path) => path.to_string(),
            Self::Topic(path) => path.to_string(),
            Self::Subscription(key) => key.to_string(),
        }
    }

    fn lock_key(&self) -> String {
        match self {
            Self::Queue(path) => format!("queue:{path}"),
            Self::Topic(path) => format!("topic:{path}"),
            Self::Subscription(key) => format!("subscription:{key}"),
        }
    }
}

/// Provisions queues, topics, and subscriptions exactly once per process,
/// safely under concurrent callers.
///
/// The manager keeps per-connection known-sets (warmed lazily by one bulk
/// list call) and serializes creation per path with a double-checked lock:
///
/// 1. Known-set hit: return immediately.
/// 2. Acquire the path's lock, re-check the known-set.
/// 3. Create against the transport; classify the outcome. "Already
///    exists" counts as success; "conflicting operation in progress" is
///    resolved by probing for the entity; transient failures retry with
///    linear backoff.
/// 4. Mark the entity known and release the lock.
///
/// Entities once known stay known for the lifetime of the manager.
/// Creation is not cancellable; callers rely on the configured default
/// timeout for the warm-up and the bounded retry budget for creates.
pub struct EntityManager {
    transport: Arc<dyn Transport>,
    descriptor: EntityDescriptor,
    retry: RetryPolicy,
    default_timeout: Duration,
    known_queues: RwLock<HashSet<String>>,
    known_topics: RwLock<HashSet<String>>,
    known_subscriptions: RwLock<HashSet<String>>,
    path_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    warmup: OnceCell<()>,
}

impl EntityManager {
    /// Creates a manager for one transport connection.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        descriptor: EntityDescriptor,
        retry: RetryPolicy,
        default_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            descriptor,
            retry,
            default_timeout,
            known_queues: RwLock::default(),
            known_topics: RwLock::default(),
            known_subscriptions: RwLock::default(),
            path_locks: Mutex::default(),
            warmup: OnceCell::new(),
        }
    }

    /// Ensures a queue exists.
    ///
    /// # Errors
    ///
    /// [`EntityError::CreationFailed`] after the retry budget is
    /// exhausted; [`EntityError::Timeout`] when the first-use warm-up
    /// exceeds the default timeout.
    pub async fn ensure_queue(&self, path: &QueuePath) -> Result<(), EntityError> {
        self.ensure(EntityRef::Queue(path)).await
    }

    /// Ensures a topic exists.
    pub async fn ensure_topic(&self, path: &TopicPath) -> Result<(), EntityError> {
        self.ensure(EntityRef::Topic(path)).await
    }

    /// Ensures a subscription exists, creating the owning topic first.
    pub async fn ensure_subscription(&self, key: &SubscriptionKey) -> Result<(), EntityError> {
        self.ensure_topic(key.topic()).await?;
        self.ensure(EntityRef::Subscription(key)).await
    }

    /// Returns `true` when the queue is in the known-set.
    #[must_use]
    pub fn is_known_queue(&self, path: &QueuePath) -> bool {
        self.known_queues.read().contains(path.as_str())
    }

    /// Returns `true` when the topic is in the known-set.
    #[must_use]
    pub fn is_known_topic(&self, path: &TopicPath) -> bool {
        self.known_topics.read().contains(path.as_str())
    }

    /// Returns `true` when the subscription is in the known-set.
    #[must_use]
    pub fn is_known_subscription(&self, key: &SubscriptionKey) -> bool {
        self.known_subscriptions.read().contains(&key.to_string())
    }

    async fn ensure(&self, entity: EntityRef<'_>) -> Result<(), EntityError> {
        self.warm_up().await?;

        let key = entity.known_key();
        if self.is_marked(&entity, &key) {
            return Ok(());
        }

        let lock = self.lock_for(&entity.lock_key());
        let _guard = lock.lock().await;

        if self.is_marked(&entity, &key) {
            return Ok(());
        }

        self.create_with_retry(&entity, &key).await?;
        self.mark(&entity, key);
        Ok(())
    }

    fn set_for(&self, entity: &EntityRef<'_>) -> &RwLock<HashSet<String>> {
        match entity {
            EntityRef::Queue(_) => &self.known_queues,
            EntityRef::Topic(_) => &self.known_topics,
            EntityRef::Subscription(_) => &self.known_subscriptions,
        }
    }

    fn is_marked(&self, entity: &EntityRef<'_>, key: &str) -> bool {
        self.set_for(entity).read().contains(key)
    }

    fn mark(&self, entity: &EntityRef<'_>, key: String) {
        self.set_for(entity).write().insert(key);
    }

    fn lock_for(&self, lock_key: &str) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(
            self.path_locks
                .lock()
                .entry(lock_key.to_string())
                .or_default(),
        )
    }

    async fn create(&self, entity: &EntityRef<'_>) -> Result<(), TransportError> {
        match entity {
            EntityRef::Queue(path) => self.transport.create_queue(path, &self.descriptor).await,
            EntityRef::Topic(path) => self.transport.create_topic(path, &self.descriptor).await,
            EntityRef::Subscription(key) => {
                self.transport
                    .create_subscription(key, &self.descriptor)
                    .await
            }
        }
    }

    async fn exists(&self, entity: &EntityRef<'_>) -> Result<bool, TransportError> {
        match entity {
            EntityRef::Queue(path) => self.transport.queue_exists(path).await,
            EntityRef::Topic(path) => self.transport.topic_exists(path).await,
            EntityRef::Subscription(key) => self.transport.subscription_exists(key).await,
        }
    }

    async fn create_with_retry(
        &self,
        entity: &EntityRef<'_>,
        key: &str,
    ) -> Result<(), EntityError> {
        let mut attempt: u32 = 1;
        loop {
            match self.create(entity).await {
                Ok(()) => {
                    debug!(path = key, "entity created");
                    return Ok(());
                }
                Err(TransportError::AlreadyExists(_)) => {
                    debug!(path = key, "entity already existed");
                    return Ok(());
                }
                Err(conflict @ TransportError::Conflict(_)) => {
                    // A racing creator holds the entity; trust the probe.
                    if matches!(self.exists(entity).await, Ok(true)) {
                        debug!(path = key, "entity created by racing caller");
                        return Ok(());
                    }
                    error!(path = key, attempt, "conflicting create did not materialize");
                    return Err(EntityError::CreationFailed {
                        path: key.to_string(),
                        retry_count: attempt,
                        source: conflict,
                    });
                }
                Err(err) if err.is_recoverable() && attempt < self.retry.max_attempts() => {
                    error!(path = key, attempt, error = %err, "entity creation failed, backing off");
                    tokio::time::sleep(self.retry.delay_for(attempt)).await;
                    attempt += 1;
                }
                Err(err) => {
                    error!(path = key, attempt, error = %err, "entity creation failed");
                    return Err(EntityError::CreationFailed {
                        path: key.to_string(),
                        retry_count: attempt,
                        source: err,
                    });
                }
            }
        }
    }

    async fn warm_up(&self) -> Result<(), EntityError> {
        self.warmup
            .get_or_try_init(|| async {
                match tokio::time::timeout(self.default_timeout, self.fetch_known_sets()).await {
                    Ok(result) => result,
                    Err(_) => Err(EntityError::Timeout(self.default_timeout)),
                }
            })
            .await
            .map(|_| ())
    }

    async fn fetch_known_sets(&self) -> Result<(), EntityError> {
        let queues = self
            .transport
            .list_queues()
            .await
            .map_err(|source| EntityError::ListFailed { source })?;
        let topics = self
            .transport
            .list_topics()
            .await
            .map_err(|source| EntityError::ListFailed { source })?;
        let subscriptions = self
            .transport
            .list_subscriptions()
            .await
            .map_err(|source| EntityError::ListFailed { source })?;

        self.known_queues
            .write()
            .extend(queues.iter().map(ToString::to_string));
        self.known_topics
            .write()
            .extend(topics.iter().map(ToString::to_string));
        self.known_subscriptions
            .write()
            .extend(subscriptions.iter().map(ToString::to_string));

        debug!(
            queues = queues.len(),
            topics = topics.len(),
            subscriptions = subscriptions.len(),
            "known-set warm-up complete"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::InMemoryTransport;
    use crate::BusConfig;

    fn manager(transport: Arc<dyn Transport>) -> EntityManager {
        EntityManager::new(
            transport,
            EntityDescriptor::from_config(&BusConfig::default()),
            RetryPolicy::default(),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn ensure_queue_creates_once() {
        let transport = InMemoryTransport::new();
        let manager = manager(Arc::new(transport.clone()));
        let path = QueuePath::new("q1");

        manager.ensure_queue(&path).await.unwrap();
        manager.ensure_queue(&path).await.unwrap();
        manager.ensure_queue(&path).await.unwrap();

        assert_eq!(transport.create_calls("q1"), 1);
        assert!(manager.is_known_queue(&path));
    }

    #[tokio::test]
    async fn ensure_subscription_creates_owning_topic() {
        let transport = InMemoryTransport::new();
        let manager = manager(Arc::new(transport.clone()));
        let key = SubscriptionKey::new(TopicPath::new("t1"), "billing");

        manager.ensure_subscription(&key).await.unwrap();

        assert!(manager.is_known_topic(&TopicPath::new("t1")));
        assert!(manager.is_known_subscription(&key));
        assert_eq!(transport.create_calls("t1"), 1);
        assert_eq!(transport.create_calls("t1/billing"), 1);
    }

    #[tokio::test]
    async fn warm_up_pre_populates_known_sets() {
        let transport = InMemoryTransport::new();
        let descriptor = EntityDescriptor::from_config(&BusConfig::default());
        transport
            .create_queue(&QueuePath::new("existing"), &descriptor)
            .await
            .unwrap();

        let manager = manager(Arc::new(transport.clone()));
        manager.ensure_queue(&QueuePath::new("existing")).await.unwrap();

        // Warm-up found it; no second create reached the transport.
        assert_eq!(transport.create_calls("existing"), 1);
    }

    #[tokio::test]
    async fn already_exists_marks_known() {
        // Two managers on the same transport: the second one's create
        // races an entity the first already made.
        let transport = InMemoryTransport::new();
        let first = manager(Arc::new(transport.clone()));
        let path = QueuePath::new("shared");
        first.ensure_queue(&path).await.unwrap();

        let second = manager(Arc::new(transport.clone()));
        second.ensure_queue(&path).await.unwrap();
        assert!(second.is_known_queue(&path));
    }
}
