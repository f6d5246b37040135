//! Entity manager properties: at-most-once creation, conflict resolution,
//! retry bounds, known-set monotonicity.

mod common;

use async_trait::async_trait;
use nimbus_runtime::transport::{
    EntityDescriptor, InMemoryTransport, MessageReceiver, MessageSender, Transport,
    TransportError,
};
use nimbus_runtime::{BusConfig, EntityManager, RetryPolicy};
use nimbus_types::{QueuePath, SubscriptionKey, TopicPath};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Wraps the in-memory transport, injecting failures into create calls.
struct FaultyTransport {
    inner: InMemoryTransport,
    conflict_once: AtomicBool,
    transient_failures: AtomicU32,
}

impl FaultyTransport {
    fn new(conflict_once: bool, transient_failures: u32) -> Self {
        Self {
            inner: InMemoryTransport::new(),
            conflict_once: AtomicBool::new(conflict_once),
            transient_failures: AtomicU32::new(transient_failures),
        }
    }
}

#[async_trait]
impl Transport for FaultyTransport {
    async fn create_queue(
        &self,
        path: &QueuePath,
        descriptor: &EntityDescriptor,
    ) -> Result<(), TransportError> {
        if self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(TransportError::Transient("broker hiccup".into()));
        }
        self.inner.create_queue(path, descriptor).await
    }

    async fn create_topic(
        &self,
        path: &TopicPath,
        descriptor: &EntityDescriptor,
    ) -> Result<(), TransportError> {
        if self.conflict_once.swap(false, Ordering::SeqCst) {
            // The broker accepted the entity but reports the racing
            // create still in progress.
            let _ = self.inner.create_topic(path, descriptor).await;
            return Err(TransportError::Conflict(path.to_string()));
        }
        self.inner.create_topic(path, descriptor).await
    }

    async fn create_subscription(
        &self,
        key: &SubscriptionKey,
        descriptor: &EntityDescriptor,
    ) -> Result<(), TransportError> {
        self.inner.create_subscription(key, descriptor).await
    }

    async fn queue_exists(&self, path: &QueuePath) -> Result<bool, TransportError> {
        self.inner.queue_exists(path).await
    }

    async fn topic_exists(&self, path: &TopicPath) -> Result<bool, TransportError> {
        self.inner.topic_exists(path).await
    }

    async fn subscription_exists(&self, key: &SubscriptionKey) -> Result<bool, TransportError> {
        self.inner.subscription_exists(key).await
    }

    async fn list_queues(&self) -> Result<Vec<QueuePath>, TransportError> {
        self.inner.list_queues().await
    }

    async fn list_topics(&self) -> Result<Vec<TopicPath>, TransportError> {
        self.inner.list_topics().await
    }

    async fn list_subscriptions(&self) -> Result<Vec<SubscriptionKey>, TransportError> {
        self.inner.list_subscriptions().await
    }

    fn queue_sender(&self, path: &QueuePath) -> Arc<dyn MessageSender> {
        self.inner.queue_sender(path)
    }

    fn topic_sender(&self, path: &TopicPath) -> Arc<dyn MessageSender> {
        self.inner.topic_sender(path)
    }

    fn queue_receiver(&self, path: &QueuePath) -> Arc<dyn MessageReceiver> {
        self.inner.queue_receiver(path)
    }

    fn subscription_receiver(&self, key: &SubscriptionKey) -> Arc<dyn MessageReceiver> {
        self.inner.subscription_receiver(key)
    }
}

fn manager_over(transport: Arc<dyn Transport>) -> EntityManager {
    EntityManager::new(
        transport,
        EntityDescriptor::from_config(&BusConfig::default()),
        RetryPolicy::default(),
        Duration::from_secs(5),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_ensure_queue_creates_exactly_once() {
    let transport = Arc::new(FaultyTransport::new(false, 0));
    let manager = Arc::new(manager_over(Arc::clone(&transport) as Arc<dyn Transport>));
    let path = QueuePath::new("orders.q");

    let mut joins = Vec::new();
    for _ in 0..10 {
        let manager = Arc::clone(&manager);
        let path = path.clone();
        joins.push(tokio::spawn(async move {
            manager.ensure_queue(&path).await
        }));
    }
    for join in joins {
        join.await.unwrap().unwrap();
    }

    assert_eq!(transport.inner.create_calls("orders.q"), 1);
    assert!(manager.is_known_queue(&path));
}

#[tokio::test(flavor = "multi_thread")]
async fn conflicting_create_resolves_via_probe() {
    let transport = Arc::new(FaultyTransport::new(true, 0));
    let manager = Arc::new(manager_over(Arc::clone(&transport) as Arc<dyn Transport>));
    let path = TopicPath::new("t1");

    let mut joins = Vec::new();
    for _ in 0..10 {
        let manager = Arc::clone(&manager);
        let path = path.clone();
        joins.push(tokio::spawn(async move {
            manager.ensure_topic(&path).await
        }));
    }
    for join in joins {
        join.await.unwrap().unwrap();
    }

    assert!(transport.inner.create_calls("t1") <= 2);
    assert!(manager.is_known_topic(&path));
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_with_backoff() {
    let transport = Arc::new(FaultyTransport::new(false, 2));
    let manager = manager_over(Arc::clone(&transport) as Arc<dyn Transport>);
    let path = QueuePath::new("flaky.q");

    manager.ensure_queue(&path).await.unwrap();
    assert!(manager.is_known_queue(&path));
}

#[tokio::test(start_paused = true)]
async fn retry_budget_is_bounded() {
    // More failures than the budget: creation must surface a typed error
    // after five attempts.
    let transport = Arc::new(FaultyTransport::new(false, u32::MAX));
    let manager = manager_over(Arc::clone(&transport) as Arc<dyn Transport>);

    let err = manager
        .ensure_queue(&QueuePath::new("doomed.q"))
        .await
        .unwrap_err();

    match err {
        nimbus_runtime::EntityError::CreationFailed {
            path, retry_count, ..
        } => {
            assert_eq!(path, "doomed.q");
            assert_eq!(retry_count, 5);
        }
        other => panic!("expected CreationFailed, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn known_set_is_monotonic() {
    let transport = Arc::new(FaultyTransport::new(false, 0));
    let manager = manager_over(Arc::clone(&transport) as Arc<dyn Transport>);
    let path = QueuePath::new("sticky.q");

    manager.ensure_queue(&path).await.unwrap();
    assert!(manager.is_known_queue(&path));

    for _ in 0..100 {
        manager.ensure_queue(&path).await.unwrap();
        assert!(manager.is_known_queue(&path));
    }
    assert_eq!(transport.inner.create_calls("sticky.q"), 1);
}
