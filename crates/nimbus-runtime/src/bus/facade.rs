//! The user-facing bus.

use super::error::BusError;
use super::verifier::KnownMessageTypeVerifier;
use crate::config::BusConfig;
use crate::correlation::RequestCorrelator;
use crate::entity::EntityManager;
use crate::interceptor::{OutboundInterceptorFactory, OutboundPipeline};
use crate::router::Router;
use crate::transport::Transport;
use nimbus_handler::DependencyResolver;
use nimbus_message::{BusMessage, MessageFactory};
use nimbus_types::{Clock, QueuePath};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

pub(super) struct BusInner {
    pub(super) config: BusConfig,
    pub(super) router: Router,
    pub(super) factory: Arc<MessageFactory>,
    pub(super) transport: Arc<dyn Transport>,
    pub(super) entities: Arc<EntityManager>,
    pub(super) correlator: Arc<RequestCorrelator>,
    pub(super) verifier: KnownMessageTypeVerifier,
    pub(super) resolver: Arc<dyn DependencyResolver>,
    pub(super) outbound_factory: OutboundInterceptorFactory,
    pub(super) reply_queue: QueuePath,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) shutdown_tx: watch::Sender<bool>,
    pub(super) tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// A running bus instance.
///
/// Built by [`BusBuilder`](super::BusBuilder); cheap to clone and share.
/// All four operations verify the message type, provision the destination
/// entity lazily, build the envelope, and run the outbound interceptor
/// pipeline around the transport send.
///
/// # Example
///
/// ```ignore
/// let bus = BusBuilder::new("orders", "orders-1")
///     .with_registry(registry)
///     .start()
///     .await?;
///
/// bus.send(&PlaceOrder { order_id: 7 }).await?;
/// let pong: Pong = bus.request(&Ping, None).await?;
/// bus.shutdown().await;
/// ```
#[derive(Clone)]
pub struct Bus {
    inner: Arc<BusInner>,
}

impl Bus {
    pub(super) fn from_inner(inner: BusInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Sends a command to its queue. Fire-and-forget: no response is
    /// awaited.
    ///
    /// # Errors
    ///
    /// [`BusError::UnknownMessageType`] for unregistered types, or an
    /// entity, serialization, interceptor, or transport failure.
    pub async fn send<M: BusMessage>(&self, command: &M) -> Result<(), BusError> {
        let inner = &self.inner;
        inner.verifier.verify_queue(M::TYPE_NAME)?;

        let path = inner.router.queue_for(M::TYPE_NAME);
        inner.entities.ensure_queue(&path).await?;

        let mut envelope = inner.factory.create(command)?;
        let scope = inner.resolver.open_scope();
        let pipeline = OutboundPipeline::new((inner.outbound_factory)(&scope, &envelope));
        let sender = inner.transport.queue_sender(&path);
        pipeline.run_send(&mut envelope, sender.as_ref()).await
    }

    /// Publishes an event to its topic.
    ///
    /// # Errors
    ///
    /// As [`send`](Self::send), against the topic route.
    pub async fn publish<M: BusMessage>(&self, event: &M) -> Result<(), BusError> {
        let inner = &self.inner;
        inner.verifier.verify_topic(M::TYPE_NAME)?;

        let path = inner.router.topic_for(M::TYPE_NAME);
        inner.entities.ensure_topic(&path).await?;

        let mut envelope = inner.factory.create(event)?;
        let scope = inner.resolver.open_scope();
        let pipeline = OutboundPipeline::new((inner.outbound_factory)(&scope, &envelope));
        let sender = inner.transport.topic_sender(&path);
        pipeline.run_send(&mut envelope, sender.as_ref()).await
    }

    /// Sends a request and awaits its correlated response.
    ///
    /// The deadline is `timeout`, or the configured
    /// `default_response_timeout` when `None`.
    ///
    /// # Errors
    ///
    /// [`CorrelationError::Timeout`](crate::CorrelationError::Timeout)
    /// when no reply arrives in time,
    /// [`CorrelationError::RemoteFault`](crate::CorrelationError::RemoteFault)
    /// when the remote handler failed, or any send-side failure.
    pub async fn request<Req, Resp>(
        &self,
        request: &Req,
        timeout: Option<Duration>,
    ) -> Result<Resp, BusError>
    where
        Req: BusMessage,
        Resp: BusMessage,
    {
        let inner = &self.inner;
        inner.verifier.verify_queue(Req::TYPE_NAME)?;
        let timeout = timeout.unwrap_or(inner.config.default_response_timeout);

        let path = inner.router.queue_for(Req::TYPE_NAME);
        inner.entities.ensure_queue(&path).await?;

        let mut envelope = inner
            .factory
            .create_request(request, inner.reply_queue.clone())?;
        let handle = inner
            .correlator
            .record_request::<Resp>(envelope.message_id, inner.clock.now() + timeout);

        {
            let scope = inner.resolver.open_scope();
            let pipeline = OutboundPipeline::new((inner.outbound_factory)(&scope, &envelope));
            let sender = inner.transport.queue_sender(&path);
            if let Err(err) = pipeline.run_request_send(&mut envelope, sender.as_ref()).await {
                handle.cancel();
                return Err(err);
            }
        }

        handle.wait(timeout).await.map_err(BusError::from)
    }

    /// Publishes a request to a topic and collects every reply that
    /// arrives before the window closes.
    ///
    /// # Errors
    ///
    /// Send-side failures only; an empty window is an empty `Vec`, not an
    /// error.
    pub async fn multicast_request<Req, Resp>(
        &self,
        request: &Req,
        timeout: Duration,
    ) -> Result<Vec<Resp>, BusError>
    where
        Req: BusMessage,
        Resp: BusMessage,
    {
        let inner = &self.inner;
        inner.verifier.verify_topic(Req::TYPE_NAME)?;

        let path = inner.router.topic_for(Req::TYPE_NAME);
        inner.entities.ensure_topic(&path).await?;

        let mut envelope = inner
            .factory
            .create_request(request, inner.reply_queue.clone())?;
        let handle = inner
            .correlator
            .record_multicast::<Resp>(envelope.message_id, inner.clock.now() + timeout);

        {
            let scope = inner.resolver.open_scope();
            let pipeline = OutboundPipeline::new((inner.outbound_factory)(&scope, &envelope));
            let sender = inner.transport.topic_sender(&path);
            if let Err(err) = pipeline.run_request_send(&mut envelope, sender.as_ref()).await {
                handle.cancel();
                return Err(err);
            }
        }

        Ok(handle.collect(timeout).await)
    }

    /// This instance's private reply queue path.
    #[must_use]
    pub fn reply_queue(&self) -> &QueuePath {
        &self.inner.reply_queue
    }

    /// Number of requests currently awaiting replies.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.inner.correlator.pending_count()
    }

    /// Signals every pump and the reaper to stop, then awaits them.
    pub async fn shutdown(&self) {
        let _ = self.inner.shutdown_tx.send(true);
        let tasks: Vec<JoinHandle<()>> = self.inner.tasks.lock().drain(..).collect();
        for task in tasks {
            let _ = task.await;
        }
        info!("bus stopped");
    }
}
