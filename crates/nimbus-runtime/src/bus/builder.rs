//! Bus construction and lifecycle.

use super::error::BusError;
use super::facade::{Bus, BusInner};
use super::verifier::KnownMessageTypeVerifier;
use crate::config::BusConfig;
use crate::correlation::RequestCorrelator;
use crate::dispatch::{dispatcher_for, DispatchCore, ReplySender};
use crate::entity::{EntityManager, RetryPolicy};
use crate::interceptor::{
    no_inbound_interceptors, no_outbound_interceptors, InboundInterceptorFactory,
    OutboundInterceptorFactory,
};
use crate::pump::{MessagePump, ReplyPump};
use crate::router::Router;
use crate::transport::{EntityDescriptor, InMemoryTransport, Transport};
use nimbus_handler::{DependencyResolver, HandlerRegistry, HandlerShape, ServiceCollection};
use nimbus_message::{MessageFactory, SenderIdentity};
use nimbus_types::{Clock, SubscriptionKey, SystemClock};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Configures and starts a [`Bus`].
///
/// Only the identity is mandatory; everything else has a sensible default
/// (in-memory transport, empty registry, no interceptors, system clock).
///
/// # Example
///
/// ```ignore
/// let bus = BusBuilder::new("orders", "orders-1")
///     .with_registry(registry)
///     .with_transport(transport)
///     .start()
///     .await?;
/// ```
pub struct BusBuilder {
    application_name: String,
    instance_name: String,
    prefix: String,
    config: BusConfig,
    transport: Option<Arc<dyn Transport>>,
    resolver: Option<Arc<dyn DependencyResolver>>,
    registry: HandlerRegistry,
    inbound_factory: InboundInterceptorFactory,
    outbound_factory: OutboundInterceptorFactory,
    clock: Arc<dyn Clock>,
}

impl BusBuilder {
    /// Creates a builder for the given application and instance identity.
    #[must_use]
    pub fn new(application_name: impl Into<String>, instance_name: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            instance_name: instance_name.into(),
            prefix: "nimbus".to_string(),
            config: BusConfig::default(),
            transport: None,
            resolver: None,
            registry: HandlerRegistry::default(),
            inbound_factory: no_inbound_interceptors(),
            outbound_factory: no_outbound_interceptors(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Overrides the path prefix (default `nimbus`).
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Overrides the configuration.
    #[must_use]
    pub fn with_config(mut self, config: BusConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the transport. Defaults to an in-process
    /// [`InMemoryTransport`].
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the dependency resolver. Defaults to an empty
    /// [`ServiceCollection`].
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn DependencyResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Sets the handler registry.
    #[must_use]
    pub fn with_registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Sets the inbound interceptor factory.
    #[must_use]
    pub fn with_inbound_interceptors(mut self, factory: InboundInterceptorFactory) -> Self {
        self.inbound_factory = factory;
        self
    }

    /// Sets the outbound interceptor factory.
    #[must_use]
    pub fn with_outbound_interceptors(mut self, factory: OutboundInterceptorFactory) -> Self {
        self.outbound_factory = factory;
        self
    }

    /// Overrides the clock. Tests inject a manual clock here.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Provisions the instance's entities, spawns the pumps and the
    /// correlation reaper, and returns the running bus.
    ///
    /// Destination entities for outgoing messages stay lazy; only the
    /// entities this instance consumes from (reply queue, dead-letter
    /// queue, hosted queues and subscriptions) are created here, because a
    /// receiver must exist before the first message arrives.
    ///
    /// # Errors
    ///
    /// [`BusError::Entity`] when provisioning fails.
    pub async fn start(self) -> Result<Bus, BusError> {
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(InMemoryTransport::new()));
        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(ServiceCollection::new().into_resolver()));

        let router = Router::new(self.prefix.clone());
        let identity =
            SenderIdentity::new(self.application_name.clone(), self.instance_name.clone());
        let factory = Arc::new(MessageFactory::new(
            Arc::clone(&self.clock),
            identity,
            self.config.default_message_time_to_live,
        ));
        let entities = Arc::new(EntityManager::new(
            Arc::clone(&transport),
            EntityDescriptor::from_config(&self.config),
            RetryPolicy::default(),
            self.config.default_timeout,
        ));
        let correlator = Arc::new(RequestCorrelator::new(Arc::clone(&self.clock)));
        let registry = Arc::new(self.registry);
        let verifier = KnownMessageTypeVerifier::new(Arc::clone(&registry));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks = Vec::new();

        let dead_letter_queue = router.dead_letter_queue();
        entities.ensure_queue(&dead_letter_queue).await?;
        let dead_letter_sender = transport.queue_sender(&dead_letter_queue);

        let reply_queue = router.reply_queue_for(&self.application_name, &self.instance_name);
        entities.ensure_queue(&reply_queue).await?;
        tasks.push(
            ReplyPump::new(
                format!("reply:{reply_queue}"),
                transport.queue_receiver(&reply_queue),
                Arc::clone(&correlator),
                shutdown_rx.clone(),
            )
            .spawn(),
        );

        tasks.push(correlator.spawn_reaper(shutdown_rx.clone()));

        let replies = Arc::new(ReplySender::new(
            Arc::clone(&factory),
            Arc::clone(&transport),
            Arc::clone(&resolver),
            self.outbound_factory.clone(),
        ));
        let core = DispatchCore::new(
            Arc::clone(&registry),
            Arc::clone(&resolver),
            self.inbound_factory.clone(),
        );

        let hosted: Vec<(HandlerShape, String)> = registry
            .hosted()
            .map(|(shape, message_type)| (shape, message_type.to_string()))
            .collect();

        for (shape, message_type) in hosted {
            let receiver = match shape {
                HandlerShape::Command | HandlerShape::Request => {
                    let path = router.queue_for(&message_type);
                    entities.ensure_queue(&path).await?;
                    transport.queue_receiver(&path)
                }
                HandlerShape::CompetingEvent => {
                    let key = SubscriptionKey::new(
                        router.topic_for(&message_type),
                        router.competing_subscription(&self.application_name),
                    );
                    entities.ensure_subscription(&key).await?;
                    transport.subscription_receiver(&key)
                }
                HandlerShape::MulticastEvent | HandlerShape::MulticastRequest => {
                    let key = SubscriptionKey::new(
                        router.topic_for(&message_type),
                        router.multicast_subscription(
                            &self.application_name,
                            &self.instance_name,
                        ),
                    );
                    entities.ensure_subscription(&key).await?;
                    transport.subscription_receiver(&key)
                }
            };

            let dispatcher = dispatcher_for(shape, core.clone(), Arc::clone(&replies));
            tasks.push(
                MessagePump::new(
                    format!("{shape:?}:{message_type}"),
                    receiver,
                    dispatcher,
                    Arc::clone(&dead_letter_sender),
                    self.config.max_delivery_attempts,
                    self.config.enable_dead_lettering_on_message_expiration,
                    Arc::clone(&self.clock),
                    shutdown_rx.clone(),
                )
                .spawn(),
            );
        }

        info!(
            application = %self.application_name,
            instance = %self.instance_name,
            "bus started"
        );

        Ok(Bus::from_inner(BusInner {
            config: self.config,
            router,
            factory,
            transport,
            entities,
            correlator,
            verifier,
            resolver,
            outbound_factory: self.outbound_factory,
            reply_queue,
            clock: self.clock,
            shutdown_tx,
            tasks: Mutex::new(tasks),
        }))
    }
}
