//! Handler registry: shape-tagged, factory-based handler lookup.
//!
//! The registry replaces reflective open-generic dispatch with an explicit
//! design: a [`HandlerShape`] tag per interaction pattern, and per message
//! type an ordered list of [`Registration`]s whose factories close over the
//! concrete handler type. The registry is built once at startup and is
//! immutable afterwards.
//!
//! Registration also feeds the sendable-type sets the broker's pre-flight
//! verifier consults: registering a command handler marks the command type
//! as a known queue type, registering an event handler marks the event as a
//! known topic type, and producer-only applications declare their outgoing
//! types explicitly with the `declare_*` methods.

use crate::erased::{
    ErasedCommand, ErasedCompetingEvent, ErasedHandler, ErasedMulticastEvent,
    ErasedMulticastRequest, ErasedRequest,
};
use crate::resolver::DependencyScope;
use crate::traits::{
    CommandHandler, CompetingEventHandler, MulticastEventHandler, MulticastRequestHandler,
    RequestHandler,
};
use nimbus_message::BusMessage;
use nimbus_types::ErrorCode;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

/// The five handler shapes, one per interaction pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerShape {
    /// Fire-and-forget over a queue, single consumer.
    Command,
    /// Event on a shared subscription, load-balanced across instances.
    CompetingEvent,
    /// Event on an instance-private subscription, delivered to all.
    MulticastEvent,
    /// Correlated RPC over a queue, exactly one handler.
    Request,
    /// RPC over a topic, every handler may reply.
    MulticastRequest,
}

impl HandlerShape {
    /// Returns `true` when messages of this shape travel over topics.
    #[must_use]
    pub fn is_topic_bound(self) -> bool {
        matches!(
            self,
            Self::CompetingEvent | Self::MulticastEvent | Self::MulticastRequest
        )
    }

    /// Returns `true` when handlers of this shape produce replies.
    #[must_use]
    pub fn expects_reply(self) -> bool {
        matches!(self, Self::Request | Self::MulticastRequest)
    }

    /// Returns `true` when at most one handler may be registered per
    /// message type.
    #[must_use]
    pub fn single_handler(self) -> bool {
        matches!(self, Self::Command | Self::Request)
    }
}

type HandlerFactory = Arc<dyn Fn(&DependencyScope) -> Arc<dyn ErasedHandler> + Send + Sync>;

/// One registered handler: its shape, message type, and a factory that
/// builds the erased handler against a dependency scope.
#[derive(Clone)]
pub struct Registration {
    shape: HandlerShape,
    message_type: &'static str,
    response_type: Option<&'static str>,
    factory: HandlerFactory,
}

impl Registration {
    /// Returns the handler shape.
    #[must_use]
    pub fn shape(&self) -> HandlerShape {
        self.shape
    }

    /// Returns the canonical name of the handled message type.
    #[must_use]
    pub fn message_type(&self) -> &'static str {
        self.message_type
    }

    /// Returns the response type name, for the request shapes.
    #[must_use]
    pub fn response_type(&self) -> Option<&'static str> {
        self.response_type
    }

    /// Builds the handler for one dispatch.
    #[must_use]
    pub fn build(&self, scope: &DependencyScope) -> Arc<dyn ErasedHandler> {
        (self.factory)(scope)
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("shape", &self.shape)
            .field("message_type", &self.message_type)
            .field("response_type", &self.response_type)
            .finish_non_exhaustive()
    }
}

/// Registry build errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A single-handler shape has more than one registration for the same
    /// message type.
    #[error("{shape:?} handler for {message_type} registered more than once")]
    DuplicateHandler {
        /// The offending shape.
        shape: HandlerShape,
        /// The doubly-registered message type.
        message_type: &'static str,
    },
}

impl ErrorCode for RegistryError {
    fn code(&self) -> &'static str {
        match self {
            Self::DuplicateHandler { .. } => "REGISTRY_DUPLICATE_HANDLER",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Builder for [`HandlerRegistry`].
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    registrations: Vec<Registration>,
    queue_types: HashSet<String>,
    topic_types: HashSet<String>,
}

impl HandlerRegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command handler.
    ///
    /// The factory runs once per dispatch, against that dispatch's
    /// dependency scope.
    #[must_use]
    pub fn handle_command<H, F>(mut self, factory: F) -> Self
    where
        H: CommandHandler + 'static,
        F: Fn(&DependencyScope) -> H + Send + Sync + 'static,
    {
        self.queue_types.insert(H::Command::TYPE_NAME.to_string());
        self.registrations.push(Registration {
            shape: HandlerShape::Command,
            message_type: H::Command::TYPE_NAME,
            response_type: None,
            factory: Arc::new(move |scope| {
                Arc::new(ErasedCommand(factory(scope))) as Arc<dyn ErasedHandler>
            }),
        });
        self
    }

    /// Registers a competing event handler.
    #[must_use]
    pub fn handle_competing_event<H, F>(mut self, factory: F) -> Self
    where
        H: CompetingEventHandler + 'static,
        F: Fn(&DependencyScope) -> H + Send + Sync + 'static,
    {
        self.topic_types.insert(H::Event::TYPE_NAME.to_string());
        self.registrations.push(Registration {
            shape: HandlerShape::CompetingEvent,
            message_type: H::Event::TYPE_NAME,
            response_type: None,
            factory: Arc::new(move |scope| {
                Arc::new(ErasedCompetingEvent(factory(scope))) as Arc<dyn ErasedHandler>
            }),
        });
        self
    }

    /// Registers a multicast event handler.
    #[must_use]
    pub fn handle_multicast_event<H, F>(mut self, factory: F) -> Self
    where
        H: MulticastEventHandler + 'static,
        F: Fn(&DependencyScope) -> H + Send + Sync + 'static,
    {
        self.topic_types.insert(H::Event::TYPE_NAME.to_string());
        self.registrations.push(Registration {
            shape: HandlerShape::MulticastEvent,
            message_type: H::Event::TYPE_NAME,
            response_type: None,
            factory: Arc::new(move |scope| {
                Arc::new(ErasedMulticastEvent(factory(scope))) as Arc<dyn ErasedHandler>
            }),
        });
        self
    }

    /// Registers a request handler.
    #[must_use]
    pub fn handle_request<H, F>(mut self, factory: F) -> Self
    where
        H: RequestHandler + 'static,
        F: Fn(&DependencyScope) -> H + Send + Sync + 'static,
    {
        self.queue_types.insert(H::Request::TYPE_NAME.to_string());
        self.registrations.push(Registration {
            shape: HandlerShape::Request,
            message_type: H::Request::TYPE_NAME,
            response_type: Some(H::Response::TYPE_NAME),
            factory: Arc::new(move |scope| {
                Arc::new(ErasedRequest(factory(scope))) as Arc<dyn ErasedHandler>
            }),
        });
        self
    }

    /// Registers a multicast request handler.
    #[must_use]
    pub fn handle_multicast_request<H, F>(mut self, factory: F) -> Self
    where
        H: MulticastRequestHandler + 'static,
        F: Fn(&DependencyScope) -> H + Send + Sync + 'static,
    {
        self.topic_types.insert(H::Request::TYPE_NAME.to_string());
        self.registrations.push(Registration {
            shape: HandlerShape::MulticastRequest,
            message_type: H::Request::TYPE_NAME,
            response_type: Some(H::Response::TYPE_NAME),
            factory: Arc::new(move |scope| {
                Arc::new(ErasedMulticastRequest(factory(scope))) as Arc<dyn ErasedHandler>
            }),
        });
        self
    }

    /// Declares a queue-bound message type this application sends but does
    /// not handle.
    #[must_use]
    pub fn declare_command<M: BusMessage>(mut self) -> Self {
        self.queue_types.insert(M::TYPE_NAME.to_string());
        self
    }

    /// Declares a request type this application sends but does not handle.
    #[must_use]
    pub fn declare_request<M: BusMessage>(mut self) -> Self {
        self.queue_types.insert(M::TYPE_NAME.to_string());
        self
    }

    /// Declares a topic-bound message type this application publishes but
    /// does not handle.
    #[must_use]
    pub fn declare_event<M: BusMessage>(mut self) -> Self {
        self.topic_types.insert(M::TYPE_NAME.to_string());
        self
    }

    /// Finalizes the registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateHandler`] when a command or
    /// request type has more than one registration.
    pub fn build(self) -> Result<HandlerRegistry, RegistryError> {
        let mut entries: HashMap<HandlerShape, HashMap<String, Vec<Registration>>> =
            HashMap::new();

        for registration in self.registrations {
            let by_type = entries.entry(registration.shape).or_default();
            let list = by_type
                .entry(registration.message_type.to_string())
                .or_default();
            if registration.shape.single_handler() && !list.is_empty() {
                return Err(RegistryError::DuplicateHandler {
                    shape: registration.shape,
                    message_type: registration.message_type,
                });
            }
            list.push(registration);
        }

        Ok(HandlerRegistry {
            entries,
            queue_types: self.queue_types,
            topic_types: self.topic_types,
        })
    }
}

/// Immutable map from (shape, message type) to the ordered handler
/// registrations, plus the sendable-type sets.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    entries: HashMap<HandlerShape, HashMap<String, Vec<Registration>>>,
    queue_types: HashSet<String>,
    topic_types: HashSet<String>,
}

impl HandlerRegistry {
    /// Returns the registrations for a shape and message type, in
    /// registration order. Empty when none are registered.
    #[must_use]
    pub fn handlers_for(&self, shape: HandlerShape, message_type: &str) -> &[Registration] {
        self.entries
            .get(&shape)
            .and_then(|by_type| by_type.get(message_type))
            .map_or(&[], Vec::as_slice)
    }

    /// Returns `true` when the type is registered at all.
    #[must_use]
    pub fn is_known(&self, message_type: &str) -> bool {
        self.queue_types.contains(message_type) || self.topic_types.contains(message_type)
    }

    /// Returns `true` when the type travels over queues.
    #[must_use]
    pub fn is_queue_type(&self, message_type: &str) -> bool {
        self.queue_types.contains(message_type)
    }

    /// Returns `true` when the type travels over topics.
    #[must_use]
    pub fn is_topic_type(&self, message_type: &str) -> bool {
        self.topic_types.contains(message_type)
    }

    /// Iterates the (shape, message type) pairs that have handlers.
    ///
    /// The runtime uses this to provision one receive pump per hosted
    /// entity.
    pub fn hosted(&self) -> impl Iterator<Item = (HandlerShape, &str)> {
        self.entries.iter().flat_map(|(shape, by_type)| {
            by_type.keys().map(move |name| (*shape, name.as_str()))
        })
    }
}
