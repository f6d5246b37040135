//! The five handler shapes.
//!
//! Each trait covers one interaction pattern. All of them receive the
//! deserialized message by value plus a [`DispatchContext`] with the
//! envelope metadata; none of them see the raw envelope.
//!
//! Handlers must be `Send + Sync`: the runtime invokes them from concurrent
//! dispatches without external synchronization. A handler that needs
//! mutable state uses interior mutability.

use crate::context::DispatchContext;
use crate::error::HandlerError;
use async_trait::async_trait;
use nimbus_message::BusMessage;

/// Handles a command: fire-and-forget, exactly one consumer.
///
/// Commands travel over queues. At most one command handler may be
/// registered per command type.
///
/// # Example
///
/// ```ignore
/// struct PlaceOrderHandler { store: Arc<OrderStore> }
///
/// #[async_trait]
/// impl CommandHandler for PlaceOrderHandler {
///     type Command = PlaceOrder;
///
///     async fn handle(&self, cmd: PlaceOrder, _ctx: &DispatchContext) -> Result<(), HandlerError> {
///         self.store.insert(cmd.order_id).await.map_err(|e| HandlerError::failed(e.to_string()))
///     }
/// }
/// ```
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// The command type this handler consumes.
    type Command: BusMessage;

    /// Handles one command.
    ///
    /// A returned error reports the dispatch as failed; the transport may
    /// redeliver the message up to the configured attempt limit.
    async fn handle(
        &self,
        command: Self::Command,
        ctx: &DispatchContext,
    ) -> Result<(), HandlerError>;
}

/// Handles an event on a shared subscription: each delivered event reaches
/// exactly one of the instances competing on the subscription.
#[async_trait]
pub trait CompetingEventHandler: Send + Sync {
    /// The event type this handler consumes.
    type Event: BusMessage;

    /// Handles one event.
    async fn handle(&self, event: Self::Event, ctx: &DispatchContext) -> Result<(), HandlerError>;
}

/// Handles an event on an instance-private subscription: every instance
/// receives every event.
#[async_trait]
pub trait MulticastEventHandler: Send + Sync {
    /// The event type this handler consumes.
    type Event: BusMessage;

    /// Handles one event.
    async fn handle(&self, event: Self::Event, ctx: &DispatchContext) -> Result<(), HandlerError>;
}

/// Handles a request and produces exactly one response.
///
/// Requests travel over queues; exactly one request handler must be
/// registered per request type. The returned response is wrapped in a reply
/// envelope correlated to the request and sent to the request's reply-to
/// queue. A returned error produces a faulted reply instead, surfacing the
/// failure to the caller.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// The request type this handler consumes.
    type Request: BusMessage;
    /// The response type this handler produces.
    type Response: BusMessage;

    /// Handles one request.
    async fn handle(
        &self,
        request: Self::Request,
        ctx: &DispatchContext,
    ) -> Result<Self::Response, HandlerError>;
}

/// Handles a request published to a topic; every registered handler may
/// respond, and the caller collects replies until its timeout window
/// closes.
#[async_trait]
pub trait MulticastRequestHandler: Send + Sync {
    /// The request type this handler consumes.
    type Request: BusMessage;
    /// The response type this handler produces.
    type Response: BusMessage;

    /// Handles one request.
    async fn handle(
        &self,
        request: Self::Request,
        ctx: &DispatchContext,
    ) -> Result<Self::Response, HandlerError>;
}
