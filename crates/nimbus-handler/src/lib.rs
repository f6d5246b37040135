//! Handler SDK for the Nimbus message bus.
//!
//! User code participates in the bus by implementing one of five handler
//! traits, one per interaction pattern:
//!
//! | Trait | Pattern | Reply |
//! |-------|---------|-------|
//! | [`CommandHandler`] | fire-and-forget, single consumer | No |
//! | [`CompetingEventHandler`] | load-balanced across instances | No |
//! | [`MulticastEventHandler`] | delivered to every instance | No |
//! | [`RequestHandler`] | correlated RPC over queues | One |
//! | [`MulticastRequestHandler`] | RPC over a topic | One per handler |
//!
//! Handlers are registered with the [`HandlerRegistryBuilder`], which erases
//! their concrete types into shape-tagged factories. At dispatch time the
//! runtime opens a [`DependencyScope`], builds the handler through its
//! factory, and invokes it with the deserialized payload plus an explicit
//! [`DispatchContext`] carrying the envelope metadata (message id,
//! correlation id, reply-to, delivery attempt).
//!
//! ```text
//! register_*::<H>()                 dispatch
//!     │                                │
//!     ▼                                ▼
//! HandlerRegistry ──(shape, type)──► Registration::build(scope)
//!                                      │
//!                                      ▼
//!                               ErasedHandler::invoke(payload, ctx)
//!                                      │ deserialize, call typed handler
//!                                      ▼
//!                               H::handle(message, ctx)
//! ```
//!
//! # Example
//!
//! ```
//! use nimbus_handler::{CommandHandler, DispatchContext, HandlerError, HandlerRegistryBuilder};
//! use nimbus_message::BusMessage;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct PlaceOrder { order_id: u64 }
//!
//! impl BusMessage for PlaceOrder {
//!     const TYPE_NAME: &'static str = "PlaceOrder";
//! }
//!
//! struct PlaceOrderHandler;
//!
//! #[async_trait::async_trait]
//! impl CommandHandler for PlaceOrderHandler {
//!     type Command = PlaceOrder;
//!
//!     async fn handle(
//!         &self,
//!         command: PlaceOrder,
//!         _ctx: &DispatchContext,
//!     ) -> Result<(), HandlerError> {
//!         println!("placing order {}", command.order_id);
//!         Ok(())
//!     }
//! }
//!
//! let registry = HandlerRegistryBuilder::new()
//!     .handle_command(|_scope| PlaceOrderHandler)
//!     .build()
//!     .expect("registry builds");
//! assert!(registry.is_queue_type("PlaceOrder"));
//! ```

mod context;
mod erased;
mod error;
mod registry;
mod resolver;
pub mod testing;
mod traits;

pub use context::DispatchContext;
pub use erased::ErasedHandler;
pub use error::HandlerError;
pub use registry::{
    HandlerRegistry, HandlerRegistryBuilder, HandlerShape, Registration, RegistryError,
};
pub use resolver::{
    DependencyResolver, DependencyScope, ScopeMetrics, ScopedResolver, ServiceCollection,
};
pub use traits::{
    CommandHandler, CompetingEventHandler, MulticastEventHandler, MulticastRequestHandler,
    RequestHandler,
};
