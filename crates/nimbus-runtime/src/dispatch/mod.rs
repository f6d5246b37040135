//! The dispatcher family.
//!
//! One dispatcher variant per handler shape, all sharing the same control
//! flow: resolve the type header to handler registrations, open a
//! dependency scope, build the inbound interceptor chain, run the
//! handler(s) inside it, then do the shape's post-processing (none,
//! composite failure reporting, or reply sending).
//!
//! ```text
//! Received ─► Resolving ─► Handling ─► (Replying? | Completed) ─► pump acks
//!     │            │            │
//!     │            ▼            ▼
//!     │      ResolveFailed  HandleFailed ─► error interceptors ─► pump nacks
//! ```
//!
//! Dispatchers never acknowledge transport messages themselves; they
//! return the outcome and the message pump translates it into a complete
//! or abandon call.

mod command;
mod common;
mod error;
mod event;
mod multicast_request;
mod request;

pub use command::CommandDispatcher;
pub use error::DispatchError;
pub use event::EventDispatcher;
pub use multicast_request::MulticastRequestDispatcher;
pub use request::RequestDispatcher;

pub(crate) use common::DispatchCore;
pub(crate) use request::ReplySender;

use async_trait::async_trait;
use nimbus_handler::HandlerShape;
use nimbus_message::Envelope;
use std::sync::Arc;

/// Converts received envelopes into handler invocations.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Dispatches one envelope. `Err` is reported to the transport as a
    /// nack so it may redeliver.
    async fn dispatch(&self, envelope: Envelope) -> Result<(), DispatchError>;
}

/// Builds the dispatcher variant for a handler shape.
pub(crate) fn dispatcher_for(
    shape: HandlerShape,
    core: DispatchCore,
    replies: Arc<ReplySender>,
) -> Arc<dyn Dispatcher> {
    match shape {
        HandlerShape::Command => Arc::new(CommandDispatcher::new(core)),
        HandlerShape::CompetingEvent => Arc::new(EventDispatcher::competing(core)),
        HandlerShape::MulticastEvent => Arc::new(EventDispatcher::multicast(core)),
        HandlerShape::Request => Arc::new(RequestDispatcher::new(core, replies)),
        HandlerShape::MulticastRequest => {
            Arc::new(MulticastRequestDispatcher::new(core, replies))
        }
    }
}
