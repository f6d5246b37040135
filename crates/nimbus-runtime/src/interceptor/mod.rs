//! Interceptor hooks around send and dispatch operations.
//!
//! Interceptors are user-pluggable hooks built fresh for every operation:
//! a factory receives the operation's dependency scope and the envelope and
//! returns the interceptor instances for that one send or dispatch.
//!
//! # Ordering
//!
//! Interceptors are ordered by `(priority desc, name asc)`, a total and
//! deterministic order. *Before* hooks run in that order; *after* hooks run
//! in REVERSE order; when the guarded operation fails, *error* hooks also
//! run in reverse order and the original error is returned unchanged.
//!
//! ```text
//! on_sending: A, B, C        (priority order)
//! transport send
//! on_sent:    C, B, A        (mirrored)
//! ```

mod pipeline;

pub use pipeline::{InboundPipeline, OutboundPipeline};

use crate::bus::BusError;
use crate::dispatch::DispatchError;
use async_trait::async_trait;
use nimbus_handler::{DependencyScope, DispatchContext};
use nimbus_message::Envelope;
use nimbus_types::ErrorCode;
use std::sync::Arc;
use thiserror::Error;

/// Failure raised by a *before* hook, aborting the guarded operation.
#[derive(Debug, Clone, Error)]
#[error("interceptor {name} rejected the operation: {message}")]
pub struct InterceptorError {
    /// Name of the rejecting interceptor.
    pub name: String,
    /// Why the operation was rejected.
    pub message: String,
}

impl InterceptorError {
    /// Creates an interceptor failure.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl ErrorCode for InterceptorError {
    fn code(&self) -> &'static str {
        "INTERCEPTOR_REJECTED"
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Hook chain around outbound sends.
///
/// The `on_request_*` hooks fire instead of the plain hooks when the
/// envelope being sent is a request awaiting correlation.
#[async_trait]
pub trait OutboundInterceptor: Send + Sync {
    /// Stable name, the secondary sort key.
    fn name(&self) -> &str;

    /// Ordering priority; higher runs earlier in the before chain.
    fn priority(&self) -> i32 {
        0
    }

    /// Runs before a send. May mutate headers. An error aborts the send.
    async fn on_sending(&self, _envelope: &mut Envelope) -> Result<(), InterceptorError> {
        Ok(())
    }

    /// Runs after a successful send, in reverse order.
    async fn on_sent(&self, _envelope: &Envelope) {}

    /// Runs after a failed send, in reverse order.
    async fn on_error(&self, _envelope: &Envelope, _error: &BusError) {}

    /// Runs before a request send.
    async fn on_request_sending(&self, _envelope: &mut Envelope) -> Result<(), InterceptorError> {
        Ok(())
    }

    /// Runs after a successful request send, in reverse order.
    async fn on_request_sent(&self, _envelope: &Envelope) {}

    /// Runs after a failed request send, in reverse order.
    async fn on_request_sending_error(&self, _envelope: &Envelope, _error: &BusError) {}
}

/// Hook chain around inbound dispatches.
#[async_trait]
pub trait InboundInterceptor: Send + Sync {
    /// Stable name, the secondary sort key.
    fn name(&self) -> &str;

    /// Ordering priority; higher runs earlier in the before chain.
    fn priority(&self) -> i32 {
        0
    }

    /// Runs before the handler. An error fails the dispatch.
    async fn on_handling(
        &self,
        _envelope: &Envelope,
        _ctx: &DispatchContext,
    ) -> Result<(), InterceptorError> {
        Ok(())
    }

    /// Runs after a successful dispatch, in reverse order.
    async fn on_handled(&self, _envelope: &Envelope, _ctx: &DispatchContext) {}

    /// Runs after a failed dispatch, in reverse order. The original error
    /// propagates unchanged afterwards.
    async fn on_error(
        &self,
        _envelope: &Envelope,
        _ctx: &DispatchContext,
        _error: &DispatchError,
    ) {
    }
}

/// Builds the outbound interceptors for one send operation.
pub type OutboundInterceptorFactory =
    Arc<dyn Fn(&DependencyScope, &Envelope) -> Vec<Arc<dyn OutboundInterceptor>> + Send + Sync>;

/// Builds the inbound interceptors for one dispatch operation.
pub type InboundInterceptorFactory =
    Arc<dyn Fn(&DependencyScope, &Envelope) -> Vec<Arc<dyn InboundInterceptor>> + Send + Sync>;

/// A factory producing no interceptors.
#[must_use]
pub fn no_outbound_interceptors() -> OutboundInterceptorFactory {
    Arc::new(|_: &DependencyScope, _: &Envelope| Vec::new())
}

/// A factory producing no interceptors.
#[must_use]
pub fn no_inbound_interceptors() -> InboundInterceptorFactory {
    Arc::new(|_: &DependencyScope, _: &Envelope| Vec::new())
}
