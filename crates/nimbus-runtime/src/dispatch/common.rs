//! Plumbing shared by every dispatcher variant.

use super::error::DispatchError;
use crate::interceptor::{InboundInterceptorFactory, InboundPipeline};
use nimbus_handler::{
    DependencyResolver, DependencyScope, DispatchContext, HandlerRegistry, HandlerShape,
    Registration,
};
use nimbus_message::{keys, Envelope};
use std::sync::Arc;

/// The collaborators every dispatcher needs: handler lookup, scope
/// opening, and inbound interceptor construction.
#[derive(Clone)]
pub(crate) struct DispatchCore {
    registry: Arc<HandlerRegistry>,
    resolver: Arc<dyn DependencyResolver>,
    inbound_factory: InboundInterceptorFactory,
}

impl DispatchCore {
    pub(crate) fn new(
        registry: Arc<HandlerRegistry>,
        resolver: Arc<dyn DependencyResolver>,
        inbound_factory: InboundInterceptorFactory,
    ) -> Self {
        Self {
            registry,
            resolver,
            inbound_factory,
        }
    }

    /// Resolves the envelope's type header to its handler registrations
    /// and builds the dispatch context.
    pub(crate) fn resolve(
        &self,
        shape: HandlerShape,
        envelope: &Envelope,
    ) -> Result<(Vec<Registration>, DispatchContext), DispatchError> {
        let message_type = envelope
            .message_type()
            .ok_or(DispatchError::MissingProperty(keys::MESSAGE_TYPE))?;

        let registrations = self.registry.handlers_for(shape, message_type);
        if registrations.is_empty() {
            return Err(DispatchError::NoHandler {
                shape,
                message_type: message_type.to_string(),
            });
        }

        Ok((
            registrations.to_vec(),
            DispatchContext::from_envelope(envelope),
        ))
    }

    /// Opens the dispatch's dependency scope and builds its inbound
    /// interceptor chain.
    pub(crate) fn open(&self, envelope: &Envelope) -> (DependencyScope, InboundPipeline) {
        let scope = self.resolver.open_scope();
        let pipeline = InboundPipeline::new((self.inbound_factory)(&scope, envelope));
        (scope, pipeline)
    }
}
