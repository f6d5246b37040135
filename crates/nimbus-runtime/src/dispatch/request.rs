//! Request dispatch and reply sending.

use super::common::DispatchCore;
use super::error::DispatchError;
use super::Dispatcher;
use crate::bus::BusError;
use crate::interceptor::{OutboundInterceptorFactory, OutboundPipeline};
use crate::transport::Transport;
use async_trait::async_trait;
use nimbus_handler::{DependencyResolver, DispatchContext, HandlerShape};
use nimbus_message::{Envelope, MessageFactory};
use nimbus_types::{ErrorCode, QueuePath};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Sends reply envelopes through the full outbound pipeline.
///
/// Shared by the request dispatchers: each reply gets its own dependency
/// scope and outbound interceptor chain, exactly like a user-initiated
/// send.
pub(crate) struct ReplySender {
    factory: Arc<MessageFactory>,
    transport: Arc<dyn Transport>,
    resolver: Arc<dyn DependencyResolver>,
    outbound_factory: OutboundInterceptorFactory,
}

impl ReplySender {
    pub(crate) fn new(
        factory: Arc<MessageFactory>,
        transport: Arc<dyn Transport>,
        resolver: Arc<dyn DependencyResolver>,
        outbound_factory: OutboundInterceptorFactory,
    ) -> Self {
        Self {
            factory,
            transport,
            resolver,
            outbound_factory,
        }
    }

    async fn send(&self, mut envelope: Envelope, reply_to: &QueuePath) -> Result<(), BusError> {
        let scope = self.resolver.open_scope();
        let pipeline = OutboundPipeline::new((self.outbound_factory)(&scope, &envelope));
        let sender = self.transport.queue_sender(reply_to);
        pipeline.run_send(&mut envelope, sender.as_ref()).await
    }

    pub(crate) async fn send_reply(
        &self,
        ctx: &DispatchContext,
        payload: Value,
        response_type: &str,
    ) -> Result<(), DispatchError> {
        let reply_to = ctx.reply_to.as_ref().ok_or(DispatchError::MissingReplyTo)?;
        let envelope = self
            .factory
            .create_reply(payload, response_type, ctx.message_id);
        self.send(envelope, reply_to)
            .await
            .map_err(|source| DispatchError::Reply {
                request: ctx.message_id,
                source: Box::new(source),
            })
    }

    /// Best-effort faulted reply; failures are logged, never raised, so
    /// the original handler error stays the dispatch outcome.
    pub(crate) async fn send_fault(
        &self,
        ctx: &DispatchContext,
        response_type: &str,
        error: &DispatchError,
    ) {
        let Some(reply_to) = ctx.reply_to.as_ref() else {
            warn!(request = %ctx.message_id, "failed request has no reply-to path");
            return;
        };
        let envelope = self.factory.create_faulted_reply(
            error.code(),
            &error.to_string(),
            response_type,
            ctx.message_id,
        );
        if let Err(err) = self.send(envelope, reply_to).await {
            warn!(request = %ctx.message_id, error = %err, "faulted reply could not be sent");
        }
    }
}

/// Dispatches requests to their single handler and sends the correlated
/// reply.
pub struct RequestDispatcher {
    core: DispatchCore,
    replies: Arc<ReplySender>,
}

impl RequestDispatcher {
    pub(crate) fn new(core: DispatchCore, replies: Arc<ReplySender>) -> Self {
        Self { core, replies }
    }
}

#[async_trait]
impl Dispatcher for RequestDispatcher {
    async fn dispatch(&self, envelope: Envelope) -> Result<(), DispatchError> {
        let (registrations, ctx) = self.core.resolve(HandlerShape::Request, &envelope)?;
        let registration = &registrations[0];
        let response_type = registration
            .response_type()
            .ok_or_else(|| DispatchError::MissingResponse(registration.message_type().into()))?;

        let (scope, pipeline) = self.core.open(&envelope);
        let handler = registration.build(&scope);
        let payload = envelope.payload.clone();
        let handler_ctx = ctx.clone();

        let result = pipeline
            .run(&envelope, &ctx, || async move {
                handler
                    .invoke(payload, &handler_ctx)
                    .await
                    .map_err(DispatchError::from)
            })
            .await;

        match result {
            Ok(Some(value)) => self.replies.send_reply(&ctx, value, response_type).await,
            Ok(None) => Err(DispatchError::MissingResponse(
                registration.message_type().into(),
            )),
            Err(err) => {
                // The caller learns of the failure immediately; the nack
                // below still lets the transport retry the request.
                self.replies.send_fault(&ctx, response_type, &err).await;
                Err(err)
            }
        }
    }
}
