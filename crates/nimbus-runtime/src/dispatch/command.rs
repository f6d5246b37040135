//! Command dispatch.

use super::common::DispatchCore;
use super::error::DispatchError;
use super::Dispatcher;
use async_trait::async_trait;
use nimbus_handler::HandlerShape;
use nimbus_message::Envelope;
use tracing::debug;

/// Dispatches commands to their single registered handler.
pub struct CommandDispatcher {
    core: DispatchCore,
}

impl CommandDispatcher {
    pub(crate) fn new(core: DispatchCore) -> Self {
        Self { core }
    }
}

#[async_trait]
impl Dispatcher for CommandDispatcher {
    async fn dispatch(&self, envelope: Envelope) -> Result<(), DispatchError> {
        let (registrations, ctx) = self.core.resolve(HandlerShape::Command, &envelope)?;
        let (scope, pipeline) = self.core.open(&envelope);

        // The registry guarantees exactly one command registration.
        let handler = registrations[0].build(&scope);
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

        debug!(
            message = %envelope.message_id,
            outcome = result.is_ok(),
            "command dispatched"
        );
        result.map(|_| ())
    }
}
