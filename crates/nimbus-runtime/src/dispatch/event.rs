//! Event dispatch: competing and multicast fan-out.

use super::common::DispatchCore;
use super::error::DispatchError;
use super::Dispatcher;
use async_trait::async_trait;
use nimbus_handler::HandlerShape;
use nimbus_message::Envelope;
use nimbus_types::ErrorCode;
use tracing::warn;

/// Dispatches an event to every registered handler of its shape.
///
/// Fan-out is all-or-nothing in its outcome: every handler is invoked even
/// when earlier ones fail, and any failure makes the whole dispatch report
/// a composite error carrying each handler's failure, so the transport may
/// redeliver. Handlers must therefore tolerate re-invocation after a
/// partial success.
pub struct EventDispatcher {
    shape: HandlerShape,
    core: DispatchCore,
}

impl EventDispatcher {
    pub(crate) fn competing(core: DispatchCore) -> Self {
        Self {
            shape: HandlerShape::CompetingEvent,
            core,
        }
    }

    pub(crate) fn multicast(core: DispatchCore) -> Self {
        Self {
            shape: HandlerShape::MulticastEvent,
            core,
        }
    }
}

#[async_trait]
impl Dispatcher for EventDispatcher {
    async fn dispatch(&self, envelope: Envelope) -> Result<(), DispatchError> {
        let (registrations, ctx) = self.core.resolve(self.shape, &envelope)?;
        let (scope, pipeline) = self.core.open(&envelope);

        let handler_ctx = ctx.clone();
        let scope_ref = &scope;
        let registrations_ref = &registrations;
        let payload = &envelope.payload;

        let result = pipeline
            .run(&envelope, &ctx, || async move {
                let mut failures = Vec::new();
                for registration in registrations_ref {
                    let handler = registration.build(scope_ref);
                    if let Err(err) = handler.invoke(payload.clone(), &handler_ctx).await {
                        warn!(
                            message_type = registration.message_type(),
                            code = err.code(),
                            error = %err,
                            "event handler failed"
                        );
                        failures.push(err);
                    }
                }
                if failures.is_empty() {
                    Ok(None)
                } else {
                    Err(DispatchError::Composite {
                        total: registrations_ref.len(),
                        failures,
                    })
                }
            })
            .await;

        result.map(|_| ())
    }
}
