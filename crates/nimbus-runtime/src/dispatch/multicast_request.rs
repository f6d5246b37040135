//! Multicast request dispatch.

use super::common::DispatchCore;
use super::error::DispatchError;
use super::request::ReplySender;
use super::Dispatcher;
use async_trait::async_trait;
use nimbus_handler::HandlerShape;
use nimbus_message::Envelope;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Dispatches a multicast request to every registered handler; each
/// successful handler's response is sent as a separate reply correlated to
/// the same request id. The caller's correlator collects the reply stream
/// until its window closes.
pub struct MulticastRequestDispatcher {
    core: DispatchCore,
    replies: Arc<ReplySender>,
}

impl MulticastRequestDispatcher {
    pub(crate) fn new(core: DispatchCore, replies: Arc<ReplySender>) -> Self {
        Self { core, replies }
    }
}

#[async_trait]
impl Dispatcher for MulticastRequestDispatcher {
    async fn dispatch(&self, envelope: Envelope) -> Result<(), DispatchError> {
        let (registrations, ctx) =
            self.core.resolve(HandlerShape::MulticastRequest, &envelope)?;
        let (scope, pipeline) = self.core.open(&envelope);

        let handler_ctx = ctx.clone();
        let scope_ref = &scope;
        let registrations_ref = &registrations;
        let payload = &envelope.payload;
        let responses: Mutex<Vec<(&'static str, Value)>> = Mutex::new(Vec::new());
        let responses_ref = &responses;

        let result = pipeline
            .run(&envelope, &ctx, || async move {
                let mut failures = Vec::new();
                for registration in registrations_ref {
                    let handler = registration.build(scope_ref);
                    match handler.invoke(payload.clone(), &handler_ctx).await {
                        Ok(Some(value)) => {
                            if let Some(response_type) = registration.response_type() {
                                responses_ref.lock().push((response_type, value));
                            }
                        }
                        Ok(None) => {}
                        Err(err) => {
                            warn!(
                                message_type = registration.message_type(),
                                error = %err,
                                "multicast request handler failed"
                            );
                            failures.push(err);
                        }
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

        // Successful handlers reply even when a sibling failed.
        let mut reply_failure = None;
        for (response_type, value) in responses.into_inner() {
            if let Err(err) = self.replies.send_reply(&ctx, value, response_type).await {
                warn!(request = %ctx.message_id, error = %err, "multicast reply could not be sent");
                reply_failure.get_or_insert(err);
            }
        }

        result.map(|_| ())?;
        match reply_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
