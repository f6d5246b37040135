//! Interceptor chain execution.

use super::{InboundInterceptor, OutboundInterceptor};
use crate::bus::BusError;
use crate::dispatch::DispatchError;
use crate::transport::MessageSender;
use nimbus_handler::DispatchContext;
use nimbus_message::Envelope;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Ordered outbound interceptor chain for one send operation.
pub struct OutboundPipeline {
    interceptors: Vec<Arc<dyn OutboundInterceptor>>,
}

impl OutboundPipeline {
    /// Sorts the interceptors into their deterministic order.
    #[must_use]
    pub fn new(mut interceptors: Vec<Arc<dyn OutboundInterceptor>>) -> Self {
        interceptors.sort_by(|a, b| {
            b.priority()
                .cmp(&a.priority())
                .then_with(|| a.name().cmp(b.name()))
        });
        Self { interceptors }
    }

    /// Sends an envelope through the chain: `on_sending` in order, the
    /// transport send, then `on_sent` mirrored, or `on_error` mirrored on
    /// failure with the original error returned unchanged.
    ///
    /// # Errors
    ///
    /// The first before-hook rejection, or the transport failure.
    pub async fn run_send(
        &self,
        envelope: &mut Envelope,
        sender: &dyn MessageSender,
    ) -> Result<(), BusError> {
        for interceptor in &self.interceptors {
            interceptor.on_sending(envelope).await?;
        }
        match sender.send(envelope.clone()).await {
            Ok(()) => {
                for interceptor in self.interceptors.iter().rev() {
                    interceptor.on_sent(envelope).await;
                }
                Ok(())
            }
            Err(transport_err) => {
                let err = BusError::from(transport_err);
                for interceptor in self.interceptors.iter().rev() {
                    interceptor.on_error(envelope, &err).await;
                }
                Err(err)
            }
        }
    }

    /// Like [`run_send`](Self::run_send) but through the request-path
    /// hooks.
    ///
    /// # Errors
    ///
    /// The first before-hook rejection, or the transport failure.
    pub async fn run_request_send(
        &self,
        envelope: &mut Envelope,
        sender: &dyn MessageSender,
    ) -> Result<(), BusError> {
        for interceptor in &self.interceptors {
            interceptor.on_request_sending(envelope).await?;
        }
        match sender.send(envelope.clone()).await {
            Ok(()) => {
                for interceptor in self.interceptors.iter().rev() {
                    interceptor.on_request_sent(envelope).await;
                }
                Ok(())
            }
            Err(transport_err) => {
                let err = BusError::from(transport_err);
                for interceptor in self.interceptors.iter().rev() {
                    interceptor.on_request_sending_error(envelope, &err).await;
                }
                Err(err)
            }
        }
    }
}

/// Ordered inbound interceptor chain for one dispatch.
pub struct InboundPipeline {
    interceptors: Vec<Arc<dyn InboundInterceptor>>,
}

impl InboundPipeline {
    /// Sorts the interceptors into their deterministic order.
    #[must_use]
    pub fn new(mut interceptors: Vec<Arc<dyn InboundInterceptor>>) -> Self {
        interceptors.sort_by(|a, b| {
            b.priority()
                .cmp(&a.priority())
                .then_with(|| a.name().cmp(b.name()))
        });
        Self { interceptors }
    }

    /// Runs the guarded handler operation inside the chain.
    ///
    /// # Errors
    ///
    /// The first before-hook rejection, or the operation's own error after
    /// the mirrored error hooks have observed it.
    pub async fn run<F, Fut>(
        &self,
        envelope: &Envelope,
        ctx: &DispatchContext,
        op: F,
    ) -> Result<Option<Value>, DispatchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Value>, DispatchError>>,
    {
        for interceptor in &self.interceptors {
            interceptor.on_handling(envelope, ctx).await?;
        }
        match op().await {
            Ok(value) => {
                for interceptor in self.interceptors.iter().rev() {
                    interceptor.on_handled(envelope, ctx).await;
                }
                Ok(value)
            }
            Err(err) => {
                for interceptor in self.interceptors.iter().rev() {
                    interceptor.on_error(envelope, ctx, &err).await;
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::InterceptorError;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct Hooked {
        name: &'static str,
        priority: i32,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl InboundInterceptor for Hooked {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        async fn on_handling(
            &self,
            _envelope: &Envelope,
            _ctx: &DispatchContext,
        ) -> Result<(), InterceptorError> {
            self.log.lock().push(format!("before:{}", self.name));
            Ok(())
        }

        async fn on_handled(&self, _envelope: &Envelope, _ctx: &DispatchContext) {
            self.log.lock().push(format!("after:{}", self.name));
        }

        async fn on_error(
            &self,
            _envelope: &Envelope,
            _ctx: &DispatchContext,
            _error: &DispatchError,
        ) {
            self.log.lock().push(format!("error:{}", self.name));
        }
    }

    fn envelope() -> Envelope {
        Envelope {
            message_id: nimbus_types::MessageId::new(),
            correlation_id: None,
            reply_to: None,
            payload: Value::Null,
            properties: std::collections::HashMap::new(),
            enqueued_time_utc: std::time::SystemTime::now(),
            expires_after: std::time::Duration::from_secs(60),
            delivery_attempt: 1,
        }
    }

    fn pipeline_of(log: &Arc<Mutex<Vec<String>>>) -> InboundPipeline {
        InboundPipeline::new(vec![
            Arc::new(Hooked {
                name: "b",
                priority: 5,
                log: Arc::clone(log),
            }),
            Arc::new(Hooked {
                name: "a",
                priority: 5,
                log: Arc::clone(log),
            }),
            Arc::new(Hooked {
                name: "c",
                priority: 10,
                log: Arc::clone(log),
            }),
        ])
    }

    #[tokio::test]
    async fn after_hooks_mirror_before_hooks() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = pipeline_of(&log);
        let env = envelope();
        let ctx = DispatchContext::from_envelope(&env);

        pipeline.run(&env, &ctx, || async { Ok(None) }).await.unwrap();

        assert_eq!(
            *log.lock(),
            vec![
                "before:c", // priority 10 first
                "before:a", // then name order within priority 5
                "before:b",
                "after:b", // mirrored
                "after:a",
                "after:c",
            ]
        );
    }

    #[tokio::test]
    async fn error_hooks_run_reversed_and_error_is_preserved() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = pipeline_of(&log);
        let env = envelope();
        let ctx = DispatchContext::from_envelope(&env);

        let result = pipeline
            .run(&env, &ctx, || async {
                Err(DispatchError::from(nimbus_handler::HandlerError::failed(
                    "boom",
                )))
            })
            .await;

        assert!(matches!(
            result,
            Err(DispatchError::Handler(nimbus_handler::HandlerError::Failed(m))) if m == "boom"
        ));
        assert_eq!(
            *log.lock(),
            vec![
                "before:c",
                "before:a",
                "before:b",
                "error:b",
                "error:a",
                "error:c",
            ]
        );
    }
}
