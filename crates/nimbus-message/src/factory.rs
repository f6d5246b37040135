//! Envelope construction.

use crate::envelope::Envelope;
use crate::error::MessageError;
use crate::message::BusMessage;
use crate::properties::{keys, PropertyValue};
use nimbus_types::{Clock, CorrelationId, MessageId, QueuePath};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Identity of the sending bus instance, stamped into every envelope.
#[derive(Debug, Clone)]
pub struct SenderIdentity {
    /// Logical application name, shared by all instances of a service.
    pub application_name: String,
    /// Name of this particular instance, unique within the application.
    pub instance_name: String,
}

impl SenderIdentity {
    /// Creates a sender identity.
    #[must_use]
    pub fn new(application_name: impl Into<String>, instance_name: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            instance_name: instance_name.into(),
        }
    }
}

/// Builds envelopes from user payloads.
///
/// The factory owns the three responsibilities the envelope invariants
/// depend on: minting the `message_id` exactly once, stamping the
/// `Nimbus.MessageType` header from the payload's canonical type name, and
/// reading the enqueue timestamp from the injected [`Clock`].
pub struct MessageFactory {
    clock: Arc<dyn Clock>,
    identity: SenderIdentity,
    default_ttl: Duration,
}

impl MessageFactory {
    /// Creates a factory.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, identity: SenderIdentity, default_ttl: Duration) -> Self {
        Self {
            clock,
            identity,
            default_ttl,
        }
    }

    /// Builds an envelope for a fire-and-forget message.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::Serialization`] when the payload cannot be
    /// serialized.
    pub fn create<M: BusMessage>(&self, payload: &M) -> Result<Envelope, MessageError> {
        let value = serde_json::to_value(payload).map_err(|source| {
            MessageError::Serialization {
                type_name: M::TYPE_NAME,
                source,
            }
        })?;
        Ok(self.assemble(M::TYPE_NAME, value))
    }

    /// Builds a request envelope carrying a reply-to path.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::Serialization`] when the payload cannot be
    /// serialized.
    pub fn create_request<M: BusMessage>(
        &self,
        payload: &M,
        reply_to: QueuePath,
    ) -> Result<Envelope, MessageError> {
        let mut envelope = self.create(payload)?;
        envelope.reply_to = Some(reply_to);
        Ok(envelope)
    }

    /// Builds a reply envelope for a completed request.
    ///
    /// The reply gets its own fresh `message_id`; the request's id is
    /// preserved as the `correlation_id`.
    #[must_use]
    pub fn create_reply(
        &self,
        payload: serde_json::Value,
        response_type: &str,
        request_id: MessageId,
    ) -> Envelope {
        let mut envelope = self.assemble(response_type, payload);
        envelope.correlation_id = Some(CorrelationId::from(request_id));
        envelope
    }

    /// Builds a faulted reply for a failed request.
    ///
    /// The payload carries the serialized error detail; the
    /// `Nimbus.Faulted` marker tells the caller's correlator to fail the
    /// pending request instead of decoding a response.
    #[must_use]
    pub fn create_faulted_reply(
        &self,
        error_code: &str,
        error_message: &str,
        response_type: &str,
        request_id: MessageId,
    ) -> Envelope {
        let detail = serde_json::json!({
            "code": error_code,
            "message": error_message,
        });
        let mut envelope = self.create_reply(detail, response_type, request_id);
        envelope.set_property(keys::FAULTED, true);
        envelope
    }

    fn assemble(&self, type_name: &str, payload: serde_json::Value) -> Envelope {
        let properties = HashMap::from([
            (
                keys::MESSAGE_TYPE.to_string(),
                PropertyValue::from(type_name),
            ),
            (
                keys::SENDER_APPLICATION_NAME.to_string(),
                PropertyValue::from(self.identity.application_name.as_str()),
            ),
            (
                keys::SENDER_INSTANCE_NAME.to_string(),
                PropertyValue::from(self.identity.instance_name.as_str()),
            ),
            (keys::DELIVERY_ATTEMPT.to_string(), PropertyValue::Int(0)),
        ]);

        Envelope {
            message_id: MessageId::new(),
            correlation_id: None,
            reply_to: None,
            payload,
            properties,
            enqueued_time_utc: self.clock.now(),
            expires_after: self.default_ttl,
            delivery_attempt: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_types::SystemClock;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Ping {
        n: u32,
    }

    impl BusMessage for Ping {
        const TYPE_NAME: &'static str = "Ping";
    }

    fn factory() -> MessageFactory {
        MessageFactory::new(
            Arc::new(SystemClock),
            SenderIdentity::new("orders", "orders-1"),
            Duration::from_secs(600),
        )
    }

    #[test]
    fn stamps_type_and_sender_identity() {
        let envelope = factory().create(&Ping { n: 1 }).unwrap();
        assert_eq!(envelope.message_type(), Some("Ping"));
        assert_eq!(
            envelope.properties[keys::SENDER_APPLICATION_NAME].as_str(),
            Some("orders")
        );
        assert_eq!(
            envelope.properties[keys::SENDER_INSTANCE_NAME].as_str(),
            Some("orders-1")
        );
        assert_eq!(envelope.properties[keys::DELIVERY_ATTEMPT].as_int(), Some(0));
    }

    #[test]
    fn each_envelope_gets_a_fresh_id() {
        let f = factory();
        let a = f.create(&Ping { n: 1 }).unwrap();
        let b = f.create(&Ping { n: 1 }).unwrap();
        assert_ne!(a.message_id, b.message_id);
    }

    #[test]
    fn request_carries_reply_to() {
        let envelope = factory()
            .create_request(&Ping { n: 2 }, QueuePath::new("nimbus.replies.orders.1"))
            .unwrap();
        assert_eq!(
            envelope.reply_to,
            Some(QueuePath::new("nimbus.replies.orders.1"))
        );
    }

    #[test]
    fn reply_correlates_to_request() {
        let f = factory();
        let request = f.create(&Ping { n: 3 }).unwrap();
        let reply = f.create_reply(serde_json::json!({"ok": true}), "Pong", request.message_id);

        assert_eq!(
            reply.correlation_id,
            Some(CorrelationId::from(request.message_id))
        );
        assert_ne!(reply.message_id, request.message_id);
        assert!(!reply.is_faulted());
    }

    #[test]
    fn faulted_reply_carries_marker_and_detail() {
        let f = factory();
        let request = f.create(&Ping { n: 4 }).unwrap();
        let reply =
            f.create_faulted_reply("HANDLER_FAILED", "boom", "Pong", request.message_id);

        assert!(reply.is_faulted());
        assert_eq!(reply.payload["code"], "HANDLER_FAILED");
        assert_eq!(reply.payload["message"], "boom");
    }
}
