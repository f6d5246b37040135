//! Dispatch context passed to handlers.

use nimbus_message::{keys, Envelope, PropertyValue};
use nimbus_types::{CorrelationId, MessageId, QueuePath};
use std::collections::HashMap;

/// Envelope metadata made available to a handler for one dispatch.
///
/// The context is built from the received envelope and passed to the
/// handler as an explicit parameter, so a handler that needs the delivery
/// attempt or the sender identity reads it directly instead of relying on
/// ambient state.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    /// Id of the message being dispatched.
    pub message_id: MessageId,
    /// Correlation id, when the message is itself a reply.
    pub correlation_id: Option<CorrelationId>,
    /// Reply-to queue of the sender, when the message is a request.
    pub reply_to: Option<QueuePath>,
    /// How many times the transport has delivered this message.
    pub delivery_attempt: u32,
    /// The envelope's full property map.
    pub properties: HashMap<String, PropertyValue>,
}

impl DispatchContext {
    /// Builds the context for a received envelope.
    #[must_use]
    pub fn from_envelope(envelope: &Envelope) -> Self {
        Self {
            message_id: envelope.message_id,
            correlation_id: envelope.correlation_id,
            reply_to: envelope.reply_to.clone(),
            delivery_attempt: envelope.delivery_attempt,
            properties: envelope.properties.clone(),
        }
    }

    /// Returns a property by key.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Returns the sending application's name.
    #[must_use]
    pub fn sender_application(&self) -> Option<&str> {
        self.properties
            .get(keys::SENDER_APPLICATION_NAME)?
            .as_str()
    }

    /// Returns the sending instance's name.
    #[must_use]
    pub fn sender_instance(&self) -> Option<&str> {
        self.properties.get(keys::SENDER_INSTANCE_NAME)?.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn envelope() -> Envelope {
        let mut properties = HashMap::new();
        properties.insert(
            keys::SENDER_APPLICATION_NAME.to_string(),
            PropertyValue::from("orders"),
        );
        properties.insert(
            keys::SENDER_INSTANCE_NAME.to_string(),
            PropertyValue::from("orders-1"),
        );
        Envelope {
            message_id: MessageId::new(),
            correlation_id: None,
            reply_to: Some(QueuePath::new("nimbus.replies.orders.1")),
            payload: serde_json::Value::Null,
            properties,
            enqueued_time_utc: SystemTime::now(),
            expires_after: Duration::from_secs(60),
            delivery_attempt: 3,
        }
    }

    #[test]
    fn mirrors_envelope_metadata() {
        let env = envelope();
        let ctx = DispatchContext::from_envelope(&env);

        assert_eq!(ctx.message_id, env.message_id);
        assert_eq!(ctx.reply_to, env.reply_to);
        assert_eq!(ctx.delivery_attempt, 3);
        assert_eq!(ctx.sender_application(), Some("orders"));
        assert_eq!(ctx.sender_instance(), Some("orders-1"));
    }
}
