//! The brokered message record.

use crate::properties::{keys, PropertyValue};
use nimbus_types::{CorrelationId, MessageId, QueuePath};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, SystemTime};

/// A transport-level message wrapping a user payload plus metadata.
///
/// Envelopes are built by the [`MessageFactory`](crate::MessageFactory) and
/// are immutable after construction, with two exceptions reserved for
/// transport adapters: [`record_delivery`](Self::record_delivery) and
/// [`set_property`](Self::set_property).
///
/// # Fields on the wire
///
/// | Field | Meaning |
/// |-------|---------|
/// | `message_id` | Unique per logical message, minted once |
/// | `correlation_id` | On replies, equals the request's `message_id` |
/// | `reply_to` | Queue the response should be sent to (requests only) |
/// | `payload` | Serialized user message |
/// | `properties` | `Nimbus.*` keys plus custom headers |
/// | `enqueued_time_utc` | Sender's clock at envelope build |
/// | `expires_after` | Time-to-live relative to enqueue |
/// | `delivery_attempt` | Bumped by the transport on each delivery |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Unique id of this logical message.
    pub message_id: MessageId,
    /// Correlates a reply with its request.
    pub correlation_id: Option<CorrelationId>,
    /// Where responses to this message should be sent. Set on requests only.
    pub reply_to: Option<QueuePath>,
    /// The serialized user payload.
    pub payload: serde_json::Value,
    /// String-to-primitive property map.
    pub properties: HashMap<String, PropertyValue>,
    /// Sender wall-clock time at envelope construction.
    pub enqueued_time_utc: SystemTime,
    /// Time-to-live, relative to `enqueued_time_utc`.
    pub expires_after: Duration,
    /// Number of times the transport has delivered this envelope.
    pub delivery_attempt: u32,
}

impl Envelope {
    /// Returns the canonical type name of the payload, read from the
    /// `Nimbus.MessageType` property.
    #[must_use]
    pub fn message_type(&self) -> Option<&str> {
        self.properties.get(keys::MESSAGE_TYPE)?.as_str()
    }

    /// Returns `true` when this is a faulted reply.
    #[must_use]
    pub fn is_faulted(&self) -> bool {
        self.properties
            .get(keys::FAULTED)
            .and_then(PropertyValue::as_bool)
            .unwrap_or(false)
    }

    /// Returns `true` when the envelope's time-to-live has elapsed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: SystemTime) -> bool {
        match self.enqueued_time_utc.checked_add(self.expires_after) {
            Some(deadline) => now > deadline,
            None => false,
        }
    }

    /// Sets or replaces a property.
    ///
    /// Reserved for transport adapters and interceptors; user code reads
    /// properties through the typed accessors.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Records one delivery of this envelope.
    ///
    /// Called by transport adapters each time the envelope is handed to a
    /// receiver, keeping the `delivery_attempt` field and the
    /// `Nimbus.DeliveryAttempt` property in step.
    pub fn record_delivery(&mut self) {
        self.delivery_attempt += 1;
        self.properties
            .insert(keys::DELIVERY_ATTEMPT.to_string(), self.delivery_attempt.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Envelope {
        Envelope {
            message_id: MessageId::new(),
            correlation_id: None,
            reply_to: None,
            payload: serde_json::json!({"n": 1}),
            properties: HashMap::from([(
                keys::MESSAGE_TYPE.to_string(),
                PropertyValue::from("Sample"),
            )]),
            enqueued_time_utc: SystemTime::now(),
            expires_after: Duration::from_secs(60),
            delivery_attempt: 0,
        }
    }

    #[test]
    fn message_type_reads_property() {
        assert_eq!(sample().message_type(), Some("Sample"));
    }

    #[test]
    fn faulted_defaults_to_false() {
        let mut env = sample();
        assert!(!env.is_faulted());
        env.set_property(keys::FAULTED, true);
        assert!(env.is_faulted());
    }

    #[test]
    fn record_delivery_keeps_field_and_property_in_step() {
        let mut env = sample();
        env.record_delivery();
        env.record_delivery();
        assert_eq!(env.delivery_attempt, 2);
        assert_eq!(
            env.properties[keys::DELIVERY_ATTEMPT].as_int(),
            Some(2)
        );
    }

    #[test]
    fn expiry_is_relative_to_enqueue_time() {
        let env = sample();
        let now = env.enqueued_time_utc;
        assert!(!env.is_expired(now));
        assert!(!env.is_expired(now + Duration::from_secs(60)));
        assert!(env.is_expired(now + Duration::from_secs(61)));
    }
}
