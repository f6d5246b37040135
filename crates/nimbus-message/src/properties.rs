//! Wire property keys and values.
//!
//! The keys in [`keys`] are a wire contract shared with every other bus
//! implementation speaking the Nimbus envelope format. They are matched
//! byte-for-byte by receivers; do not rename them.

use serde::{Deserialize, Serialize};

/// Envelope property keys.
pub mod keys {
    /// Canonical type name of the payload. Present on every envelope.
    pub const MESSAGE_TYPE: &str = "Nimbus.MessageType";

    /// Application name of the sending bus instance.
    pub const SENDER_APPLICATION_NAME: &str = "Nimbus.SenderApplicationName";

    /// Instance name of the sending bus instance.
    pub const SENDER_INSTANCE_NAME: &str = "Nimbus.SenderInstanceName";

    /// Delivery counter, incremented by the transport on each redelivery.
    pub const DELIVERY_ATTEMPT: &str = "Nimbus.DeliveryAttempt";

    /// Marker set on reply envelopes whose request handler failed. When
    /// present the payload carries the serialized error detail.
    pub const FAULTED: &str = "Nimbus.Faulted";
}

/// A primitive envelope property value.
///
/// Properties carry only primitives so that every transport can map them
/// onto its native header model without nesting.
///
/// # Example
///
/// ```
/// use nimbus_message::PropertyValue;
///
/// let v = PropertyValue::from("PlaceOrder");
/// assert_eq!(v.as_str(), Some("PlaceOrder"));
/// assert_eq!(v.as_int(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// A string value.
    Str(String),
    /// An integer value.
    Int(i64),
    /// A boolean value.
    Bool(bool),
}

impl PropertyValue {
    /// Returns the string value, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer value, if this is an integer.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the boolean value, if this is a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<u32> for PropertyValue {
    fn from(i: u32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_keys_are_exact() {
        assert_eq!(keys::MESSAGE_TYPE, "Nimbus.MessageType");
        assert_eq!(keys::SENDER_APPLICATION_NAME, "Nimbus.SenderApplicationName");
        assert_eq!(keys::SENDER_INSTANCE_NAME, "Nimbus.SenderInstanceName");
        assert_eq!(keys::DELIVERY_ATTEMPT, "Nimbus.DeliveryAttempt");
        assert_eq!(keys::FAULTED, "Nimbus.Faulted");
    }

    #[test]
    fn accessors_match_variant() {
        assert_eq!(PropertyValue::from(7i64).as_int(), Some(7));
        assert_eq!(PropertyValue::from(true).as_bool(), Some(true));
        assert_eq!(PropertyValue::from("x").as_str(), Some("x"));
        assert_eq!(PropertyValue::from("x").as_bool(), None);
    }

    #[test]
    fn untagged_serde_round_trip() {
        let values = vec![
            PropertyValue::from("s"),
            PropertyValue::from(42i64),
            PropertyValue::from(false),
        ];
        let json = serde_json::to_string(&values).unwrap();
        let back: Vec<PropertyValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(values, back);
    }
}
