//! Identifier types for Nimbus messages.
//!
//! Both identifiers are UUID v4 based so that they are unique across
//! processes and machines without coordination.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for a single logical message on the bus.
///
/// A `MessageId` is generated exactly once, when the message factory builds
/// the envelope. Redeliveries of the same logical message keep the same id;
/// two separate sends of equal payloads get distinct ids.
///
/// # Example
///
/// ```
/// use nimbus_types::MessageId;
///
/// let a = MessageId::new();
/// let b = MessageId::new();
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

#[allow(clippy::new_without_default)] // Default intentionally not implemented - ids are minted by the message factory
impl MessageId {
    /// Creates a new `MessageId` with a random UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

// NOTE: MessageId intentionally does NOT implement Default.
// A defaulted id would bypass the "generated exactly once per logical
// message" invariant enforced by the message factory.

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "msg:{}", self.0)
    }
}

/// Correlates a reply envelope with the request that caused it.
///
/// On a reply, the `CorrelationId` equals the request's [`MessageId`]. The
/// correlator uses this equality to route incoming replies to the pending
/// request record.
///
/// # Example
///
/// ```
/// use nimbus_types::{CorrelationId, MessageId};
///
/// let request_id = MessageId::new();
/// let correlation = CorrelationId::from(request_id);
/// assert_eq!(correlation.uuid(), request_id.uuid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns the [`MessageId`] this correlation refers to.
    #[must_use]
    pub fn message_id(&self) -> MessageId {
        MessageId(self.0)
    }
}

impl From<MessageId> for CorrelationId {
    fn from(id: MessageId) -> Self {
        Self(id.0)
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "corr:{}", self.0)
    }
}
