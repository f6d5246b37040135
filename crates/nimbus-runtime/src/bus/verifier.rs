//! Pre-flight message type verification.

use super::error::BusError;
use nimbus_handler::HandlerRegistry;
use std::sync::Arc;

/// Refuses sends of message types that were never registered.
///
/// Consulted by every `send`, `publish`, and `request` before any envelope
/// is built, so a typo'd or forgotten registration fails fast instead of
/// producing an undeliverable message.
pub struct KnownMessageTypeVerifier {
    registry: Arc<HandlerRegistry>,
}

impl KnownMessageTypeVerifier {
    /// Creates a verifier over the bus's registry.
    #[must_use]
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    /// Verifies a queue-bound message type.
    ///
    /// # Errors
    ///
    /// [`BusError::UnknownMessageType`] when the type is not registered
    /// for queue travel.
    pub fn verify_queue(&self, message_type: &str) -> Result<(), BusError> {
        if self.registry.is_queue_type(message_type) {
            Ok(())
        } else {
            Err(BusError::UnknownMessageType(message_type.to_string()))
        }
    }

    /// Verifies a topic-bound message type.
    ///
    /// # Errors
    ///
    /// [`BusError::UnknownMessageType`] when the type is not registered
    /// for topic travel.
    pub fn verify_topic(&self, message_type: &str) -> Result<(), BusError> {
        if self.registry.is_topic_type(message_type) {
            Ok(())
        } else {
            Err(BusError::UnknownMessageType(message_type.to_string()))
        }
    }
}
