//! Handler layer errors.

use nimbus_types::ErrorCode;
use thiserror::Error;

/// Error returned by a handler invocation.
///
/// | Variant | Code | Recoverable |
/// |---------|------|-------------|
/// | [`Failed`](Self::Failed) | `HANDLER_FAILED` | Yes, via redelivery |
/// | [`Payload`](Self::Payload) | `HANDLER_PAYLOAD` | No |
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler's own logic failed.
    ///
    /// Reported to the transport as a failed dispatch; redelivery may
    /// succeed if the failure was transient.
    #[error("handler failed: {0}")]
    Failed(String),

    /// The envelope payload could not be decoded into the handler's
    /// message type, or a response could not be encoded.
    ///
    /// Will not change on redelivery.
    #[error("payload for {type_name} could not be converted")]
    Payload {
        /// Canonical name of the message or response type.
        type_name: &'static str,
        /// The underlying serializer error.
        #[source]
        source: serde_json::Error,
    },
}

impl HandlerError {
    /// Creates a [`Failed`](Self::Failed) error from any message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

impl ErrorCode for HandlerError {
    fn code(&self) -> &'static str {
        match self {
            Self::Failed(_) => "HANDLER_FAILED",
            Self::Payload { .. } => "HANDLER_PAYLOAD",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}
