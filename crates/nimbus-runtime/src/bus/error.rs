//! Facade errors.

use crate::correlation::CorrelationError;
use crate::entity::EntityError;
use crate::interceptor::InterceptorError;
use crate::transport::TransportError;
use nimbus_message::MessageError;
use nimbus_types::ErrorCode;
use thiserror::Error;

/// Errors surfaced by the bus facade's send-side operations.
///
/// Apart from [`UnknownMessageType`](Self::UnknownMessageType), every
/// variant wraps a lower layer's error transparently, preserving its
/// message, code, and source chain.
#[derive(Debug, Error)]
pub enum BusError {
    /// The message type is not registered with this bus instance. Never
    /// retried: registration is fixed at startup.
    #[error("message type {0} is not registered with this bus")]
    UnknownMessageType(String),

    /// Envelope construction failed.
    #[error(transparent)]
    Message(#[from] MessageError),

    /// Entity provisioning failed.
    #[error(transparent)]
    Entity(#[from] EntityError),

    /// The transport rejected the operation.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The pending request failed: timeout, cancellation, remote fault,
    /// or an undecodable reply.
    #[error(transparent)]
    Correlation(#[from] CorrelationError),

    /// An outbound interceptor rejected the send.
    #[error(transparent)]
    Interceptor(#[from] InterceptorError),
}

impl ErrorCode for BusError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnknownMessageType(_) => "BUS_UNKNOWN_MESSAGE_TYPE",
            Self::Message(inner) => inner.code(),
            Self::Entity(inner) => inner.code(),
            Self::Transport(inner) => inner.code(),
            Self::Correlation(inner) => inner.code(),
            Self::Interceptor(inner) => inner.code(),
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::UnknownMessageType(_) => false,
            Self::Message(inner) => inner.is_recoverable(),
            Self::Entity(inner) => inner.is_recoverable(),
            Self::Transport(inner) => inner.is_recoverable(),
            Self::Correlation(inner) => inner.is_recoverable(),
            Self::Interceptor(inner) => inner.is_recoverable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_type_is_terminal() {
        let err = BusError::UnknownMessageType("Nope".into());
        assert_eq!(err.code(), "BUS_UNKNOWN_MESSAGE_TYPE");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn wrapped_errors_keep_their_codes() {
        let err = BusError::from(TransportError::Transient("io".into()));
        assert_eq!(err.code(), "TRANSPORT_TRANSIENT");
        assert!(err.is_recoverable());

        let err = BusError::from(CorrelationError::Timeout(nimbus_types::MessageId::new()));
        assert_eq!(err.code(), "CORRELATION_TIMEOUT");
    }
}
