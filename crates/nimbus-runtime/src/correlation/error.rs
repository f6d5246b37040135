//! Correlation errors.

use nimbus_types::{ErrorCode, MessageId};
use thiserror::Error;

/// Failures of a pending request.
///
/// | Variant | Code | Recoverable |
/// |---------|------|-------------|
/// | [`Timeout`](Self::Timeout) | `CORRELATION_TIMEOUT` | Yes |
/// | [`Cancelled`](Self::Cancelled) | `CORRELATION_CANCELLED` | No |
/// | [`RemoteFault`](Self::RemoteFault) | `CORRELATION_REMOTE_FAULT` | No |
/// | [`ResponsePayload`](Self::ResponsePayload) | `CORRELATION_RESPONSE_PAYLOAD` | No |
#[derive(Debug, Error)]
pub enum CorrelationError {
    /// No reply arrived before the deadline.
    #[error("request {0} timed out awaiting a reply")]
    Timeout(MessageId),

    /// The request was cancelled locally. The already-sent envelope is
    /// not recalled.
    #[error("request {0} was cancelled")]
    Cancelled(MessageId),

    /// The reply carried the faulted marker: the remote handler failed.
    #[error("request {id} failed remotely: {detail}")]
    RemoteFault {
        /// Id of the failed request.
        id: MessageId,
        /// Serialized remote error detail, verbatim from the reply
        /// payload.
        detail: String,
    },

    /// The reply payload could not be decoded into the expected response
    /// type.
    #[error("reply to {id} could not be decoded")]
    ResponsePayload {
        /// Id of the request.
        id: MessageId,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

impl ErrorCode for CorrelationError {
    fn code(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "CORRELATION_TIMEOUT",
            Self::Cancelled(_) => "CORRELATION_CANCELLED",
            Self::RemoteFault { .. } => "CORRELATION_REMOTE_FAULT",
            Self::ResponsePayload { .. } => "CORRELATION_RESPONSE_PAYLOAD",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_types::assert_error_codes;

    fn all_variants() -> Vec<CorrelationError> {
        let id = MessageId::new();
        vec![
            CorrelationError::Timeout(id),
            CorrelationError::Cancelled(id),
            CorrelationError::RemoteFault {
                id,
                detail: "boom".into(),
            },
            CorrelationError::ResponsePayload {
                id,
                source: serde_json::from_str::<u32>("x").unwrap_err(),
            },
        ]
    }

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(&all_variants(), "CORRELATION_");
    }

    #[test]
    fn only_timeout_is_recoverable() {
        for err in all_variants() {
            assert_eq!(
                err.is_recoverable(),
                matches!(err, CorrelationError::Timeout(_))
            );
        }
    }
}
