//! Dispatch errors.

use crate::bus::BusError;
use crate::interceptor::InterceptorError;
use nimbus_handler::{HandlerError, HandlerShape};
use nimbus_types::{ErrorCode, MessageId};
use thiserror::Error;

/// Failure of one inbound dispatch.
///
/// The message pump maps `Err` to a transport nack, so recoverable
/// variants translate into redelivery attempts.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The envelope lacks a required property (usually the type header).
    #[error("envelope is missing the {0} property")]
    MissingProperty(&'static str),

    /// No handler is registered for the envelope's message type.
    #[error("no {shape:?} handler registered for {message_type}")]
    NoHandler {
        /// Shape the dispatcher was serving.
        shape: HandlerShape,
        /// The unhandled message type.
        message_type: String,
    },

    /// A request envelope arrived without a reply-to path.
    #[error("request envelope has no reply-to path")]
    MissingReplyTo,

    /// A request handler completed without producing a response value.
    #[error("request handler for {0} produced no response")]
    MissingResponse(String),

    /// The handler failed.
    #[error(transparent)]
    Handler(#[from] HandlerError),

    /// A before-hook rejected the dispatch.
    #[error(transparent)]
    Interceptor(#[from] InterceptorError),

    /// One or more handlers failed in an event fan-out. Carries every
    /// failed handler's error; the dispatch is reported failed as a whole
    /// so the transport may redeliver.
    #[error("{failed} of {total} handlers failed", failed = failures.len())]
    Composite {
        /// Number of handlers invoked.
        total: usize,
        /// The individual handler failures.
        failures: Vec<HandlerError>,
    },

    /// The reply to a completed request could not be sent.
    #[error("reply for request {request} could not be sent")]
    Reply {
        /// The request being answered.
        request: MessageId,
        /// The outbound failure.
        #[source]
        source: Box<BusError>,
    },
}

impl ErrorCode for DispatchError {
    fn code(&self) -> &'static str {
        match self {
            Self::MissingProperty(_) => "DISPATCH_MISSING_PROPERTY",
            Self::NoHandler { .. } => "DISPATCH_NO_HANDLER",
            Self::MissingReplyTo => "DISPATCH_MISSING_REPLY_TO",
            Self::MissingResponse(_) => "DISPATCH_MISSING_RESPONSE",
            Self::Handler(inner) => inner.code(),
            Self::Interceptor(inner) => inner.code(),
            Self::Composite { .. } => "DISPATCH_COMPOSITE",
            Self::Reply { .. } => "DISPATCH_REPLY_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Handler(inner) => inner.is_recoverable(),
            Self::Composite { .. } | Self::Reply { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_reports_counts() {
        let err = DispatchError::Composite {
            total: 3,
            failures: vec![
                HandlerError::failed("a"),
                HandlerError::failed("b"),
            ],
        };
        assert_eq!(err.to_string(), "2 of 3 handlers failed");
        assert_eq!(err.code(), "DISPATCH_COMPOSITE");
        assert!(err.is_recoverable());
    }

    #[test]
    fn handler_errors_delegate_codes() {
        let err = DispatchError::from(HandlerError::failed("x"));
        assert_eq!(err.code(), "HANDLER_FAILED");
        assert!(err.is_recoverable());
    }

    #[test]
    fn lookup_failures_are_terminal() {
        let err = DispatchError::NoHandler {
            shape: HandlerShape::Command,
            message_type: "Nope".into(),
        };
        assert_eq!(err.code(), "DISPATCH_NO_HANDLER");
        assert!(!err.is_recoverable());
    }
}
