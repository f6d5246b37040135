//! Envelope layer errors.

use nimbus_types::ErrorCode;
use thiserror::Error;

/// Errors raised while building or reading envelopes.
///
/// | Variant | Code | Recoverable |
/// |---------|------|-------------|
/// | [`Serialization`](Self::Serialization) | `MESSAGE_SERIALIZATION` | No |
/// | [`MissingProperty`](Self::MissingProperty) | `MESSAGE_MISSING_PROPERTY` | No |
#[derive(Debug, Error)]
pub enum MessageError {
    /// The user payload could not be serialized into transport form.
    ///
    /// Fatal to the call: the same payload will fail the same way on
    /// retry.
    #[error("payload of type {type_name} could not be serialized")]
    Serialization {
        /// Canonical name of the payload type.
        type_name: &'static str,
        /// The underlying serializer error.
        #[source]
        source: serde_json::Error,
    },

    /// A required wire property is absent from a received envelope.
    #[error("envelope is missing the {0} property")]
    MissingProperty(&'static str),
}

impl ErrorCode for MessageError {
    fn code(&self) -> &'static str {
        match self {
            Self::Serialization { .. } => "MESSAGE_SERIALIZATION",
            Self::MissingProperty(_) => "MESSAGE_MISSING_PROPERTY",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_types::assert_error_codes;

    fn serialization_error() -> MessageError {
        MessageError::Serialization {
            type_name: "Sample",
            source: serde_json::from_str::<u32>("not a number").unwrap_err(),
        }
    }

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(
            &[serialization_error(), MessageError::MissingProperty("k")],
            "MESSAGE_",
        );
    }

    #[test]
    fn nothing_is_recoverable() {
        assert!(!serialization_error().is_recoverable());
        assert!(!MessageError::MissingProperty("k").is_recoverable());
    }
}
