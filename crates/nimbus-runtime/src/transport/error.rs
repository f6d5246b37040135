//! Transport layer errors.

use nimbus_types::ErrorCode;
use thiserror::Error;

/// Classified transport failures.
///
/// The entity manager's create protocol branches on these variants, so
/// drivers must map their broker's error sub-codes faithfully:
///
/// | Variant | Meaning | Recoverable |
/// |---------|---------|-------------|
/// | [`AlreadyExists`](Self::AlreadyExists) | Entity was created by someone else | No (treated as success) |
/// | [`Conflict`](Self::Conflict) | A racing create is in progress | No (probe instead) |
/// | [`NotFound`](Self::NotFound) | Entity or path is missing | No |
/// | [`Transient`](Self::Transient) | Momentary broker failure | Yes |
/// | [`Closed`](Self::Closed) | Connection is gone | No |
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The entity already exists on the broker.
    #[error("entity already exists: {0}")]
    AlreadyExists(String),

    /// Another create for the same entity is in progress.
    #[error("conflicting operation in progress on {0}")]
    Conflict(String),

    /// The addressed entity does not exist.
    #[error("entity not found: {0}")]
    NotFound(String),

    /// A momentary failure; retrying may succeed.
    #[error("transient transport failure: {0}")]
    Transient(String),

    /// The transport connection has been closed.
    #[error("transport connection closed")]
    Closed,
}

impl ErrorCode for TransportError {
    fn code(&self) -> &'static str {
        match self {
            Self::AlreadyExists(_) => "TRANSPORT_ALREADY_EXISTS",
            Self::Conflict(_) => "TRANSPORT_CONFLICT",
            Self::NotFound(_) => "TRANSPORT_NOT_FOUND",
            Self::Transient(_) => "TRANSPORT_TRANSIENT",
            Self::Closed => "TRANSPORT_CLOSED",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_types::assert_error_codes;

    fn all_variants() -> Vec<TransportError> {
        vec![
            TransportError::AlreadyExists("q".into()),
            TransportError::Conflict("q".into()),
            TransportError::NotFound("q".into()),
            TransportError::Transient("io".into()),
            TransportError::Closed,
        ]
    }

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(&all_variants(), "TRANSPORT_");
    }

    #[test]
    fn only_transient_is_recoverable() {
        for err in all_variants() {
            assert_eq!(
                err.is_recoverable(),
                matches!(err, TransportError::Transient(_))
            );
        }
    }
}
