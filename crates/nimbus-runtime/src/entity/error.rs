//! Entity manager errors.

use crate::transport::TransportError;
use nimbus_types::ErrorCode;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the entity manager.
#[derive(Debug, Error)]
pub enum EntityError {
    /// All creation attempts for an entity failed.
    #[error("failed to create {path} after {retry_count} attempts")]
    CreationFailed {
        /// The path or subscription key being created.
        path: String,
        /// How many attempts were made.
        retry_count: u32,
        /// The last transport failure.
        #[source]
        source: TransportError,
    },

    /// The known-set warm-up exceeded the configured timeout.
    #[error("timed out listing transport entities after {0:?}")]
    Timeout(Duration),

    /// The known-set warm-up list call failed.
    #[error("failed to list transport entities")]
    ListFailed {
        /// The underlying transport failure.
        #[source]
        source: TransportError,
    },
}

impl ErrorCode for EntityError {
    fn code(&self) -> &'static str {
        match self {
            Self::CreationFailed { .. } => "ENTITY_CREATION_FAILED",
            Self::Timeout(_) => "ENTITY_TIMEOUT",
            Self::ListFailed { .. } => "ENTITY_LIST_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::ListFailed { .. })
    }
}
