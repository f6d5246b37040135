//! Unified error interface for Nimbus.
//!
//! Every error type in the workspace implements [`ErrorCode`], giving
//! callers a machine-readable code and a retry hint without downcasting.
//!
//! # Code Convention
//!
//! | Layer | Prefix |
//! |-------|--------|
//! | Envelope / serialization | `MESSAGE_` |
//! | Handlers | `HANDLER_` |
//! | Handler registry | `REGISTRY_` |
//! | Transport drivers | `TRANSPORT_` |
//! | Entity manager | `ENTITY_` |
//! | Correlator | `CORRELATION_` |
//! | Interceptors | `INTERCEPTOR_` |
//! | Dispatchers | `DISPATCH_` |
//! | Bus facade | `BUS_` |
//!
//! Codes are UPPER_SNAKE_CASE and stable: changing one is a breaking API
//! change. The [`assert_error_codes`] helper lets each crate's tests verify
//! every variant in one assertion.

/// Machine-readable error code interface.
///
/// # Recoverability
///
/// An error is **recoverable** when retrying the same operation may
/// succeed: timeouts, transient transport failures, handler failures that
/// redelivery may resolve. Non-recoverable errors (unknown message types,
/// serialization failures) will not change on retry and must be fixed in
/// the caller.
///
/// # Example
///
/// ```
/// use nimbus_types::ErrorCode;
///
/// #[derive(Debug)]
/// enum SendError {
///     Timeout,
///     BadPayload,
/// }
///
/// impl ErrorCode for SendError {
///     fn code(&self) -> &'static str {
///         match self {
///             Self::Timeout => "SEND_TIMEOUT",
///             Self::BadPayload => "SEND_BAD_PAYLOAD",
///         }
///     }
///
///     fn is_recoverable(&self) -> bool {
///         matches!(self, Self::Timeout)
///     }
/// }
///
/// assert_eq!(SendError::Timeout.code(), "SEND_TIMEOUT");
/// assert!(SendError::Timeout.is_recoverable());
/// ```
pub trait ErrorCode {
    /// Returns a stable, UPPER_SNAKE_CASE error code.
    fn code(&self) -> &'static str;

    /// Returns whether retrying the failed operation may succeed.
    fn is_recoverable(&self) -> bool;
}

/// Asserts that an error's code follows Nimbus conventions.
///
/// Checks that the code is non-empty, carries the expected prefix, and is
/// UPPER_SNAKE_CASE.
///
/// # Panics
///
/// Panics with a descriptive message when any check fails.
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "error code '{code}' must start with prefix '{expected_prefix}'"
    );
    assert!(
        is_upper_snake_case(code),
        "error code '{code}' must be UPPER_SNAKE_CASE"
    );
}

/// Asserts codes for a batch of variants, typically every variant of an
/// error enum.
///
/// # Example
///
/// ```
/// use nimbus_types::{assert_error_codes, ErrorCode};
///
/// #[derive(Debug)]
/// enum E { A, B }
///
/// impl ErrorCode for E {
///     fn code(&self) -> &'static str {
///         match self {
///             Self::A => "X_A",
///             Self::B => "X_B",
///         }
///     }
///     fn is_recoverable(&self) -> bool { false }
/// }
///
/// assert_error_codes(&[E::A, E::B], "X_");
/// ```
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() || s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum TestError {
        Transient,
        Permanent,
    }

    impl ErrorCode for TestError {
        fn code(&self) -> &'static str {
            match self {
                Self::Transient => "TEST_TRANSIENT",
                Self::Permanent => "TEST_PERMANENT",
            }
        }

        fn is_recoverable(&self) -> bool {
            matches!(self, Self::Transient)
        }
    }

    #[test]
    fn code_and_recoverability() {
        assert_eq!(TestError::Transient.code(), "TEST_TRANSIENT");
        assert!(TestError::Transient.is_recoverable());
        assert!(!TestError::Permanent.is_recoverable());
    }

    #[test]
    fn batch_assertion_accepts_valid_codes() {
        assert_error_codes(&[TestError::Transient, TestError::Permanent], "TEST_");
    }

    #[test]
    #[should_panic(expected = "must start with prefix")]
    fn wrong_prefix_panics() {
        assert_error_code(&TestError::Transient, "OTHER_");
    }

    #[test]
    fn snake_case_checker() {
        assert!(is_upper_snake_case("A_B_1"));
        assert!(!is_upper_snake_case(""));
        assert!(!is_upper_snake_case("a_b"));
        assert!(!is_upper_snake_case("_A"));
        assert!(!is_upper_snake_case("A__B"));
    }
}
