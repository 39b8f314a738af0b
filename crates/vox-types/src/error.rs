//! Unified error interface for the Vox workspace.
//!
//! Every public error enum in the pipeline implements [`ErrorCode`] so
//! that callers, logs, and cloud exception reports can consume errors
//! uniformly without matching on concrete types.
//!
//! # Conventions
//!
//! - Codes are UPPER_SNAKE_CASE with a per-crate prefix
//!   (`DIRECTIVE_`, `DISPATCH_`).
//! - Codes are stable: changing one is an API break.
//! - Recoverability answers "can retrying or a caller-side action
//!   succeed?" — a disabled sequencer is recoverable (enable it), a
//!   handler-registration conflict is not (fix the configuration).
//!
//! # Example
//!
//! ```
//! use vox_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum IntakeError {
//!     Disabled,
//!     ShuttingDown,
//! }
//!
//! impl ErrorCode for IntakeError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::Disabled => "INTAKE_DISABLED",
//!             Self::ShuttingDown => "INTAKE_SHUTTING_DOWN",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::Disabled)
//!     }
//! }
//!
//! let err = IntakeError::Disabled;
//! assert_eq!(err.code(), "INTAKE_DISABLED");
//! assert!(err.is_recoverable());
//! ```

/// Machine-readable error classification.
///
/// Implemented by every error enum in the workspace. The dispatch
/// layer logs `code()` alongside the human-readable `Display` text so
/// operators can grep and alert on stable identifiers.
pub trait ErrorCode {
    /// Returns the stable machine-readable code for this error.
    ///
    /// UPPER_SNAKE_CASE, prefixed with the owning crate's domain
    /// (e.g. `"DISPATCH_HANDLER_CONFLICT"`).
    fn code(&self) -> &'static str;

    /// Returns whether retrying or caller-side action can succeed.
    fn is_recoverable(&self) -> bool;
}

/// Asserts that an error's code follows workspace conventions.
///
/// Checks the code is non-empty, UPPER_SNAKE_CASE, and carries the
/// expected prefix. Intended for use in each crate's error tests.
///
/// # Panics
///
/// Panics with a descriptive message when a check fails.
///
/// # Example
///
/// ```
/// use vox_types::{assert_error_code, ErrorCode};
///
/// #[derive(Debug)]
/// struct Oops;
///
/// impl ErrorCode for Oops {
///     fn code(&self) -> &'static str { "TEST_OOPS" }
///     fn is_recoverable(&self) -> bool { false }
/// }
///
/// assert_error_code(&Oops, "TEST_");
/// ```
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

/// Asserts conventions for every variant of an error enum at once.
///
/// # Example
///
/// ```
/// use vox_types::{assert_error_codes, ErrorCode};
///
/// #[derive(Debug)]
/// enum E { A, B }
///
/// impl ErrorCode for E {
///     fn code(&self) -> &'static str {
///         match self {
///             Self::A => "TEST_A",
///             Self::B => "TEST_B",
///         }
///     }
///     fn is_recoverable(&self) -> bool { false }
/// }
///
/// assert_error_codes(&[E::A, E::B], "TEST_");
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
    enum SampleError {
        Transient,
        Fatal,
    }

    impl ErrorCode for SampleError {
        fn code(&self) -> &'static str {
            match self {
                Self::Transient => "SAMPLE_TRANSIENT",
                Self::Fatal => "SAMPLE_FATAL",
            }
        }

        fn is_recoverable(&self) -> bool {
            matches!(self, Self::Transient)
        }
    }

    #[test]
    fn error_code_trait() {
        assert_eq!(SampleError::Transient.code(), "SAMPLE_TRANSIENT");
        assert!(SampleError::Transient.is_recoverable());
        assert!(!SampleError::Fatal.is_recoverable());
    }

    #[test]
    fn assert_error_codes_accepts_valid() {
        assert_error_codes(&[SampleError::Transient, SampleError::Fatal], "SAMPLE_");
    }

    #[test]
    #[should_panic(expected = "must start with prefix")]
    fn assert_error_code_rejects_wrong_prefix() {
        assert_error_code(&SampleError::Fatal, "OTHER_");
    }

    #[test]
    fn upper_snake_case_rules() {
        assert!(is_upper_snake_case("DISPATCH_UNKNOWN_KEY"));
        assert!(is_upper_snake_case("CODE_123"));
        assert!(!is_upper_snake_case(""));
        assert!(!is_upper_snake_case("lower_case"));
        assert!(!is_upper_snake_case("_LEADING"));
        assert!(!is_upper_snake_case("TRAILING_"));
        assert!(!is_upper_snake_case("DOUBLE__UNDERSCORE"));
    }
}
