//! Directive construction errors.
//!
//! All directive errors use the `DIRECTIVE_` code prefix.
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`DirectiveError::EmptyNamespace`] | `DIRECTIVE_EMPTY_NAMESPACE` | No |
//! | [`DirectiveError::EmptyName`] | `DIRECTIVE_EMPTY_NAME` | No |

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vox_types::ErrorCode;

/// Error building a [`Directive`](crate::Directive).
///
/// Both variants indicate malformed wire input; retrying with the same
/// input cannot succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum DirectiveError {
    /// The directive header carried an empty namespace.
    #[error("directive namespace must not be empty")]
    EmptyNamespace,

    /// The directive header carried an empty name.
    #[error("directive name must not be empty")]
    EmptyName,
}

impl ErrorCode for DirectiveError {
    fn code(&self) -> &'static str {
        match self {
            Self::EmptyNamespace => "DIRECTIVE_EMPTY_NAMESPACE",
            Self::EmptyName => "DIRECTIVE_EMPTY_NAME",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}
