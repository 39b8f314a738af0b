//! Dispatch layer errors.
//!
//! All dispatch errors use the `DISPATCH_` code prefix.
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`DispatchError::HandlerConflict`] | `DISPATCH_HANDLER_CONFLICT` | No |
//! | [`DispatchError::UnclaimedKey`] | `DISPATCH_UNCLAIMED_KEY` | No |
//! | [`DispatchError::EmptyConfiguration`] | `DISPATCH_EMPTY_CONFIGURATION` | No |
//!
//! The directive intake surfaces (`on_directive` and friends) keep
//! their boolean contracts; this taxonomy backs the registration
//! surfaces, where the caller can actually act on the reason.

use thiserror::Error;
use vox_types::ErrorCode;

/// Error mutating the routing table.
///
/// None of these are recoverable by retry — they indicate a
/// configuration mistake in the set of registered handlers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// A routing key in the candidate's configurations is already
    /// claimed by a different handler. Registration is all-or-nothing,
    /// so nothing was registered.
    #[error("routing key {key} already claimed by handler '{registered}' (candidate '{candidate}')")]
    HandlerConflict {
        /// Fully qualified routing key.
        key: String,
        /// Name of the handler currently owning the key.
        registered: String,
        /// Name of the handler that attempted to claim it.
        candidate: String,
    },

    /// A routing key the handler claims is not currently mapped to it,
    /// so deregistration was refused in full.
    #[error("routing key {key} is not registered to handler '{handler}'")]
    UnclaimedKey {
        /// Fully qualified routing key.
        key: String,
        /// Name of the handler attempting deregistration.
        handler: String,
    },

    /// The handler's configurations are empty; there is nothing to
    /// register or deregister.
    #[error("handler '{handler}' declares no routing keys")]
    EmptyConfiguration {
        /// Name of the offending handler.
        handler: String,
    },
}

impl ErrorCode for DispatchError {
    fn code(&self) -> &'static str {
        match self {
            Self::HandlerConflict { .. } => "DISPATCH_HANDLER_CONFLICT",
            Self::UnclaimedKey { .. } => "DISPATCH_UNCLAIMED_KEY",
            Self::EmptyConfiguration { .. } => "DISPATCH_EMPTY_CONFIGURATION",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}
