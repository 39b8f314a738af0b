//! Exception reporting toward the cloud.
//!
//! When the pipeline cannot deliver a directive — no handler claims its
//! key, or the claiming handler refuses it — the failure is reported
//! upstream so the cloud can stop waiting on the device. Delivery is
//! fire-and-forget from the pipeline's point of view; the transport
//! behind [`ExceptionReporter`] is out of scope.
//!
//! # Example
//!
//! ```
//! use vox_directive::{ExceptionKind, ExceptionReporter};
//!
//! struct LogReporter;
//!
//! impl ExceptionReporter for LogReporter {
//!     fn send_exception_encountered(&self, unparsed: &str, kind: ExceptionKind, message: &str) {
//!         eprintln!("[{}] {message}: {unparsed}", kind.wire_name());
//!     }
//! }
//!
//! let reporter = LogReporter;
//! reporter.send_exception_encountered("{...}", ExceptionKind::UnsupportedOperation, "no handler");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a directive delivery failure.
///
/// The wire names are a cloud API contract and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExceptionKind {
    /// No handler claims the directive's routing key, or the claiming
    /// handler refused it.
    UnsupportedOperation,
    /// The directive was recognized but its content was not usable.
    UnexpectedInformationReceived,
    /// The device failed internally while dispatching.
    InternalError,
}

impl ExceptionKind {
    /// The stable wire name sent to the cloud.
    #[must_use]
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::UnsupportedOperation => "UNSUPPORTED_OPERATION",
            Self::UnexpectedInformationReceived => "UNEXPECTED_INFORMATION_RECEIVED",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Sends directive delivery failures upstream.
///
/// Implementations forward to the cloud over the device's event
/// transport. The pipeline calls this from its receiving thread, so
/// implementations should hand off quickly rather than block.
pub trait ExceptionReporter: Send + Sync {
    /// Reports that `unparsed` (the directive's raw wire text) could
    /// not be delivered, with a machine [`ExceptionKind`] and a short
    /// human-readable message.
    fn send_exception_encountered(&self, unparsed: &str, kind: ExceptionKind, message: &str);
}
