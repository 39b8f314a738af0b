//! Completion signalling between handlers and the pipeline.
//!
//! A directive routed through the processed path stays "in flight" —
//! holding its mediums and its slot in dialog ordering — until the
//! handler declares a terminal disposition through the
//! [`CompletionToken`] it received at pre-handle time, or until the
//! pipeline cancels it.
//!
//! # At Most One Disposition
//!
//! The token is idempotent: the first call wins and every later call
//! is ignored. Handlers may therefore race `completed` against a
//! pipeline-issued cancel without coordination — whichever lands first
//! decides the outcome, and the loser is a no-op.
//!
//! ```text
//! pre_handle(d, token)            handler keeps token
//!        │
//!        ▼
//! handle(message_id)              work starts
//!        │
//!        ├── token.completed()        → Completed, mediums released
//!        ├── token.failed("reason")   → Failed, mediums released
//!        └── cancel(message_id)       → Cancelled, mediums released
//! ```

use std::fmt;

/// Terminal disposition of a tracked directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlingOutcome {
    /// The handler finished the directive's work.
    Completed,
    /// The handler could not finish; carries a short description.
    Failed(String),
    /// The pipeline cancelled the directive (dialog change, disable,
    /// or shutdown).
    Cancelled,
}

impl fmt::Display for HandlingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Handed to [`pre_handle`](crate::DirectiveHandler::pre_handle); the
/// handler signals the directive's terminal disposition exactly once.
///
/// Tokens are cheap `Arc`s and safe to move into worker threads or
/// completion callbacks. Calls after the first disposition (including
/// a pipeline cancel) are ignored.
pub trait CompletionToken: Send + Sync {
    /// The directive's work finished successfully.
    fn completed(&self);

    /// The directive's work cannot finish.
    ///
    /// `description` is logged and feeds failure diagnostics; keep it
    /// short and specific.
    fn failed(&self, description: &str);
}
