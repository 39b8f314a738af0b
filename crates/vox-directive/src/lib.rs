//! Directive values for the Vox pipeline.
//!
//! This crate defines the [`Directive`] value type — the immutable
//! command object the cloud delivers to a device — together with the
//! [`ExceptionKind`]/[`ExceptionReporter`] surface used to report
//! undeliverable directives back upstream.
//!
//! # Crate Architecture
//!
//! Part of the SDK layer:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SDK Layer                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  vox-types     : RoutingKey, Medium, BlockingPolicy         │
//! │  vox-directive : Directive, ExceptionKind  ◄── HERE         │
//! │  vox-handler   : DirectiveHandler trait, CompletionToken    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Directive Flow
//!
//! ```text
//! Cloud ──(transport, parsing: out of scope)──► Directive
//!     │
//!     ▼
//! DirectiveSequencer::on_directive        (vox-dispatch)
//!     │                 │
//!     ▼                 ▼ (undeliverable)
//! DirectiveHandler    ExceptionReporter::send_exception_encountered
//! ```
//!
//! # Usage
//!
//! ```
//! use vox_directive::Directive;
//! use serde_json::json;
//!
//! let directive = Directive::builder("Alerts", "SetAlert")
//!     .dialog_request_id("turn-42")
//!     .payload(json!({ "type": "TIMER", "scheduledTime": "2024-01-01T00:00:00Z" }))
//!     .build()?;
//!
//! assert_eq!(directive.key().fqn(), "Alerts::SetAlert");
//! # Ok::<(), vox_directive::DirectiveError>(())
//! ```

mod directive;
mod error;
mod exception;

pub use directive::{Directive, DirectiveBuilder, DirectiveHeader};
pub use error::DirectiveError;
pub use exception::{ExceptionKind, ExceptionReporter};

// Re-export the routing key for convenience; most users of this crate
// need both.
pub use vox_types::RoutingKey;
