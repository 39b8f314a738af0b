//! The directive handler capability set.
//!
//! A handler is a capability agent's entry point into the pipeline: it
//! claims one or more routing keys, declares how each consumes shared
//! mediums, and implements the staged handling protocol.
//!
//! # Two Dispatch Paths
//!
//! | Path | Methods involved | When |
//! |------|------------------|------|
//! | Immediate | `handle_immediately` | Dialog-free directives, when the sequencer is configured for it |
//! | Processed | `pre_handle` → `handle` → token / `cancel` | Everything else |
//!
//! # Staged Protocol (processed path)
//!
//! ```text
//! pre_handle(directive, token)   acceptance time, must not block;
//!        │                       parse payload, stash the token
//!        ▼
//! handle(message_id)             admission time; start the real work,
//!        │                       return false if the id is unknown
//!        ▼
//! token.completed()/failed(..)   whenever the work ends
//!
//! cancel(message_id)             may arrive at ANY point after
//!                                pre_handle; must be idempotent
//! ```
//!
//! `handle` and `cancel` receive only the message id: the directive
//! content was already delivered at pre-handle time, and the id is the
//! stable handle for the rest of the lifecycle.

use crate::CompletionToken;
use std::collections::HashMap;
use std::sync::Arc;
use vox_directive::Directive;
use vox_types::{BlockingPolicy, RoutingKey};

/// A capability agent's directive handling surface.
///
/// Implementations must be `Send + Sync`; the pipeline invokes them
/// from its receiving and handling threads, and `cancel` may race
/// `handle` and the completion token.
///
/// # Reentrancy
///
/// `cancel` must tolerate cancel-after-complete and the completion
/// token must tolerate complete-after-cancel; both are ordinary races
/// in this pipeline, not errors.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use std::sync::Arc;
/// use parking_lot::Mutex;
/// use vox_directive::Directive;
/// use vox_handler::{CompletionToken, DirectiveHandler};
/// use vox_types::{BlockingPolicy, RoutingKey};
///
/// /// Discards speech directives after acknowledging them.
/// struct NullSpeechHandler {
///     tokens: Mutex<HashMap<String, Arc<dyn CompletionToken>>>,
/// }
///
/// impl DirectiveHandler for NullSpeechHandler {
///     fn name(&self) -> &str {
///         "NullSpeechHandler"
///     }
///
///     fn configurations(&self) -> HashMap<RoutingKey, BlockingPolicy> {
///         HashMap::from([(
///             RoutingKey::new("SpeechSynthesizer", "Speak"),
///             BlockingPolicy::audio_blocking(),
///         )])
///     }
///
///     fn handle_immediately(&self, _directive: &Directive) -> bool {
///         true
///     }
///
///     fn pre_handle(&self, directive: Arc<Directive>, token: Arc<dyn CompletionToken>) {
///         self.tokens
///             .lock()
///             .insert(directive.message_id().to_string(), token);
///     }
///
///     fn handle(&self, message_id: &str) -> bool {
///         match self.tokens.lock().remove(message_id) {
///             Some(token) => {
///                 token.completed();
///                 true
///             }
///             None => false,
///         }
///     }
///
///     fn cancel(&self, message_id: &str) {
///         self.tokens.lock().remove(message_id);
///     }
/// }
/// ```
pub trait DirectiveHandler: Send + Sync {
    /// Stable handler name for logs and registration conflict
    /// diagnostics.
    fn name(&self) -> &str;

    /// The routing keys this handler claims and the blocking policy
    /// for each.
    ///
    /// Evaluated at registration and deregistration time; the set must
    /// be stable for the lifetime of the registration.
    fn configurations(&self) -> HashMap<RoutingKey, BlockingPolicy>;

    /// Handles a directive synchronously, outside any dialog.
    ///
    /// Best-effort: returns `false` if the directive cannot be
    /// handled. No completion token, no cancellation — the call is the
    /// whole lifecycle.
    fn handle_immediately(&self, directive: &Directive) -> bool;

    /// Prepares a directive for handling.
    ///
    /// Called on the pipeline's threads at acceptance time; **must not
    /// block**. Typical work: parse the payload, allocate state, stash
    /// the token. Scheduling real work belongs in [`handle`](Self::handle).
    fn pre_handle(&self, directive: Arc<Directive>, token: Arc<dyn CompletionToken>);

    /// Starts the (potentially long-running) work for a previously
    /// pre-handled directive.
    ///
    /// Returns `false` if `message_id` is unknown or preparation
    /// failed; the pipeline then treats the directive as unhandled.
    fn handle(&self, message_id: &str) -> bool;

    /// Cancels pending or in-flight work for `message_id`.
    ///
    /// Must be idempotent and must tolerate ids that already
    /// completed or were never seen.
    fn cancel(&self, message_id: &str);
}
