//! Testing harness for directive handlers and the dispatch pipeline.
//!
//! Provides a recording [`MockDirectiveHandler`] plus small recording
//! doubles for the collaborator interfaces, so pipeline behavior can
//! be asserted without real capability agents and without sleeps:
//! every recorded event notifies a condvar, and the `wait_for_*`
//! helpers block until an expectation holds or a deadline passes.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use vox_directive::Directive;
//! use vox_handler::testing::{MockDirectiveHandler, RecordingCompletionToken};
//! use vox_handler::DirectiveHandler;
//! use vox_types::BlockingPolicy;
//!
//! let handler = MockDirectiveHandler::new("speech")
//!     .with_key("SpeechSynthesizer", "Speak", BlockingPolicy::audio_blocking());
//!
//! let directive = Arc::new(
//!     Directive::builder("SpeechSynthesizer", "Speak")
//!         .message_id("m1")
//!         .build()
//!         .expect("valid directive"),
//! );
//!
//! let token = Arc::new(RecordingCompletionToken::new());
//! handler.pre_handle(Arc::clone(&directive), token);
//! assert!(handler.handle("m1"));
//! assert_eq!(handler.handled(), vec!["m1".to_string()]);
//! ```

use crate::{CompletionToken, DirectiveHandler, HandlingOutcome};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use vox_directive::{Directive, ExceptionKind, ExceptionReporter};
use vox_types::{BlockingPolicy, RoutingKey};

/// Default deadline for `wait_for_*` helpers.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct MockState {
    immediately_handled: Vec<String>,
    pre_handled: Vec<String>,
    handled: Vec<String>,
    cancelled: Vec<String>,
    tokens: HashMap<String, Arc<dyn CompletionToken>>,
}

/// A recording, scriptable [`DirectiveHandler`].
///
/// By default every call succeeds and handling stays open until the
/// test resolves it with [`complete`](Self::complete) or
/// [`fail`](Self::fail). Builder-style setup:
///
/// | Method | Effect |
/// |--------|--------|
/// | [`with_key`](Self::with_key) | Claim a routing key with a policy |
/// | [`auto_complete`](Self::auto_complete) | `handle` immediately fires the token |
/// | [`refuse_handle`](Self::refuse_handle) | `handle` returns `false` |
/// | [`refuse_immediate`](Self::refuse_immediate) | `handle_immediately` returns `false` |
pub struct MockDirectiveHandler {
    name: String,
    configurations: HashMap<RoutingKey, BlockingPolicy>,
    auto_complete: bool,
    handle_result: bool,
    immediate_result: bool,
    state: Mutex<MockState>,
    activity: Condvar,
}

impl MockDirectiveHandler {
    /// Creates a mock with no claimed keys.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            configurations: HashMap::new(),
            auto_complete: false,
            handle_result: true,
            immediate_result: true,
            state: Mutex::default(),
            activity: Condvar::new(),
        }
    }

    /// Claims `(namespace, name)` with the given policy.
    #[must_use]
    pub fn with_key(
        mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        policy: BlockingPolicy,
    ) -> Self {
        self.configurations
            .insert(RoutingKey::new(namespace, name), policy);
        self
    }

    /// `handle` fires the completion token before returning.
    #[must_use]
    pub fn auto_complete(mut self) -> Self {
        self.auto_complete = true;
        self
    }

    /// `handle` returns `false` (handler-refused path).
    #[must_use]
    pub fn refuse_handle(mut self) -> Self {
        self.handle_result = false;
        self
    }

    /// `handle_immediately` returns `false`.
    #[must_use]
    pub fn refuse_immediate(mut self) -> Self {
        self.immediate_result = false;
        self
    }

    /// Message ids seen by `handle_immediately`, in call order.
    #[must_use]
    pub fn immediately_handled(&self) -> Vec<String> {
        self.state.lock().immediately_handled.clone()
    }

    /// Message ids seen by `pre_handle`, in call order.
    #[must_use]
    pub fn pre_handled(&self) -> Vec<String> {
        self.state.lock().pre_handled.clone()
    }

    /// Message ids seen by `handle`, in call order.
    #[must_use]
    pub fn handled(&self) -> Vec<String> {
        self.state.lock().handled.clone()
    }

    /// Message ids seen by `cancel`, in call order (duplicates kept).
    #[must_use]
    pub fn cancelled(&self) -> Vec<String> {
        self.state.lock().cancelled.clone()
    }

    /// Fires `completed` on the stored token for `message_id`.
    ///
    /// Returns `false` if no token is held (never pre-handled, or
    /// already resolved).
    pub fn complete(&self, message_id: &str) -> bool {
        let token = self.state.lock().tokens.remove(message_id);
        match token {
            Some(token) => {
                token.completed();
                true
            }
            None => false,
        }
    }

    /// Fires `failed` on the stored token for `message_id`.
    pub fn fail(&self, message_id: &str, description: &str) -> bool {
        let token = self.state.lock().tokens.remove(message_id);
        match token {
            Some(token) => {
                token.failed(description);
                true
            }
            None => false,
        }
    }

    /// Blocks until `handle` has seen `message_id`.
    pub fn wait_for_handle(&self, message_id: &str, timeout: Duration) -> bool {
        self.wait_until(timeout, |s| s.handled.iter().any(|m| m == message_id))
    }

    /// Blocks until `pre_handle` has seen `message_id`.
    pub fn wait_for_pre_handle(&self, message_id: &str, timeout: Duration) -> bool {
        self.wait_until(timeout, |s| s.pre_handled.iter().any(|m| m == message_id))
    }

    /// Blocks until `cancel` has seen `message_id`.
    pub fn wait_for_cancel(&self, message_id: &str, timeout: Duration) -> bool {
        self.wait_until(timeout, |s| s.cancelled.iter().any(|m| m == message_id))
    }

    /// Blocks until `handle_immediately` has seen `message_id`.
    pub fn wait_for_immediate(&self, message_id: &str, timeout: Duration) -> bool {
        self.wait_until(timeout, |s| {
            s.immediately_handled.iter().any(|m| m == message_id)
        })
    }

    fn wait_until(&self, timeout: Duration, pred: impl Fn(&MockState) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !pred(&state) {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            if self.activity.wait_for(&mut state, deadline - now).timed_out() {
                return pred(&state);
            }
        }
        true
    }
}

impl DirectiveHandler for MockDirectiveHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn configurations(&self) -> HashMap<RoutingKey, BlockingPolicy> {
        self.configurations.clone()
    }

    fn handle_immediately(&self, directive: &Directive) -> bool {
        let mut state = self.state.lock();
        state
            .immediately_handled
            .push(directive.message_id().to_string());
        self.activity.notify_all();
        self.immediate_result
    }

    fn pre_handle(&self, directive: Arc<Directive>, token: Arc<dyn CompletionToken>) {
        let mut state = self.state.lock();
        let id = directive.message_id().to_string();
        state.pre_handled.push(id.clone());
        state.tokens.insert(id, token);
        self.activity.notify_all();
    }

    fn handle(&self, message_id: &str) -> bool {
        let token = {
            let mut state = self.state.lock();
            if !state.tokens.contains_key(message_id) {
                return false;
            }
            state.handled.push(message_id.to_string());
            self.activity.notify_all();
            if self.auto_complete {
                state.tokens.remove(message_id)
            } else {
                None
            }
        };
        // Fire outside the lock: the token re-enters pipeline state.
        if let Some(token) = token {
            token.completed();
        }
        self.handle_result
    }

    fn cancel(&self, message_id: &str) {
        let mut state = self.state.lock();
        state.cancelled.push(message_id.to_string());
        state.tokens.remove(message_id);
        self.activity.notify_all();
    }
}

/// A [`CompletionToken`] that records every disposition it receives.
///
/// Unlike the pipeline's real token it is **not** idempotent — it
/// records everything, so tests can assert that a handler signalled
/// exactly once.
#[derive(Default)]
pub struct RecordingCompletionToken {
    outcomes: Mutex<Vec<HandlingOutcome>>,
}

impl RecordingCompletionToken {
    /// Creates an empty token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded dispositions, in order.
    #[must_use]
    pub fn outcomes(&self) -> Vec<HandlingOutcome> {
        self.outcomes.lock().clone()
    }
}

impl CompletionToken for RecordingCompletionToken {
    fn completed(&self) {
        self.outcomes.lock().push(HandlingOutcome::Completed);
    }

    fn failed(&self, description: &str) {
        self.outcomes
            .lock()
            .push(HandlingOutcome::Failed(description.to_string()));
    }
}

/// A recorded exception report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedException {
    /// The directive's raw wire text.
    pub unparsed: String,
    /// Failure classification.
    pub kind: ExceptionKind,
    /// Human-readable message.
    pub message: String,
}

/// An [`ExceptionReporter`] that records reports and wakes waiters.
#[derive(Default)]
pub struct RecordingExceptionReporter {
    reports: Mutex<Vec<RecordedException>>,
    activity: Condvar,
}

impl RecordingExceptionReporter {
    /// Creates an empty reporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded reports, in order.
    #[must_use]
    pub fn reports(&self) -> Vec<RecordedException> {
        self.reports.lock().clone()
    }

    /// Blocks until at least `count` reports have arrived.
    pub fn wait_for_reports(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut reports = self.reports.lock();
        while reports.len() < count {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            if self
                .activity
                .wait_for(&mut reports, deadline - now)
                .timed_out()
            {
                return reports.len() >= count;
            }
        }
        true
    }
}

impl ExceptionReporter for RecordingExceptionReporter {
    fn send_exception_encountered(&self, unparsed: &str, kind: ExceptionKind, message: &str) {
        let mut reports = self.reports.lock();
        reports.push(RecordedException {
            unparsed: unparsed.to_string(),
            kind,
            message: message.to_string(),
        });
        self.activity.notify_all();
    }
}
