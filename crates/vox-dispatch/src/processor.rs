//! Dialog-scoped ordered directive handling.
//!
//! The processor owns the handling queue and the single worker thread
//! that drives the staged protocol: dialog re-check, blocking-policy
//! admission, then `handle`. Directives are tracked from acceptance
//! until a terminal state; a dialog change cancels everything that no
//! longer belongs to the active dialog, whether queued or in flight.
//!
//! # Tracked Directive States
//!
//! ```text
//! Queued ──► Admitting ──► Handling ──► Completed
//!    │           │            │    └──► Failed
//!    │           │            │
//!    └───────────┴────────────┴───────► Cancelled
//!                                       (dialog change, disable,
//!                                        shutdown)
//! ```
//!
//! Terminal states release the directive's mediums and drop it from
//! tracking. The transition into a terminal state happens exactly
//! once: the completion token and the cancellation paths race, the
//! first wins, the loser becomes a no-op.
//!
//! # Ordering
//!
//! One worker drives admissions head-of-queue; a blocked directive
//! delays everything behind it. That is deliberate — it is what makes
//! same-dialog directives reach handlers in delivery order. `handle`
//! only *starts* work, so non-conflicting directives still end up in
//! flight concurrently.

use crate::{BlockingPolicyGate, DirectiveRouter};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};
use vox_directive::{Directive, ExceptionKind, ExceptionReporter};
use vox_handler::{CompletionToken, HandlingOutcome};
use vox_types::BlockingPolicy;

/// A directive accepted into the processor, tracked until terminal.
struct DirectiveTracker {
    directive: Arc<Directive>,
    /// Dialog id stamped at acceptance; empty-id directives carry the
    /// dialog that was current when they were accepted.
    dialog_request_id: String,
    policy: BlockingPolicy,
    /// Cooperative abort flag, doubles as the gate's cancel token.
    cancelled: AtomicBool,
    resolved: AtomicBool,
    outcome: Mutex<Option<HandlingOutcome>>,
}

impl DirectiveTracker {
    fn new(directive: Arc<Directive>, dialog_request_id: String, policy: BlockingPolicy) -> Self {
        Self {
            directive,
            dialog_request_id,
            policy,
            cancelled: AtomicBool::new(false),
            resolved: AtomicBool::new(false),
            outcome: Mutex::new(None),
        }
    }

    fn message_id(&self) -> &str {
        self.directive.message_id()
    }

    /// Records the terminal outcome; `true` only for the first caller.
    ///
    /// Never call while holding the processor state lock — the
    /// completion token takes the outcome lock first and the state
    /// lock second.
    fn finish(&self, outcome: HandlingOutcome) -> bool {
        let mut slot = self.outcome.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(outcome);
        self.resolved.store(true, Ordering::SeqCst);
        true
    }

    fn is_terminal(&self) -> bool {
        self.resolved.load(Ordering::SeqCst)
    }
}

/// What the worker should do next.
enum WorkerAction {
    Shutdown,
    CancelStale(Arc<DirectiveTracker>),
    Drive(Arc<DirectiveTracker>),
}

/// Verdict on an offered directive.
///
/// The sequencer needs more than a boolean: a stale-dialog drop is
/// expected (the cloud has moved on) and must not be reported as an
/// unsupported operation, while every other rejection is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reception {
    /// Accepted, pre-handled, and queued (or already resolved).
    Accepted,
    /// Dropped because its dialog id no longer matches the active
    /// dialog.
    StaleDialog,
    /// Refused: disabled, shutting down, or no handler for the key.
    Refused,
}

struct ProcessorState {
    queue: VecDeque<Arc<DirectiveTracker>>,
    /// Directives past dequeue (admitting or handling), keyed by
    /// message id, still subject to dialog-change cancellation.
    handling: HashMap<String, Arc<DirectiveTracker>>,
    dialog_request_id: String,
    enabled: bool,
    shutting_down: bool,
}

impl Default for ProcessorState {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            handling: HashMap::new(),
            dialog_request_id: String::new(),
            enabled: true,
            shutting_down: false,
        }
    }
}

struct ProcessorInner {
    router: Arc<DirectiveRouter>,
    gate: Arc<BlockingPolicyGate>,
    reporter: Option<Arc<dyn ExceptionReporter>>,
    state: Mutex<ProcessorState>,
    wake: Condvar,
}

impl ProcessorInner {
    fn change_dialog(&self, new_id: &str) {
        let stale = {
            let mut state = self.state.lock();
            if state.dialog_request_id == new_id {
                debug!(dialog_request_id = new_id, "dialog id unchanged");
                return;
            }
            info!(
                from = %state.dialog_request_id,
                to = new_id,
                "dialog request id changed"
            );
            state.dialog_request_id = new_id.to_string();
            Self::collect_stale_locked(&mut state)
        };
        self.cancel_trackers(stale);
        self.wake.notify_all();
    }

    /// Removes every tracked directive whose stamp differs from the
    /// current dialog id. In-flight entries come first so their
    /// handlers see the cancel before queued ones.
    fn collect_stale_locked(state: &mut ProcessorState) -> Vec<Arc<DirectiveTracker>> {
        let current = state.dialog_request_id.clone();
        let mut stale = Vec::new();

        let stale_ids: Vec<String> = state
            .handling
            .iter()
            .filter(|(_, tracker)| tracker.dialog_request_id != current)
            .map(|(id, _)| id.clone())
            .collect();
        for id in stale_ids {
            if let Some(tracker) = state.handling.remove(&id) {
                stale.push(tracker);
            }
        }

        state.queue.retain(|tracker| {
            if tracker.dialog_request_id == current {
                true
            } else {
                stale.push(Arc::clone(tracker));
                false
            }
        });
        stale
    }

    /// Drains everything tracked, regardless of dialog.
    fn drain_all_locked(state: &mut ProcessorState) -> Vec<Arc<DirectiveTracker>> {
        let mut drained: Vec<Arc<DirectiveTracker>> =
            state.handling.drain().map(|(_, tracker)| tracker).collect();
        drained.extend(state.queue.drain(..));
        drained
    }

    /// Cancels trackers outside the state lock.
    ///
    /// Two phases: every abort flag is set before any medium is
    /// released. Otherwise releasing one stale directive's mediums
    /// could admit another stale directive that has not been flagged
    /// yet.
    fn cancel_trackers(&self, stale: Vec<Arc<DirectiveTracker>>) {
        for tracker in &stale {
            tracker.cancelled.store(true, Ordering::SeqCst);
        }
        for tracker in stale {
            if tracker.finish(HandlingOutcome::Cancelled) {
                info!(directive = %tracker.directive, "cancelling directive");
                self.router.cancel(&tracker.directive);
            }
            // Always poke the gate: an admission waiter rides this
            // wakeup even when no mediums were held.
            self.gate.release(tracker.message_id());
        }
    }

    fn run(inner: &Arc<ProcessorInner>) {
        debug!("processor worker started");
        loop {
            match Self::next_action(inner) {
                WorkerAction::Shutdown => break,
                WorkerAction::CancelStale(tracker) => {
                    tracker.cancelled.store(true, Ordering::SeqCst);
                    if tracker.finish(HandlingOutcome::Cancelled) {
                        info!(
                            directive = %tracker.directive,
                            "cancelling directive from superseded dialog"
                        );
                        inner.router.cancel(&tracker.directive);
                    }
                }
                WorkerAction::Drive(tracker) => Self::drive(inner, &tracker),
            }
        }
        debug!("processor worker stopped");
    }

    fn next_action(inner: &Arc<ProcessorInner>) -> WorkerAction {
        let mut state = inner.state.lock();
        loop {
            if state.shutting_down {
                return WorkerAction::Shutdown;
            }
            match state.queue.pop_front() {
                Some(tracker) => {
                    if tracker.is_terminal() {
                        // Resolved while queued; nothing left to do.
                        continue;
                    }
                    if tracker.dialog_request_id != state.dialog_request_id {
                        return WorkerAction::CancelStale(tracker);
                    }
                    state
                        .handling
                        .insert(tracker.message_id().to_string(), Arc::clone(&tracker));
                    return WorkerAction::Drive(tracker);
                }
                None => inner.wake.wait(&mut state),
            }
        }
    }

    fn drive(inner: &Arc<ProcessorInner>, tracker: &Arc<DirectiveTracker>) {
        let message_id = tracker.message_id();
        if !inner
            .gate
            .wait_until_admitted(message_id, &tracker.policy, &tracker.cancelled)
        {
            // The canceller has already resolved the tracker and
            // notified the handler.
            debug!(message_id, "admission aborted by cancellation");
            return;
        }

        if tracker.is_terminal() || tracker.cancelled.load(Ordering::SeqCst) {
            // Resolved or flagged between admission and here (early
            // completion, or a dialog change racing the admission
            // wakeup). The canceller owns the handler notification.
            inner.state.lock().handling.remove(message_id);
            inner.gate.release(message_id);
            return;
        }

        debug!(directive = %tracker.directive, "admitted, handling");
        let (handled, _policy) = inner.router.handle_with_policy(&tracker.directive);
        if !handled {
            // Late failure: the handler accepted pre-handle but
            // refused the message id.
            tracker.cancelled.store(true, Ordering::SeqCst);
            if tracker.finish(HandlingOutcome::Failed("handler refused".into())) {
                warn!(directive = %tracker.directive, "handler refused after pre-handle");
                inner.router.cancel(&tracker.directive);
                if let Some(reporter) = &inner.reporter {
                    reporter.send_exception_encountered(
                        tracker.directive.unparsed(),
                        ExceptionKind::UnsupportedOperation,
                        "Unsupported operation",
                    );
                }
            }
            inner.state.lock().handling.remove(message_id);
            inner.gate.release(message_id);
        }
        // On success the tracker stays in `handling`, holding its
        // mediums, until the completion token or a cancellation
        // resolves it.
    }
}

/// Completion token handed to handlers at pre-handle time.
///
/// Holds the processor weakly: a token that outlives the processor
/// still resolves its tracker but touches no freed pipeline state.
struct ProcessorCompletionToken {
    tracker: Arc<DirectiveTracker>,
    inner: Weak<ProcessorInner>,
}

impl ProcessorCompletionToken {
    fn resolve(&self, outcome: HandlingOutcome) {
        if !self.tracker.finish(outcome.clone()) {
            debug!(
                message_id = self.tracker.message_id(),
                %outcome,
                "ignoring completion signal after terminal state"
            );
            return;
        }
        match &outcome {
            HandlingOutcome::Failed(reason) => {
                warn!(directive = %self.tracker.directive, reason = %reason, "directive failed");
            }
            _ => debug!(directive = %self.tracker.directive, %outcome, "directive resolved"),
        }
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let message_id = self.tracker.message_id();
        {
            let mut state = inner.state.lock();
            state.handling.remove(message_id);
            state.queue.retain(|queued| queued.message_id() != message_id);
        }
        inner.gate.release(message_id);
        inner.wake.notify_all();
    }
}

impl CompletionToken for ProcessorCompletionToken {
    fn completed(&self) {
        self.resolve(HandlingOutcome::Completed);
    }

    fn failed(&self, description: &str) {
        self.resolve(HandlingOutcome::Failed(description.to_string()));
    }
}

/// Serializes and cancels directives by dialog, driving handlers
/// through blocking-policy admission on a dedicated worker thread.
///
/// # Acceptance Rules
///
/// [`on_directive`](Self::on_directive) accepts a directive iff the
/// processor is enabled, not shutting down, a handler claims the key,
/// and the dialog id fits:
///
/// | Directive dialog id | Accepted? |
/// |---------------------|-----------|
/// | empty | yes — stamped with the current dialog id |
/// | equal to current | yes |
/// | anything else | no |
pub struct DirectiveProcessor {
    inner: Arc<ProcessorInner>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DirectiveProcessor {
    /// Creates a processor and starts its worker thread.
    ///
    /// `reporter`, when present, receives the late-failure exception
    /// (handler refused after a successful pre-handle).
    #[must_use]
    pub fn new(
        router: Arc<DirectiveRouter>,
        gate: Arc<BlockingPolicyGate>,
        reporter: Option<Arc<dyn ExceptionReporter>>,
    ) -> Self {
        let inner = Arc::new(ProcessorInner {
            router,
            gate,
            reporter,
            state: Mutex::new(ProcessorState::default()),
            wake: Condvar::new(),
        });
        let worker = {
            let inner = Arc::clone(&inner);
            thread::Builder::new()
                .name("vox-directive-processor".into())
                .spawn(move || ProcessorInner::run(&inner))
        };
        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(err) => {
                error!(%err, "failed to spawn processor worker");
                None
            }
        };
        Self {
            inner,
            worker: Mutex::new(worker),
        }
    }

    /// Replaces the active dialog id, cancelling every tracked
    /// directive whose stamped dialog differs from the new value.
    ///
    /// Setting the current value again is a no-op.
    pub fn set_dialog_request_id(&self, dialog_request_id: &str) {
        self.inner.change_dialog(dialog_request_id);
    }

    /// The active dialog id; empty when no dialog is active.
    #[must_use]
    pub fn dialog_request_id(&self) -> String {
        self.inner.state.lock().dialog_request_id.clone()
    }

    /// Offers a directive to the processor.
    ///
    /// Returns `true` if accepted. On acceptance the owning handler's
    /// `pre_handle` has already run (synchronously, on the caller's
    /// thread) and the directive is queued for admission and handling.
    ///
    /// Returns `false` when disabled or shutting down, when the dialog
    /// id mismatches, or when no handler claims the key.
    pub fn on_directive(&self, directive: Arc<Directive>) -> bool {
        self.receive(directive) == Reception::Accepted
    }

    /// [`on_directive`](Self::on_directive) with the full verdict;
    /// the sequencer uses it to tell stale-dialog drops (no exception
    /// report) from genuine rejections.
    pub(crate) fn receive(&self, directive: Arc<Directive>) -> Reception {
        let dialog_stamp = {
            let state = self.inner.state.lock();
            if state.shutting_down || !state.enabled {
                warn!(
                    directive = %directive,
                    reason = if state.shutting_down {
                        "shutting down"
                    } else {
                        "disabled"
                    },
                    "directive rejected"
                );
                return Reception::Refused;
            }
            let dialog_request_id = directive.dialog_request_id();
            if dialog_request_id.is_empty() {
                state.dialog_request_id.clone()
            } else if dialog_request_id == state.dialog_request_id {
                dialog_request_id.to_string()
            } else {
                info!(
                    directive = %directive,
                    current = %state.dialog_request_id,
                    "dialog id mismatch, dropping directive"
                );
                return Reception::StaleDialog;
            }
        };

        let Some(policy) = self.inner.router.policy(directive.key()) else {
            info!(directive = %directive, "no handler registered for key");
            return Reception::Refused;
        };

        let tracker = Arc::new(DirectiveTracker::new(
            Arc::clone(&directive),
            dialog_stamp,
            policy,
        ));
        let token: Arc<dyn CompletionToken> = Arc::new(ProcessorCompletionToken {
            tracker: Arc::clone(&tracker),
            inner: Arc::downgrade(&self.inner),
        });

        if !self.inner.router.pre_handle(Arc::clone(&directive), token) {
            // The handler deregistered between the policy lookup and
            // the pre-handle call.
            info!(directive = %directive, "handler disappeared before pre-handle");
            return Reception::Refused;
        }

        if tracker.is_terminal() {
            // The handler resolved the token during pre-handle;
            // nothing left to queue.
            return Reception::Accepted;
        }

        {
            let mut state = self.inner.state.lock();
            if state.shutting_down || !state.enabled {
                drop(state);
                tracker.cancelled.store(true, Ordering::SeqCst);
                if tracker.finish(HandlingOutcome::Cancelled) {
                    self.inner.router.cancel(&directive);
                }
                return Reception::Refused;
            }
            state.queue.push_back(tracker);
        }
        self.inner.wake.notify_all();
        Reception::Accepted
    }

    /// Re-opens intake after a [`disable`](Self::disable).
    pub fn enable(&self) {
        let mut state = self.inner.state.lock();
        debug!("processor enabled");
        state.enabled = true;
    }

    /// Closes intake, forces the dialog id empty, and cancels every
    /// tracked directive stamped with a non-empty dialog.
    pub fn disable(&self) {
        let stale = {
            let mut state = self.inner.state.lock();
            info!("processor disabled");
            state.enabled = false;
            state.dialog_request_id.clear();
            ProcessorInner::collect_stale_locked(&mut state)
        };
        self.inner.cancel_trackers(stale);
        self.inner.wake.notify_all();
    }

    /// Cancels everything tracked, stops the worker, and joins it.
    ///
    /// Idempotent; after return the worker thread is gone.
    pub fn shutdown(&self) {
        let drained = {
            let mut state = self.inner.state.lock();
            if state.shutting_down {
                Vec::new()
            } else {
                state.shutting_down = true;
                ProcessorInner::drain_all_locked(&mut state)
            }
        };
        self.inner.cancel_trackers(drained);
        self.inner.wake.notify_all();
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                error!("processor worker panicked");
            }
        }
    }
}

impl Drop for DirectiveProcessor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
