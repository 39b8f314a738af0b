//! Directive intake and triage.
//!
//! The sequencer is the pipeline's public entry point. Delivery calls
//! [`on_directive`](DirectiveSequencer::on_directive); a dedicated
//! receiving thread drains the intake queue and triages each directive
//! onto the immediate or the processed path.
//!
//! ```text
//! transport ──on_directive──► intake queue (FIFO)
//!                                  │ receiving thread
//!                                  ▼
//!                    ┌─── dialog-free and configured
//!                    ▼     for immediate dispatch?
//!          router.handle_immediately      processor.on_directive
//!                    │                          │
//!                    └──────── false? ──────────┘
//!                                  ▼
//!              exception reporter (UNSUPPORTED_OPERATION)
//! ```
//!
//! The receiving thread never executes `pre_handle`-staged handler
//! work itself; processed-path directives are handed to the
//! processor's worker. While the receiving thread runs it is
//! attributed to the pipeline's power keep-alive.

use crate::processor::Reception;
use crate::{
    BlockingPolicyGate, DirectiveProcessor, DirectiveRouter, MetricRecorder, NoopPowerResource,
    PowerResource, RequiresShutdown, SequencerConfig,
};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};
use vox_directive::{Directive, ExceptionKind, ExceptionReporter};
use vox_handler::DirectiveHandler;

struct SequencerState {
    queue: VecDeque<Arc<Directive>>,
    enabled: bool,
    shutting_down: bool,
}

struct SequencerInner {
    state: Mutex<SequencerState>,
    wake: Condvar,
    router: Arc<DirectiveRouter>,
    processor: Arc<DirectiveProcessor>,
    reporter: Mutex<Option<Arc<dyn ExceptionReporter>>>,
    metrics: Option<Arc<dyn MetricRecorder>>,
    power: Arc<dyn PowerResource>,
    config: SequencerConfig,
}

impl SequencerInner {
    fn run(inner: &Arc<SequencerInner>) {
        inner.power.attribute_current_thread();
        debug!("receiving thread started");
        while let Some(directive) = Self::next_directive(inner) {
            Self::dispatch(inner, directive);
        }
        debug!("receiving thread stopped");
        inner.power.detach_current_thread();
    }

    fn next_directive(inner: &Arc<SequencerInner>) -> Option<Arc<Directive>> {
        let mut state = inner.state.lock();
        loop {
            if state.shutting_down {
                return None;
            }
            if let Some(directive) = state.queue.pop_front() {
                return Some(directive);
            }
            inner.wake.wait(&mut state);
        }
    }

    fn dispatch(inner: &Arc<SequencerInner>, directive: Arc<Directive>) {
        if let Some(metrics) = &inner.metrics {
            metrics.directive_dequeued(directive.name());
        }

        let reception = if inner.config.dispatch_empty_dialog_immediately
            && directive.is_dialog_free()
        {
            debug!(directive = %directive, "dispatching via immediate path");
            if inner.router.handle_immediately(&directive) {
                Reception::Accepted
            } else {
                Reception::Refused
            }
        } else {
            inner.processor.receive(Arc::clone(&directive))
        };

        match reception {
            Reception::Accepted => {}
            Reception::StaleDialog => {
                // Expected when the dialog has moved on; the cloud is
                // not waiting for this one.
                debug!(directive = %directive, "stale dialog directive dropped");
            }
            Reception::Refused => {
                info!(directive = %directive, "reporting unhandled directive");
                let reporter = inner.reporter.lock().clone();
                if let Some(reporter) = reporter {
                    reporter.send_exception_encountered(
                        directive.unparsed(),
                        ExceptionKind::UnsupportedOperation,
                        "Unsupported operation",
                    );
                }
            }
        }
    }
}

/// Public entry point of the directive pipeline.
///
/// Owns the router, the processor (and through it the blocking-policy
/// gate), the intake queue, and the receiving thread. Construction
/// acquires the power keep-alive; [`shutdown`](Self::shutdown)
/// releases it after both owned threads have been joined.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use vox_dispatch::DirectiveSequencer;
/// use vox_directive::{Directive, ExceptionKind, ExceptionReporter};
///
/// struct DropReporter;
/// impl ExceptionReporter for DropReporter {
///     fn send_exception_encountered(&self, _: &str, _: ExceptionKind, _: &str) {}
/// }
///
/// let sequencer = DirectiveSequencer::new(Arc::new(DropReporter));
/// let directive = Arc::new(
///     Directive::builder("System", "NoOp").build().expect("valid directive"),
/// );
/// assert!(sequencer.on_directive(directive));
/// sequencer.shutdown();
/// ```
pub struct DirectiveSequencer {
    inner: Arc<SequencerInner>,
    router: Arc<DirectiveRouter>,
    processor: Arc<DirectiveProcessor>,
    receiving_thread: Mutex<Option<JoinHandle<()>>>,
    shutdown_done: AtomicBool,
}

impl DirectiveSequencer {
    /// Creates a sequencer with default configuration, no metric
    /// recorder, and the no-op power resource.
    #[must_use]
    pub fn new(reporter: Arc<dyn ExceptionReporter>) -> Self {
        Self::builder(reporter).build()
    }

    /// Starts building a sequencer with non-default collaborators.
    #[must_use]
    pub fn builder(reporter: Arc<dyn ExceptionReporter>) -> DirectiveSequencerBuilder {
        DirectiveSequencerBuilder {
            reporter,
            config: SequencerConfig::default(),
            metrics: None,
            power: Arc::new(NoopPowerResource),
        }
    }

    /// Offers a directive to the pipeline.
    ///
    /// Returns `false` — dropping the directive — while disabled or
    /// shutting down. A `true` return means the directive entered the
    /// intake queue; whether a handler ultimately accepts it is
    /// reported asynchronously through the exception reporter.
    pub fn on_directive(&self, directive: Arc<Directive>) -> bool {
        let mut state = self.inner.state.lock();
        if state.shutting_down || !state.enabled {
            warn!(
                directive = %directive,
                reason = if state.shutting_down {
                    "shutting down"
                } else {
                    "disabled"
                },
                "directive dropped at intake"
            );
            return false;
        }
        info!(directive = %directive, "directive received");
        debug!(unparsed = directive.unparsed(), "directive raw form");
        state.queue.push_back(directive);
        drop(state);
        self.inner.wake.notify_one();
        true
    }

    /// Sets the active dialog; stale directives are cancelled.
    ///
    /// Pass-through to the processor.
    pub fn set_dialog_request_id(&self, dialog_request_id: &str) {
        self.processor.set_dialog_request_id(dialog_request_id);
    }

    /// The active dialog id; empty when no dialog is active.
    #[must_use]
    pub fn dialog_request_id(&self) -> String {
        self.processor.dialog_request_id()
    }

    /// Registers a handler's routing keys. Pass-through to the router.
    pub fn add_handler(&self, handler: Arc<dyn DirectiveHandler>) -> bool {
        self.router.add_handler(handler)
    }

    /// Deregisters a handler's routing keys. Pass-through to the
    /// router.
    pub fn remove_handler(&self, handler: &Arc<dyn DirectiveHandler>) -> bool {
        self.router.remove_handler(handler)
    }

    /// Re-opens intake after a [`disable`](Self::disable).
    pub fn enable(&self) {
        debug!("sequencer enabled");
        {
            let mut state = self.inner.state.lock();
            state.enabled = true;
        }
        self.processor.enable();
        self.inner.wake.notify_all();
    }

    /// Closes intake and disables the processor, clearing the active
    /// dialog and cancelling its directives.
    pub fn disable(&self) {
        debug!("sequencer disabled");
        {
            let mut state = self.inner.state.lock();
            state.enabled = false;
        }
        self.processor.disable();
        self.inner.wake.notify_all();
    }

    /// Quiesces the pipeline: stops and joins the receiving thread,
    /// shuts down the processor (cancelling tracked directives) and
    /// the router, drops the exception reporter reference, and
    /// releases the power keep-alive.
    ///
    /// Idempotent. After return, no pipeline-owned thread is runnable
    /// and no handler method will be invoked.
    pub fn shutdown(&self) {
        if self.shutdown_done.swap(true, Ordering::SeqCst) {
            debug!("sequencer already shut down");
            return;
        }
        info!("sequencer shutting down");
        {
            let mut state = self.inner.state.lock();
            state.shutting_down = true;
        }
        self.inner.wake.notify_all();
        if let Some(receiving) = self.receiving_thread.lock().take() {
            if receiving.join().is_err() {
                error!("receiving thread panicked");
            }
        }
        self.processor.shutdown();
        self.router.shutdown();
        *self.inner.reporter.lock() = None;
        self.inner.power.release();
    }
}

impl RequiresShutdown for DirectiveSequencer {
    fn name(&self) -> &str {
        "DirectiveSequencer"
    }

    fn shutdown(&self) {
        DirectiveSequencer::shutdown(self);
    }
}

impl Drop for DirectiveSequencer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Builder for [`DirectiveSequencer`].
pub struct DirectiveSequencerBuilder {
    reporter: Arc<dyn ExceptionReporter>,
    config: SequencerConfig,
    metrics: Option<Arc<dyn MetricRecorder>>,
    power: Arc<dyn PowerResource>,
}

impl DirectiveSequencerBuilder {
    /// Sets the sequencer configuration.
    #[must_use]
    pub fn config(mut self, config: SequencerConfig) -> Self {
        self.config = config;
        self
    }

    /// Attaches a metric recorder.
    #[must_use]
    pub fn metric_recorder(mut self, metrics: Arc<dyn MetricRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Injects a platform power resource (default: no-op).
    #[must_use]
    pub fn power_resource(mut self, power: Arc<dyn PowerResource>) -> Self {
        self.power = power;
        self
    }

    /// Builds the sequencer: acquires the power keep-alive, wires the
    /// router, gate, and processor, and starts the receiving thread.
    #[must_use]
    pub fn build(self) -> DirectiveSequencer {
        let router = Arc::new(DirectiveRouter::new());
        let gate = Arc::new(BlockingPolicyGate::new());
        let processor = Arc::new(DirectiveProcessor::new(
            Arc::clone(&router),
            gate,
            Some(Arc::clone(&self.reporter)),
        ));

        self.power.acquire();

        let inner = Arc::new(SequencerInner {
            state: Mutex::new(SequencerState {
                queue: VecDeque::new(),
                enabled: true,
                shutting_down: false,
            }),
            wake: Condvar::new(),
            router: Arc::clone(&router),
            processor: Arc::clone(&processor),
            reporter: Mutex::new(Some(self.reporter)),
            metrics: self.metrics,
            power: self.power,
            config: self.config,
        });

        let receiving = {
            let inner = Arc::clone(&inner);
            thread::Builder::new()
                .name("vox-directive-sequencer".into())
                .spawn(move || SequencerInner::run(&inner))
        };
        let receiving = match receiving {
            Ok(handle) => Some(handle),
            Err(err) => {
                error!(%err, "failed to spawn receiving thread");
                None
            }
        };

        DirectiveSequencer {
            inner,
            router,
            processor,
            receiving_thread: Mutex::new(receiving),
            shutdown_done: AtomicBool::new(false),
        }
    }
}
