//! End-to-end tests for the directive pipeline.
//!
//! Everything here drives a real [`DirectiveSequencer`] — both owned
//! threads running — through the mock handler harness:
//!
//! - unhandled directives reach the exception reporter
//! - dialog changes cancel pending and in-flight work
//! - blocking policies serialize conflicting mediums and admit
//!   independent ones concurrently
//! - the immediate path bypasses staging when configured
//! - shutdown cancels, joins, and refuses further intake
//! - collaborator accounting (power, metrics, shutdown notifier)

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use vox_dispatch::{
    DirectiveSequencer, ExceptionKind, MetricRecorder, PowerResource, RequiresShutdown,
    SequencerConfig, ShutdownNotifier,
};
use vox_directive::Directive;
use vox_handler::testing::{MockDirectiveHandler, RecordingExceptionReporter, WAIT_TIMEOUT};
use vox_types::BlockingPolicy;

// =============================================================================
// Test Fixtures
// =============================================================================

fn directive(namespace: &str, name: &str, message_id: &str, dialog: &str) -> Arc<Directive> {
    Arc::new(
        Directive::builder(namespace, name)
            .message_id(message_id)
            .dialog_request_id(dialog)
            .build()
            .expect("valid directive"),
    )
}

/// Counts power-resource calls so lifecycle pairing can be asserted.
#[derive(Default)]
struct CountingPowerResource {
    acquires: AtomicUsize,
    releases: AtomicUsize,
    attaches: AtomicUsize,
    detaches: AtomicUsize,
}

impl PowerResource for CountingPowerResource {
    fn acquire(&self) {
        self.acquires.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }

    fn attribute_current_thread(&self) {
        self.attaches.fetch_add(1, Ordering::SeqCst);
    }

    fn detach_current_thread(&self) {
        self.detaches.fetch_add(1, Ordering::SeqCst);
    }
}

/// Records dequeue observations and wakes waiters.
#[derive(Default)]
struct RecordingMetricRecorder {
    names: Mutex<Vec<String>>,
    activity: Condvar,
}

impl RecordingMetricRecorder {
    fn wait_for_count(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut names = self.names.lock();
        while names.len() < count {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            if self.activity.wait_for(&mut names, deadline - now).timed_out() {
                return names.len() >= count;
            }
        }
        true
    }

    fn names(&self) -> Vec<String> {
        self.names.lock().clone()
    }
}

impl MetricRecorder for RecordingMetricRecorder {
    fn directive_dequeued(&self, name: &str) {
        self.names.lock().push(name.to_string());
        self.activity.notify_all();
    }
}

// =============================================================================
// Unhandled Directives
// =============================================================================

#[test]
fn unknown_directive_reports_unsupported_operation() {
    let reporter = Arc::new(RecordingExceptionReporter::new());
    let sequencer = DirectiveSequencer::new(Arc::clone(&reporter) as _);

    let d = directive("Foo", "Bar", "m1", "");
    let unparsed = d.unparsed().to_string();
    assert!(sequencer.on_directive(d));

    assert!(reporter.wait_for_reports(1, WAIT_TIMEOUT));
    let reports = reporter.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].kind, ExceptionKind::UnsupportedOperation);
    assert_eq!(reports[0].unparsed, unparsed);
    assert_eq!(reports[0].message, "Unsupported operation");

    sequencer.shutdown();
}

#[test]
fn handler_refusal_reports_unsupported_operation() {
    let reporter = Arc::new(RecordingExceptionReporter::new());
    let sequencer = DirectiveSequencer::new(Arc::clone(&reporter) as _);
    let handler = Arc::new(
        MockDirectiveHandler::new("refuser")
            .with_key("A", "B", BlockingPolicy::none())
            .refuse_handle(),
    );
    assert!(sequencer.add_handler(Arc::clone(&handler) as _));

    assert!(sequencer.on_directive(directive("A", "B", "m1", "")));
    assert!(handler.wait_for_cancel("m1", WAIT_TIMEOUT));
    assert!(reporter.wait_for_reports(1, WAIT_TIMEOUT));
    assert_eq!(
        reporter.reports()[0].kind,
        ExceptionKind::UnsupportedOperation
    );

    sequencer.shutdown();
}

// =============================================================================
// Dialog Cancellation
// =============================================================================

#[test]
fn dialog_change_cancels_pending_and_in_flight() {
    let reporter = Arc::new(RecordingExceptionReporter::new());
    let sequencer = DirectiveSequencer::new(Arc::clone(&reporter) as _);
    let speech = Arc::new(MockDirectiveHandler::new("speech").with_key(
        "Speech",
        "Speak",
        BlockingPolicy::audio_blocking(),
    ));
    assert!(sequencer.add_handler(Arc::clone(&speech) as _));

    sequencer.set_dialog_request_id("A");
    assert!(sequencer.on_directive(directive("Speech", "Speak", "m1", "A")));
    assert!(sequencer.on_directive(directive("Speech", "Speak", "m2", "A")));

    // m1 starts; m2 is staged behind the held AUDIO medium.
    assert!(speech.wait_for_handle("m1", WAIT_TIMEOUT));
    assert!(speech.wait_for_pre_handle("m2", WAIT_TIMEOUT));

    sequencer.set_dialog_request_id("B");
    assert!(speech.wait_for_cancel("m1", WAIT_TIMEOUT));
    assert!(speech.wait_for_cancel("m2", WAIT_TIMEOUT));

    // m2 never started.
    assert_eq!(speech.handled(), vec!["m1".to_string()]);
    assert_eq!(sequencer.dialog_request_id(), "B");

    sequencer.shutdown();
}

#[test]
fn mismatched_dialog_directive_is_dropped_silently() {
    let reporter = Arc::new(RecordingExceptionReporter::new());
    let sequencer = DirectiveSequencer::new(Arc::clone(&reporter) as _);
    let handler = Arc::new(
        MockDirectiveHandler::new("h")
            .with_key("A", "B", BlockingPolicy::none())
            .with_key("A", "Probe", BlockingPolicy::none())
            .auto_complete(),
    );
    assert!(sequencer.add_handler(Arc::clone(&handler) as _));

    sequencer.set_dialog_request_id("current");
    assert!(sequencer.on_directive(directive("A", "B", "m1", "superseded")));
    // A follow-up directive proves the stale one was fully triaged.
    assert!(sequencer.on_directive(directive("A", "Probe", "m2", "current")));
    assert!(handler.wait_for_handle("m2", WAIT_TIMEOUT));

    // The stale directive never reached the handler and raised no
    // exception: the cloud has already moved on.
    assert!(handler.pre_handled().iter().all(|id| id != "m1"));
    assert!(reporter.reports().is_empty());

    sequencer.shutdown();
}

// =============================================================================
// Blocking Policy
// =============================================================================

#[test]
fn independent_mediums_run_concurrently() {
    let reporter = Arc::new(RecordingExceptionReporter::new());
    let sequencer = DirectiveSequencer::new(Arc::clone(&reporter) as _);
    let audio = Arc::new(MockDirectiveHandler::new("audio").with_key(
        "Audio",
        "Play",
        BlockingPolicy::audio_blocking(),
    ));
    let visual = Arc::new(MockDirectiveHandler::new("visual").with_key(
        "Visual",
        "Show",
        BlockingPolicy::visual_nonblocking(),
    ));
    assert!(sequencer.add_handler(Arc::clone(&audio) as _));
    assert!(sequencer.add_handler(Arc::clone(&visual) as _));

    sequencer.set_dialog_request_id("turn");
    assert!(sequencer.on_directive(directive("Audio", "Play", "m1", "turn")));
    assert!(sequencer.on_directive(directive("Visual", "Show", "m2", "turn")));

    // Both in flight at once: neither has completed.
    assert!(audio.wait_for_handle("m1", WAIT_TIMEOUT));
    assert!(visual.wait_for_handle("m2", WAIT_TIMEOUT));

    audio.complete("m1");
    visual.complete("m2");
    sequencer.shutdown();
}

#[test]
fn conflicting_blocking_policies_serialize() {
    let reporter = Arc::new(RecordingExceptionReporter::new());
    let sequencer = DirectiveSequencer::new(Arc::clone(&reporter) as _);
    let speech = Arc::new(MockDirectiveHandler::new("speech").with_key(
        "Audio",
        "Play",
        BlockingPolicy::audio_blocking(),
    ));
    let alert = Arc::new(MockDirectiveHandler::new("alert").with_key(
        "Alert",
        "Ring",
        BlockingPolicy::audio_blocking(),
    ));
    assert!(sequencer.add_handler(Arc::clone(&speech) as _));
    assert!(sequencer.add_handler(Arc::clone(&alert) as _));

    assert!(sequencer.on_directive(directive("Audio", "Play", "m1", "")));
    assert!(sequencer.on_directive(directive("Alert", "Ring", "m3", "")));

    assert!(speech.wait_for_handle("m1", WAIT_TIMEOUT));
    assert!(alert.wait_for_pre_handle("m3", WAIT_TIMEOUT));
    // m3 must not start while m1 holds AUDIO.
    assert!(!alert.wait_for_handle("m3", Duration::from_millis(200)));

    speech.complete("m1");
    assert!(alert.wait_for_handle("m3", WAIT_TIMEOUT));

    alert.complete("m3");
    sequencer.shutdown();
}

// =============================================================================
// Immediate vs Processed Path
// =============================================================================

#[test]
fn immediate_path_bypasses_staging_when_configured() {
    let reporter = Arc::new(RecordingExceptionReporter::new());
    let sequencer = DirectiveSequencer::builder(Arc::clone(&reporter) as _)
        .config(SequencerConfig::new().with_immediate_dialog_free_dispatch())
        .build();
    let handler = Arc::new(
        MockDirectiveHandler::new("h").with_key("A", "B", BlockingPolicy::none()),
    );
    assert!(sequencer.add_handler(Arc::clone(&handler) as _));

    assert!(sequencer.on_directive(directive("A", "B", "m1", "")));
    assert!(handler.wait_for_immediate("m1", WAIT_TIMEOUT));
    assert!(handler.pre_handled().is_empty());
    assert!(handler.handled().is_empty());

    sequencer.shutdown();
}

#[test]
fn immediate_config_still_processes_dialog_directives() {
    let reporter = Arc::new(RecordingExceptionReporter::new());
    let sequencer = DirectiveSequencer::builder(Arc::clone(&reporter) as _)
        .config(SequencerConfig::new().with_immediate_dialog_free_dispatch())
        .build();
    let handler = Arc::new(
        MockDirectiveHandler::new("h")
            .with_key("A", "B", BlockingPolicy::none())
            .auto_complete(),
    );
    assert!(sequencer.add_handler(Arc::clone(&handler) as _));

    sequencer.set_dialog_request_id("turn");
    assert!(sequencer.on_directive(directive("A", "B", "m1", "turn")));
    assert!(handler.wait_for_handle("m1", WAIT_TIMEOUT));
    assert!(handler.immediately_handled().is_empty());

    sequencer.shutdown();
}

#[test]
fn dialog_free_directives_default_to_processed_path() {
    let reporter = Arc::new(RecordingExceptionReporter::new());
    let sequencer = DirectiveSequencer::new(Arc::clone(&reporter) as _);
    let handler = Arc::new(
        MockDirectiveHandler::new("h")
            .with_key("A", "B", BlockingPolicy::none())
            .auto_complete(),
    );
    assert!(sequencer.add_handler(Arc::clone(&handler) as _));

    assert!(sequencer.on_directive(directive("A", "B", "m1", "")));
    assert!(handler.wait_for_handle("m1", WAIT_TIMEOUT));
    assert!(handler.immediately_handled().is_empty());

    sequencer.shutdown();
}

// =============================================================================
// Shutdown
// =============================================================================

#[test]
fn shutdown_during_handling_cancels_and_quiesces() {
    let reporter = Arc::new(RecordingExceptionReporter::new());
    let sequencer = DirectiveSequencer::new(Arc::clone(&reporter) as _);
    let handler = Arc::new(
        MockDirectiveHandler::new("h").with_key("A", "B", BlockingPolicy::audio_blocking()),
    );
    assert!(sequencer.add_handler(Arc::clone(&handler) as _));

    assert!(sequencer.on_directive(directive("A", "B", "m1", "")));
    assert!(handler.wait_for_handle("m1", WAIT_TIMEOUT));

    sequencer.shutdown();
    assert!(handler.wait_for_cancel("m1", WAIT_TIMEOUT));
    assert!(!sequencer.on_directive(directive("A", "B", "m2", "")));
}

#[test]
fn shutdown_notifier_drives_the_sequencer() {
    let reporter = Arc::new(RecordingExceptionReporter::new());
    let sequencer = Arc::new(DirectiveSequencer::new(Arc::clone(&reporter) as _));

    let notifier = ShutdownNotifier::new();
    let observer: Arc<dyn RequiresShutdown> = Arc::clone(&sequencer) as _;
    notifier.add_observer(&observer);
    notifier.notify_shutdown();

    assert!(!sequencer.on_directive(directive("A", "B", "m1", "")));
}

// =============================================================================
// Collaborator Accounting
// =============================================================================

#[test]
fn power_resource_lifecycle_is_paired() {
    let reporter = Arc::new(RecordingExceptionReporter::new());
    let power = Arc::new(CountingPowerResource::default());
    let sequencer = DirectiveSequencer::builder(Arc::clone(&reporter) as _)
        .power_resource(Arc::clone(&power) as _)
        .build();

    assert_eq!(power.acquires.load(Ordering::SeqCst), 1);
    sequencer.shutdown();

    assert_eq!(power.releases.load(Ordering::SeqCst), 1);
    // The receiving thread attributed itself exactly once and
    // detached before the join completed.
    assert_eq!(power.attaches.load(Ordering::SeqCst), 1);
    assert_eq!(power.detaches.load(Ordering::SeqCst), 1);
}

#[test]
fn metric_recorder_sees_one_dequeue_per_directive() {
    let reporter = Arc::new(RecordingExceptionReporter::new());
    let metrics = Arc::new(RecordingMetricRecorder::default());
    let sequencer = DirectiveSequencer::builder(Arc::clone(&reporter) as _)
        .metric_recorder(Arc::clone(&metrics) as _)
        .build();
    let handler = Arc::new(
        MockDirectiveHandler::new("h")
            .with_key("Speech", "Speak", BlockingPolicy::none())
            .auto_complete(),
    );
    assert!(sequencer.add_handler(Arc::clone(&handler) as _));

    assert!(sequencer.on_directive(directive("Speech", "Speak", "m1", "")));
    assert!(sequencer.on_directive(directive("No", "Handler", "m2", "")));

    assert!(metrics.wait_for_count(2, WAIT_TIMEOUT));
    assert_eq!(
        metrics.names(),
        vec!["Speak".to_string(), "Handler".to_string()]
    );

    sequencer.shutdown();
}

// =============================================================================
// Ordering
// =============================================================================

#[test]
fn same_dialog_directives_reach_handlers_in_delivery_order() {
    let reporter = Arc::new(RecordingExceptionReporter::new());
    let sequencer = DirectiveSequencer::new(Arc::clone(&reporter) as _);
    let handler = Arc::new(
        MockDirectiveHandler::new("h")
            .with_key("A", "One", BlockingPolicy::none())
            .with_key("A", "Two", BlockingPolicy::none())
            .with_key("A", "Three", BlockingPolicy::none())
            .auto_complete(),
    );
    assert!(sequencer.add_handler(Arc::clone(&handler) as _));

    sequencer.set_dialog_request_id("turn");
    assert!(sequencer.on_directive(directive("A", "One", "m1", "turn")));
    assert!(sequencer.on_directive(directive("A", "Two", "m2", "turn")));
    assert!(sequencer.on_directive(directive("A", "Three", "m3", "turn")));

    assert!(handler.wait_for_handle("m3", WAIT_TIMEOUT));
    assert_eq!(
        handler.handled(),
        vec!["m1".to_string(), "m2".to_string(), "m3".to_string()]
    );

    sequencer.shutdown();
}
