//! Directive dispatch runtime for the Vox voice-assistant client SDK.
//!
//! This crate is the runtime layer of the pipeline: it receives parsed
//! directives from the transport, routes each to the handler claiming
//! its `(namespace, name)` key, and — for directives that participate
//! in a dialog — serializes and cancels them by dialog request id
//! while enforcing per-medium mutual exclusion.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SDK Layer                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  vox-types     : RoutingKey, Medium, BlockingPolicy         │
//! │  vox-directive : Directive, ExceptionKind                   │
//! │  vox-handler   : DirectiveHandler trait, CompletionToken    │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Runtime Layer                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  vox-dispatch  : sequencer, router, processor, gate ◄── HERE│
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Pipeline Shape
//!
//! Two long-lived threads per [`DirectiveSequencer`]:
//!
//! ```text
//!                 on_directive
//!                      │
//!                      ▼
//!               ┌─────────────┐  receiving thread
//!               │ intake FIFO │──────────┐
//!               └─────────────┘          ▼
//!                              triage: immediate or processed
//!                      ┌─────────────────┴──────────────┐
//!                      ▼                                ▼
//!          DirectiveRouter::handle_immediately  DirectiveProcessor
//!                                                       │ worker thread
//!                                                       ▼
//!                                          dialog re-check → admission
//!                                          (BlockingPolicyGate) → handle
//! ```
//!
//! # Guarantees
//!
//! - A directive reaches at most one handler, exactly once — or its
//!   handler's `cancel`, never both deliveries.
//! - Same-dialog directives reach handlers in delivery order.
//! - Two in-flight directives never hold overlapping mediums when
//!   either is blocking.
//! - After [`DirectiveSequencer::shutdown`] returns, no pipeline
//!   thread is runnable and no handler method will be invoked.
//!
//! # Collaborators
//!
//! The pipeline consumes narrow interfaces for everything at its
//! boundary: [`ExceptionReporter`](vox_directive::ExceptionReporter)
//! (undeliverable directives), [`MetricRecorder`] (counters),
//! [`PowerResource`] (sleep suppression), and [`ShutdownNotifier`]
//! (teardown). All are injectable; tests use the doubles in
//! `vox_handler::testing`.

mod config;
mod error;
mod gate;
mod metrics;
mod power;
mod processor;
mod router;
mod sequencer;
mod shutdown;

pub use config::SequencerConfig;
pub use error::DispatchError;
pub use gate::{Admission, BlockingPolicyGate};
pub use metrics::MetricRecorder;
pub use power::{NoopPowerResource, PowerResource};
pub use processor::DirectiveProcessor;
pub use router::DirectiveRouter;
pub use sequencer::{DirectiveSequencer, DirectiveSequencerBuilder};
pub use shutdown::{RequiresShutdown, ShutdownNotifier};

// Re-exports: the types that appear in this crate's public signatures.
pub use vox_directive::{Directive, ExceptionKind, ExceptionReporter};
pub use vox_handler::{CompletionToken, DirectiveHandler};
pub use vox_types::{BlockingPolicy, Medium, MediumSet, RoutingKey};
