//! Core types for the Vox directive pipeline.
//!
//! This crate provides the routing and policy vocabulary shared by every
//! layer of the Vox voice-assistant client SDK.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SDK Layer                              │
//! │  (External, SemVer stable, safe for capability agents)     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  vox-types     : RoutingKey, Medium, BlockingPolicy ◄── HERE│
//! │  vox-directive : Directive, ExceptionKind                   │
//! │  vox-handler   : DirectiveHandler trait, CompletionToken    │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Runtime Layer                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  vox-dispatch  : sequencer, router, processor, gate         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Routing Model
//!
//! Directives are routed by [`RoutingKey`] — the `(namespace, name)`
//! pair from the directive header. Handlers claim keys and attach a
//! [`BlockingPolicy`] to each, declaring which shared [`Medium`]s the
//! operation occupies and whether it excludes others on them.
//!
//! # Error Convention
//!
//! Error enums across the workspace implement [`ErrorCode`]:
//! a stable UPPER_SNAKE code plus a recoverability flag. The
//! [`assert_error_code`]/[`assert_error_codes`] helpers keep each
//! crate's codes honest in tests.
//!
//! # Example
//!
//! ```
//! use vox_types::{BlockingPolicy, Medium, RoutingKey};
//!
//! // The key a speech handler would claim:
//! let speak = RoutingKey::new("SpeechSynthesizer", "Speak");
//!
//! // ...and how it consumes the device while speaking:
//! let policy = BlockingPolicy::audio_blocking();
//! assert!(policy.mediums().contains(Medium::Audio));
//! assert!(policy.is_blocking());
//! assert_eq!(speak.fqn(), "SpeechSynthesizer::Speak");
//! ```

mod error;
mod key;
mod medium;
mod policy;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use key::RoutingKey;
pub use medium::{Medium, MediumSet};
pub use policy::BlockingPolicy;
