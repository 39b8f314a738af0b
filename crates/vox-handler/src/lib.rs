//! Directive handler interface for the Vox pipeline.
//!
//! This crate defines the contract between the dispatch runtime and
//! capability agents: the [`DirectiveHandler`] trait (which keys a
//! handler claims and the staged handling protocol) and the
//! [`CompletionToken`] through which long-running work reports its
//! terminal disposition.
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
//! │  vox-directive : Directive, ExceptionKind                   │
//! │  vox-handler   : DirectiveHandler trait  ◄── HERE           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Handler Lifecycle
//!
//! ```text
//!              add_handler(h)                    remove_handler(h)
//!  registered ────────────────► claims its keys ─────────────────► gone
//!                                    │
//!          ┌─────────────────────────┼──────────────────────────┐
//!          ▼ immediate path          ▼ processed path           ▼
//!  handle_immediately(d)      pre_handle(d, token)        cancel(id)
//!                             handle(id)                  (any time)
//!                             token.completed()/failed()
//! ```
//!
//! # Testing
//!
//! The [`testing`] module ships a recording mock handler and
//! collaborator doubles used throughout the workspace's tests.

mod completion;
pub mod testing;
mod traits;

pub use completion::{CompletionToken, HandlingOutcome};
pub use traits::DirectiveHandler;

// Re-exports so handler implementations need only this crate.
pub use vox_directive::Directive;
pub use vox_types::{BlockingPolicy, RoutingKey};
