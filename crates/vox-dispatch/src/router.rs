//! Name-based handler registry and direct dispatch.
//!
//! The router owns the routing table: `(namespace, name)` → handler +
//! blocking policy. Registration is all-or-nothing per handler, and
//! dispatch never runs handler code while holding the table lock.
//!
//! ```text
//!            add_handler / remove_handler        (write lock)
//!                        │
//!                        ▼
//!            ┌───────────────────────┐
//!            │     routing table     │
//!            │ RoutingKey → handler  │
//!            │            + policy   │
//!            └───────────────────────┘
//!                        │ resolve (read lock, then release)
//!                        ▼
//!   handle_immediately / pre_handle / handle_with_policy / cancel
//!                        │
//!                        ▼
//!                  handler code        (no lock held)
//! ```

use crate::DispatchError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use vox_directive::Directive;
use vox_handler::{CompletionToken, DirectiveHandler};
use vox_types::{BlockingPolicy, ErrorCode, RoutingKey};

#[derive(Clone)]
struct RouteEntry {
    handler: Arc<dyn DirectiveHandler>,
    policy: BlockingPolicy,
}

/// Maps routing keys to handlers and dispatches directives to them.
///
/// # Concurrency
///
/// The table sits behind a readers-writer lock. Mutations take the
/// write lock; dispatch takes the read lock just long enough to clone
/// the handler reference, then releases it before calling handler
/// code. Handlers may therefore re-enter the router (e.g. deregister
/// themselves from within `cancel`) without deadlocking.
#[derive(Default)]
pub struct DirectiveRouter {
    routes: RwLock<HashMap<RoutingKey, RouteEntry>>,
}

impl DirectiveRouter {
    /// Creates a router with an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every routing key in the handler's configurations.
    ///
    /// All-or-nothing: if any key is already claimed by a *different*
    /// handler, nothing is registered. Re-adding a handler that
    /// already owns its keys is accepted and refreshes its policies.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::EmptyConfiguration`] if the handler claims
    ///   no keys.
    /// - [`DispatchError::HandlerConflict`] naming the first
    ///   conflicting key.
    pub fn try_add_handler(&self, handler: Arc<dyn DirectiveHandler>) -> Result<(), DispatchError> {
        let configurations = handler.configurations();
        if configurations.is_empty() {
            return Err(DispatchError::EmptyConfiguration {
                handler: handler.name().to_string(),
            });
        }

        let mut routes = self.routes.write();
        for key in configurations.keys() {
            if let Some(existing) = routes.get(key) {
                if !Arc::ptr_eq(&existing.handler, &handler) {
                    return Err(DispatchError::HandlerConflict {
                        key: key.fqn(),
                        registered: existing.handler.name().to_string(),
                        candidate: handler.name().to_string(),
                    });
                }
            }
        }
        for (key, policy) in configurations {
            debug!(key = %key, handler = handler.name(), %policy, "registering route");
            routes.insert(
                key,
                RouteEntry {
                    handler: Arc::clone(&handler),
                    policy,
                },
            );
        }
        Ok(())
    }

    /// Boolean form of [`try_add_handler`](Self::try_add_handler);
    /// failures are logged at `warn`.
    pub fn add_handler(&self, handler: Arc<dyn DirectiveHandler>) -> bool {
        match self.try_add_handler(handler) {
            Ok(()) => true,
            Err(err) => {
                warn!(code = err.code(), %err, "add_handler failed");
                false
            }
        }
    }

    /// Unregisters exactly the keys the handler claims.
    ///
    /// All-or-nothing: if any claimed key is absent or mapped to a
    /// different handler, nothing is removed.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::EmptyConfiguration`] if the handler claims
    ///   no keys.
    /// - [`DispatchError::UnclaimedKey`] naming the first key not
    ///   mapped to this handler.
    pub fn try_remove_handler(
        &self,
        handler: &Arc<dyn DirectiveHandler>,
    ) -> Result<(), DispatchError> {
        let configurations = handler.configurations();
        if configurations.is_empty() {
            return Err(DispatchError::EmptyConfiguration {
                handler: handler.name().to_string(),
            });
        }

        let mut routes = self.routes.write();
        for key in configurations.keys() {
            match routes.get(key) {
                Some(existing) if Arc::ptr_eq(&existing.handler, handler) => {}
                _ => {
                    return Err(DispatchError::UnclaimedKey {
                        key: key.fqn(),
                        handler: handler.name().to_string(),
                    });
                }
            }
        }
        for key in configurations.keys() {
            debug!(key = %key, handler = handler.name(), "deregistering route");
            routes.remove(key);
        }
        Ok(())
    }

    /// Boolean form of [`try_remove_handler`](Self::try_remove_handler);
    /// failures are logged at `warn`.
    pub fn remove_handler(&self, handler: &Arc<dyn DirectiveHandler>) -> bool {
        match self.try_remove_handler(handler) {
            Ok(()) => true,
            Err(err) => {
                warn!(code = err.code(), %err, "remove_handler failed");
                false
            }
        }
    }

    /// Returns the blocking policy registered for `key`, if any.
    #[must_use]
    pub fn policy(&self, key: &RoutingKey) -> Option<BlockingPolicy> {
        self.routes.read().get(key).map(|entry| entry.policy)
    }

    /// Returns `true` if some handler claims `key`.
    #[must_use]
    pub fn has_handler_for(&self, key: &RoutingKey) -> bool {
        self.routes.read().contains_key(key)
    }

    /// Dispatches a directive through the immediate path.
    ///
    /// Returns `false` if no handler claims the key or the handler
    /// declined.
    pub fn handle_immediately(&self, directive: &Directive) -> bool {
        let Some(handler) = self.resolve(directive) else {
            return false;
        };
        debug!(directive = %directive, handler = handler.name(), "handling immediately");
        handler.handle_immediately(directive)
    }

    /// Runs the preparation stage on the owning handler.
    ///
    /// Returns `false` (without side effects) if no handler claims
    /// the key.
    pub fn pre_handle(&self, directive: Arc<Directive>, token: Arc<dyn CompletionToken>) -> bool {
        let Some(handler) = self.resolve(&directive) else {
            return false;
        };
        debug!(directive = %directive, handler = handler.name(), "pre-handling");
        handler.pre_handle(directive, token);
        true
    }

    /// Starts handling a previously pre-handled directive and reports
    /// the key's blocking policy.
    ///
    /// Returns `(false, BlockingPolicy::none())` if no handler claims
    /// the key, and `(false, policy)` if the handler refused the
    /// message id.
    pub fn handle_with_policy(&self, directive: &Directive) -> (bool, BlockingPolicy) {
        let entry = {
            let routes = self.routes.read();
            routes.get(directive.key()).cloned()
        };
        let Some(entry) = entry else {
            debug!(directive = %directive, "no handler for key");
            return (false, BlockingPolicy::none());
        };
        let handled = entry.handler.handle(directive.message_id());
        if !handled {
            info!(
                directive = %directive,
                handler = entry.handler.name(),
                "handler refused directive"
            );
        }
        (handled, entry.policy)
    }

    /// Forwards a cancel to the owning handler; no-op if the key is
    /// unclaimed.
    pub fn cancel(&self, directive: &Directive) {
        let Some(handler) = self.resolve(directive) else {
            debug!(directive = %directive, "cancel with no handler registered");
            return;
        };
        debug!(directive = %directive, handler = handler.name(), "cancelling");
        handler.cancel(directive.message_id());
    }

    /// Empties the routing table; subsequent dispatches report
    /// not-handled.
    pub fn shutdown(&self) {
        let mut routes = self.routes.write();
        debug!(routes = routes.len(), "router shutting down");
        routes.clear();
    }

    fn resolve(&self, directive: &Directive) -> Option<Arc<dyn DirectiveHandler>> {
        let routes = self.routes.read();
        routes
            .get(directive.key())
            .map(|entry| Arc::clone(&entry.handler))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vox_handler::testing::{MockDirectiveHandler, RecordingCompletionToken};

    fn directive(namespace: &str, name: &str, message_id: &str) -> Arc<Directive> {
        Arc::new(
            Directive::builder(namespace, name)
                .message_id(message_id)
                .build()
                .expect("valid directive"),
        )
    }

    fn handler(name: &str, keys: &[(&str, &str)]) -> Arc<MockDirectiveHandler> {
        let mut mock = MockDirectiveHandler::new(name);
        for (namespace, op) in keys {
            mock = mock.with_key(*namespace, *op, BlockingPolicy::none());
        }
        Arc::new(mock)
    }

    #[test]
    fn add_and_resolve() {
        let router = DirectiveRouter::new();
        let speech = handler("speech", &[("Speech", "Speak")]);
        assert!(router.add_handler(Arc::clone(&speech) as _));
        assert!(router.has_handler_for(&RoutingKey::new("Speech", "Speak")));

        let d = directive("Speech", "Speak", "m1");
        assert!(router.handle_immediately(&d));
        assert_eq!(speech.immediately_handled(), vec!["m1".to_string()]);
    }

    #[test]
    fn add_conflict_is_all_or_nothing() {
        let router = DirectiveRouter::new();
        let first = handler("first", &[("A", "X")]);
        assert!(router.add_handler(Arc::clone(&first) as _));

        // Claims one fresh key and one conflicting key.
        let second = handler("second", &[("A", "X"), ("A", "Y")]);
        let err = router
            .try_add_handler(Arc::clone(&second) as _)
            .expect_err("conflicting registration");
        assert!(matches!(err, DispatchError::HandlerConflict { .. }));

        // The fresh key must not have been registered.
        assert!(!router.has_handler_for(&RoutingKey::new("A", "Y")));
    }

    #[test]
    fn re_adding_same_handler_is_accepted() {
        let router = DirectiveRouter::new();
        let h = handler("h", &[("A", "X")]);
        assert!(router.add_handler(Arc::clone(&h) as _));
        assert!(router.add_handler(Arc::clone(&h) as _));
    }

    #[test]
    fn empty_configuration_is_rejected() {
        let router = DirectiveRouter::new();
        let empty = handler("empty", &[]);
        let err = router
            .try_add_handler(Arc::clone(&empty) as _)
            .expect_err("empty configuration");
        assert!(matches!(err, DispatchError::EmptyConfiguration { .. }));
    }

    #[test]
    fn remove_restores_pre_state() {
        let router = DirectiveRouter::new();
        let h = handler("h", &[("A", "X"), ("A", "Y")]);
        assert!(router.add_handler(Arc::clone(&h) as _));
        assert!(router.remove_handler(&(Arc::clone(&h) as _)));
        assert!(!router.has_handler_for(&RoutingKey::new("A", "X")));
        assert!(!router.has_handler_for(&RoutingKey::new("A", "Y")));
    }

    #[test]
    fn remove_refuses_foreign_keys() {
        let router = DirectiveRouter::new();
        let owner = handler("owner", &[("A", "X")]);
        let impostor = handler("impostor", &[("A", "X")]);
        assert!(router.add_handler(Arc::clone(&owner) as _));

        let err = router
            .try_remove_handler(&(Arc::clone(&impostor) as _))
            .expect_err("foreign deregistration");
        assert!(matches!(err, DispatchError::UnclaimedKey { .. }));
        assert!(router.has_handler_for(&RoutingKey::new("A", "X")));
    }

    #[test]
    fn handle_immediately_unknown_key_returns_false() {
        let router = DirectiveRouter::new();
        assert!(!router.handle_immediately(&directive("No", "Handler", "m1")));
    }

    #[test]
    fn pre_handle_and_handle_with_policy() {
        let router = DirectiveRouter::new();
        let mock = Arc::new(
            MockDirectiveHandler::new("speech").with_key(
                "Speech",
                "Speak",
                BlockingPolicy::audio_blocking(),
            ),
        );
        assert!(router.add_handler(Arc::clone(&mock) as _));

        let d = directive("Speech", "Speak", "m1");
        let token = Arc::new(RecordingCompletionToken::new());
        assert!(router.pre_handle(Arc::clone(&d), token));

        let (handled, policy) = router.handle_with_policy(&d);
        assert!(handled);
        assert_eq!(policy, BlockingPolicy::audio_blocking());
        assert_eq!(mock.handled(), vec!["m1".to_string()]);
    }

    #[test]
    fn handle_with_policy_unknown_key() {
        let router = DirectiveRouter::new();
        let (handled, policy) = router.handle_with_policy(&directive("No", "Handler", "m1"));
        assert!(!handled);
        assert!(policy.is_none());
    }

    #[test]
    fn cancel_without_handler_is_a_no_op() {
        let router = DirectiveRouter::new();
        router.cancel(&directive("No", "Handler", "m1"));
    }

    #[test]
    fn shutdown_empties_the_table() {
        let router = DirectiveRouter::new();
        let h = handler("h", &[("A", "X")]);
        assert!(router.add_handler(Arc::clone(&h) as _));

        router.shutdown();
        assert!(!router.has_handler_for(&RoutingKey::new("A", "X")));
        assert!(!router.handle_immediately(&directive("A", "X", "m1")));
        assert!(h.immediately_handled().is_empty());
    }

    #[test]
    fn policy_lookup() {
        let router = DirectiveRouter::new();
        let mock = Arc::new(MockDirectiveHandler::new("visual").with_key(
            "Template",
            "Render",
            BlockingPolicy::visual_nonblocking(),
        ));
        assert!(router.add_handler(Arc::clone(&mock) as _));
        assert_eq!(
            router.policy(&RoutingKey::new("Template", "Render")),
            Some(BlockingPolicy::visual_nonblocking())
        );
        assert_eq!(router.policy(&RoutingKey::new("Template", "Other")), None);
    }
}
