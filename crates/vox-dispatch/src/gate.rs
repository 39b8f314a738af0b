//! Blocking-policy admission gate.
//!
//! Tracks which mediums in-flight directives hold and decides when a
//! candidate may begin handling. The rule, for a candidate `C` against
//! every in-flight record `r`:
//!
//! > `C` is admitted iff for every medium `m` in `C.mediums`, no `r`
//! > holds `m` with `r.is_blocking || C.is_blocking`.
//!
//! Consequences:
//!
//! - Disjoint mediums never interact.
//! - Non-blocking directives share a medium freely.
//! - A blocking directive excludes everyone on its mediums, in both
//!   directions.
//! - An empty-medium policy is admitted immediately and holds nothing.
//!
//! The gate never reorders: it is consulted for one directive at a
//! time by the processor's worker, so a blocked head-of-queue
//! directive delays everything behind it — which is exactly the
//! per-dialog FIFO guarantee.

use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;
use vox_types::BlockingPolicy;

/// Outcome of an admission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// The directive may begin handling; its mediums are now held.
    Admitted,
    /// A conflicting in-flight directive holds a needed medium.
    BlockedOn(String),
}

/// Enforces per-medium mutual exclusion for in-flight directives.
#[derive(Default)]
pub struct BlockingPolicyGate {
    in_flight: Mutex<HashMap<String, BlockingPolicy>>,
    freed: Condvar,
}

impl BlockingPolicyGate {
    /// Creates a gate with nothing in flight.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to admit `message_id` under `policy`.
    ///
    /// On [`Admission::Admitted`] the directive's mediums are recorded
    /// as held until [`release`](Self::release). Empty-medium policies
    /// are admitted without recording anything.
    pub fn try_admit(&self, message_id: &str, policy: &BlockingPolicy) -> Admission {
        let mut in_flight = self.in_flight.lock();
        Self::admit_locked(&mut in_flight, message_id, policy)
    }

    /// Blocks until `message_id` is admitted or `cancelled` is set.
    ///
    /// Returns `false` on cancellation; the flag is re-checked on
    /// every wakeup, and cancellers are expected to poke the gate via
    /// [`release`](Self::release) (which always notifies, even for
    /// ids that hold nothing).
    pub fn wait_until_admitted(
        &self,
        message_id: &str,
        policy: &BlockingPolicy,
        cancelled: &AtomicBool,
    ) -> bool {
        let mut in_flight = self.in_flight.lock();
        loop {
            if cancelled.load(Ordering::SeqCst) {
                return false;
            }
            match Self::admit_locked(&mut in_flight, message_id, policy) {
                Admission::Admitted => return true,
                Admission::BlockedOn(blocker) => {
                    debug!(message_id, blocker = %blocker, "waiting for medium");
                    self.freed.wait(&mut in_flight);
                }
            }
        }
    }

    /// Drops the record for `message_id` and wakes all waiters.
    ///
    /// Always notifies — cancellation of a directive that never
    /// admitted rides the same wakeup. Returns `true` if a record was
    /// actually held.
    pub fn release(&self, message_id: &str) -> bool {
        let removed = self.in_flight.lock().remove(message_id).is_some();
        if removed {
            debug!(message_id, "released mediums");
        }
        self.freed.notify_all();
        removed
    }

    /// Returns `true` if `message_id` currently holds mediums.
    #[must_use]
    pub fn is_in_flight(&self, message_id: &str) -> bool {
        self.in_flight.lock().contains_key(message_id)
    }

    /// Number of directives currently holding mediums.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    fn admit_locked(
        in_flight: &mut HashMap<String, BlockingPolicy>,
        message_id: &str,
        policy: &BlockingPolicy,
    ) -> Admission {
        let blocker = in_flight
            .iter()
            .find(|(held_id, held)| held_id.as_str() != message_id && held.conflicts_with(policy))
            .map(|(held_id, _)| held_id.clone());
        match blocker {
            Some(blocker) => Admission::BlockedOn(blocker),
            None => {
                if !policy.mediums().is_empty() {
                    in_flight.insert(message_id.to_string(), *policy);
                }
                Admission::Admitted
            }
        }
    }
}
