//! Orderly teardown coordination.
//!
//! Components that own threads register with a [`ShutdownNotifier`];
//! at teardown the notifier walks its observers and asks each to
//! quiesce. Observers are held weakly — the notifier never extends a
//! component's lifetime, it only reaches components still alive when
//! teardown fires.
//!
//! ```text
//! construction:                         teardown:
//!
//! notifier.add_observer(&sequencer)     notifier.notify_shutdown()
//!          (stores Weak)                    │ upgrade → Some
//!                                           ▼
//!                                    sequencer.shutdown()
//! ```

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Implemented by components that must quiesce at teardown.
pub trait RequiresShutdown: Send + Sync {
    /// Stable component name for teardown logs.
    fn name(&self) -> &str;

    /// Stops the component's threads and refuses further work.
    ///
    /// Must be idempotent; the notifier guards against double
    /// notification but components may also be shut down directly.
    fn shutdown(&self);
}

/// Collects weak references to shutdown observers and notifies them
/// once at teardown.
#[derive(Default)]
pub struct ShutdownNotifier {
    observers: Mutex<Vec<Weak<dyn RequiresShutdown>>>,
    notified: AtomicBool,
}

impl ShutdownNotifier {
    /// Creates an empty notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer.
    ///
    /// Only a weak reference is stored; observers dropped before
    /// [`notify_shutdown`](Self::notify_shutdown) are skipped.
    /// Registration after notification is accepted but logs a warning
    /// and will never be called.
    pub fn add_observer(&self, observer: &Arc<dyn RequiresShutdown>) {
        if self.notified.load(Ordering::SeqCst) {
            warn!(
                observer = observer.name(),
                "observer registered after shutdown notification"
            );
        }
        self.observers.lock().push(Arc::downgrade(observer));
    }

    /// Notifies every live observer, exactly once.
    ///
    /// A second call is a no-op.
    pub fn notify_shutdown(&self) {
        if self.notified.swap(true, Ordering::SeqCst) {
            warn!("shutdown already notified");
            return;
        }
        let observers = std::mem::take(&mut *self.observers.lock());
        for weak in observers {
            match weak.upgrade() {
                Some(observer) => {
                    info!(observer = observer.name(), "shutting down observer");
                    observer.shutdown();
                }
                None => debug!("skipping dropped observer"),
            }
        }
    }

    /// Number of registered observers (live or not).
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }
}
