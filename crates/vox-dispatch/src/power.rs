//! Power keep-alive accounting.
//!
//! Always-listening devices aggressively enter low-power sleep. While
//! the pipeline has threads that may need to run — a directive could
//! arrive at any moment — it holds a [`PowerResource`] keep-alive and
//! attributes its long-lived threads to it, so the platform's power
//! manager knows who is keeping the device awake.
//!
//! The concrete resource is platform glue and injectable;
//! [`NoopPowerResource`] is the default for platforms without power
//! management and for tests.

/// A process-wide power keep-alive handle.
///
/// `acquire`/`release` bracket the pipeline's lifetime; the thread
/// attribution calls bracket each owned thread's run loop. Calls are
/// expected to be cheap and must not block.
pub trait PowerResource: Send + Sync {
    /// Takes the keep-alive. Called once at pipeline construction.
    fn acquire(&self);

    /// Drops the keep-alive. Called once at pipeline shutdown.
    fn release(&self);

    /// Attributes the calling thread to this keep-alive.
    fn attribute_current_thread(&self);

    /// Removes the calling thread's attribution.
    fn detach_current_thread(&self);
}

/// A [`PowerResource`] that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPowerResource;

impl PowerResource for NoopPowerResource {
    fn acquire(&self) {}
    fn release(&self) {}
    fn attribute_current_thread(&self) {}
    fn detach_current_thread(&self) {}
}
