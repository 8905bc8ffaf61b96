//! Cooperative stop request for a running control loop.
//!
//! Built on an `embassy-sync` [`Signal`] over [`NoopRawMutex`]: the loop and
//! whoever stops it share one thread of execution, so no real locking is
//! needed. The loop checks the signal at the top of every iteration and
//! races it against the end-of-iteration sleep.

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::signal::Signal;

/// Stop request shared between a control loop and its owner.
pub struct StopSignal {
    inner: Signal<NoopRawMutex, ()>,
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSignal {
    pub const fn new() -> Self {
        Self {
            inner: Signal::new(),
        }
    }

    /// Ask the loop to stop. Idempotent.
    pub fn request_stop(&self) {
        self.inner.signal(());
    }

    /// Whether a stop has been requested and not yet consumed.
    pub fn is_requested(&self) -> bool {
        self.inner.signaled()
    }

    /// Wait until a stop is requested.
    pub async fn wait(&self) {
        self.inner.wait().await;
    }

    /// Clear a pending request so the loop can be run again.
    pub fn reset(&self) {
        self.inner.reset();
    }
}
