//! Closed-loop control primitives.
//!
//! The PID engine measures elapsed time through the [`Clock`] trait so its
//! sample-time gate can be driven by a real monotonic clock in production and
//! by a hand-advanced clock in tests.

pub mod pid;

/// Monotonic millisecond time source.
pub trait Clock {
    /// Milliseconds since an arbitrary, fixed origin. Never decreases.
    fn now_ms(&self) -> f64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> f64 {
        (**self).now_ms()
    }
}
