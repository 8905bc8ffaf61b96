//! Host time adapter.
//!
//! Monotonic time from `std::time::Instant`, sleeping on an
//! `async_io_mini::Timer`. An optional speed-up factor runs the control
//! loop faster than wall-clock time against the simulated plant: both the
//! clock and the sleeps are scaled, so the loop still sees whole sample
//! periods.

use core::time::Duration;
use std::time::Instant;

use crate::app::ports::TimePort;
use crate::control::Clock;

/// Time adapter for the host.
#[derive(Debug, Clone, Copy)]
pub struct StdTimeAdapter {
    start: Instant,
    speedup: f64,
}

impl Default for StdTimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl StdTimeAdapter {
    pub fn new() -> Self {
        Self::with_speedup(1.0)
    }

    /// Clock running `speedup` times faster than wall time. Values that are
    /// not finite and positive are treated as 1.
    pub fn with_speedup(speedup: f64) -> Self {
        let speedup = if speedup.is_finite() && speedup > 0.0 {
            speedup
        } else {
            1.0
        };
        Self {
            start: Instant::now(),
            speedup,
        }
    }

    pub fn speedup(&self) -> f64 {
        self.speedup
    }

    /// Scaled seconds since this adapter was created.
    pub fn uptime_secs(&self) -> f64 {
        self.now_ms() / 1000.0
    }

    /// Wall-clock time corresponding to `scaled`, rounded up to the next
    /// millisecond so a scaled sleep never ends early.
    fn wall(&self, scaled: Duration) -> Duration {
        let ms = (scaled.as_secs_f64() * 1000.0 / self.speedup).ceil();
        Duration::from_millis(ms as u64)
    }
}

impl Clock for StdTimeAdapter {
    fn now_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0 * self.speedup
    }
}

impl TimePort for StdTimeAdapter {
    async fn sleep(&self, duration: Duration) {
        async_io_mini::Timer::after(self.wall(duration)).await;
    }
}
