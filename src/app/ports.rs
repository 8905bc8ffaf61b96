//! Port traits: the hexagonal boundary between the control loop and the
//! host it runs in.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlLoop (domain)
//! ```
//!
//! Driven adapters (sensors, heater, kettle registry, time, event sinks)
//! implement these traits. The [`ControlLoop`](super::control_loop::ControlLoop)
//! consumes them via generics, so the domain core never touches hardware
//! directly.
//!
//! Every method except [`TimePort::sleep`] is synchronous: a control
//! iteration never yields, so no other task can observe it half done.

use core::time::Duration;

use crate::config::DeviceId;
use crate::control::Clock;
use crate::error::{ActuatorError, KettleError, SensorError};

use super::events::AppEvent;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Temperature sensors, addressed by id. Readings are in the host's
/// configured unit.
pub trait SensorPort {
    fn read_temperature(&mut self, sensor: &DeviceId) -> Result<f32, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Heater power control.
///
/// `set_power` must be idempotent. `turn_off` must be safe to call any
/// number of times, including from the shutdown path after a failure.
pub trait ActuatorPort {
    /// Power the actuator currently reports (0–100).
    fn power(&self, actuator: &DeviceId) -> Result<f32, ActuatorError>;

    /// Command a power level (0–100).
    fn set_power(&mut self, actuator: &DeviceId, power: f32) -> Result<(), ActuatorError>;

    /// De-energise the actuator.
    fn turn_off(&mut self, actuator: &DeviceId) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Kettle port (driven adapter: host registry → domain)
// ───────────────────────────────────────────────────────────────

/// Source of the kettle's target temperature. Queried every iteration; the
/// brewer may change the target at any time.
pub trait KettlePort {
    fn target_temperature(&self, kettle: &DeviceId) -> Result<f32, KettleError>;
}

/// Everything the loop needs from the hardware side, in one value.
///
/// Taking a single `&mut impl RimsHardware` avoids juggling several
/// mutable borrows of what is usually one adapter.
pub trait RimsHardware: SensorPort + ActuatorPort + KettlePort {}

impl<T: SensorPort + ActuatorPort + KettlePort> RimsHardware for T {}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Monotonic time plus the loop's only suspension point.
#[allow(async_fn_in_trait)]
pub trait TimePort: Clock {
    async fn sleep(&self, duration: Duration);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The loop emits structured [`AppEvent`]s through this port. Adapters
/// decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

impl<E: EventSink + ?Sized> EventSink for &mut E {
    fn emit(&mut self, event: &AppEvent) {
        (**self).emit(event);
    }
}
