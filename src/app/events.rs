//! Outbound application events.
//!
//! The [`ControlLoop`](super::control_loop::ControlLoop) emits these through
//! the [`EventSink`](super::ports::EventSink) port. Adapters on the other
//! side decide what to do with them.

use crate::config::DeviceId;
use crate::error::Error;
use crate::safety::InterlockTrip;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A stop was requested through the stop signal.
    Requested,
    /// The run hit an unrecovered error.
    Faulted(Error),
    /// The run future was dropped before the loop finished.
    Cancelled,
}

/// Structured events emitted by the control loop.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The loop resolved its configuration and armed the heater.
    Started { kettle: DeviceId, heater: DeviceId },

    /// The RIMS interlock forced heater power to zero. Warning level.
    InterlockTripped(InterlockTrip),

    /// A new power level was sent to the heater.
    PowerCommanded { power: f32 },

    /// The run failed. Error level.
    Faulted(Error),

    /// The loop reached its terminal state; the heater has been turned off
    /// when one was configured.
    Stopped { reason: StopReason, iterations: u64 },
}
