//! Application core: the RIMS control loop and its boundary.
//!
//! The loop orchestrates the PID engine and the safety interlock against
//! the outside world. All interaction with sensors, the heater, the kettle
//! registry, time and observability happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real hardware.

pub mod control_loop;
pub mod events;
pub mod heater;
pub mod ports;
pub mod state;
pub mod stop;
