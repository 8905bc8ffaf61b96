//! Scoped heater ownership for one control-loop run.
//!
//! [`HeaterGuard::arm`] takes the hardware for the lifetime of the run.
//! The heater is de-energised exactly once: by [`HeaterGuard::release`] on
//! the normal shutdown path, or by `Drop` if the run is abandoned mid-await
//! (for example the executor drops the task while it sleeps).

use log::{error, info};

use crate::config::DeviceId;
use crate::error::ActuatorError;

use super::ports::ActuatorPort;

/// Armed heater; turns itself off when released or dropped.
pub struct HeaterGuard<'a, H: ActuatorPort> {
    hw: &'a mut H,
    heater: DeviceId,
    armed: bool,
}

impl<'a, H: ActuatorPort> HeaterGuard<'a, H> {
    pub fn arm(hw: &'a mut H, heater: DeviceId) -> Self {
        info!("Heater '{}' armed", heater);
        Self {
            hw,
            heater,
            armed: true,
        }
    }

    pub fn heater(&self) -> &DeviceId {
        &self.heater
    }

    /// Hardware access while the heater is armed.
    pub fn hw(&mut self) -> &mut H {
        &mut *self.hw
    }

    /// Turn the heater off and disarm. Later calls and the drop are no-ops.
    pub fn release(&mut self) -> Result<(), ActuatorError> {
        if !self.armed {
            return Ok(());
        }
        self.armed = false;
        let result = self.hw.turn_off(&self.heater);
        match result {
            Ok(()) => info!("Heater '{}' off", self.heater),
            Err(e) => error!("Heater '{}' turn-off failed: {}", self.heater, e),
        }
        result
    }
}

impl<H: ActuatorPort> Drop for HeaterGuard<'_, H> {
    fn drop(&mut self) {
        // Errors are logged by `release`; nothing more can be done here.
        let _ = self.release();
    }
}
