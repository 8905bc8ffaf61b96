//! Simulated RIMS mash: a host-side stand-in for the brewery hardware.
//!
//! Implements [`SensorPort`], [`ActuatorPort`] and [`KettlePort`] over a
//! two-node thermal model. The heater warms the liquid in the RIMS tube,
//! recirculation carries that heat into the mash tun, and the tun loses
//! heat to ambient:
//!
//! ```text
//!   heater ──▶ [ RIMS tube ] ══ recirculation ══▶ [ MLT ] ──▶ ambient
//! ```
//!
//! The model integrates against whatever [`Clock`] it is given, so it runs
//! at the same (possibly accelerated) rate as the control loop.

use log::debug;

use crate::app::ports::{ActuatorPort, KettlePort, SensorPort};
use crate::config::DeviceId;
use crate::control::Clock;
use crate::error::{ActuatorError, KettleError, SensorError};

/// Largest integration step, in seconds.
const MAX_STEP_SECS: f64 = 0.5;

/// Thermal constants of the simulated plant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantParams {
    /// Tube temperature rise per second at 100 % power with no flow.
    pub heater_rate: f64,
    /// Heat exchange rate between tube and tun liquid (1/s).
    pub flow: f64,
    /// Tube volume relative to the tun.
    pub tube_ratio: f64,
    /// Tun loss rate to ambient (1/s).
    pub loss: f64,
    pub ambient: f64,
}

impl Default for PlantParams {
    fn default() -> Self {
        Self {
            heater_rate: 1.5,
            flow: 0.5,
            tube_ratio: 0.02,
            loss: 0.000_5,
            ambient: 20.0,
        }
    }
}

/// Device ids the simulated hardware answers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimWiring {
    pub kettle: DeviceId,
    pub heater: DeviceId,
    pub mlt_sensor: DeviceId,
    pub rims_sensor: DeviceId,
}

/// Simulated mash tun with a RIMS heater.
pub struct SimulatedMash<C: Clock> {
    wiring: SimWiring,
    params: PlantParams,
    clock: C,
    last_ms: f64,
    mlt_temp: f64,
    rims_temp: f64,
    power: f32,
    target: f32,
}

impl<C: Clock> SimulatedMash<C> {
    /// A mash at `initial_temp` throughout, heater off.
    pub fn new(
        wiring: SimWiring,
        params: PlantParams,
        clock: C,
        initial_temp: f32,
        target: f32,
    ) -> Self {
        let last_ms = clock.now_ms();
        Self {
            wiring,
            params,
            clock,
            last_ms,
            mlt_temp: f64::from(initial_temp),
            rims_temp: f64::from(initial_temp),
            power: 0.0,
            target,
        }
    }

    pub fn mlt_temp(&self) -> f32 {
        self.mlt_temp as f32
    }

    pub fn rims_temp(&self) -> f32 {
        self.rims_temp as f32
    }

    /// Integrate the model up to the clock's current time.
    fn advance(&mut self) {
        let now = self.clock.now_ms();
        let mut remaining = ((now - self.last_ms) / 1000.0).max(0.0);
        self.last_ms = now;

        let p = &self.params;
        let heat = p.heater_rate * f64::from(self.power) / 100.0;
        while remaining > 0.0 {
            let dt = remaining.min(MAX_STEP_SECS);
            let exchange = p.flow * (self.rims_temp - self.mlt_temp);
            self.rims_temp += (heat - exchange) * dt;
            self.mlt_temp += (p.tube_ratio * exchange - p.loss * (self.mlt_temp - p.ambient)) * dt;
            remaining -= dt;
        }
    }
}

impl<C: Clock> SensorPort for SimulatedMash<C> {
    fn read_temperature(&mut self, sensor: &DeviceId) -> Result<f32, SensorError> {
        self.advance();
        if *sensor == self.wiring.mlt_sensor {
            Ok(self.mlt_temp())
        } else if *sensor == self.wiring.rims_sensor {
            Ok(self.rims_temp())
        } else {
            Err(SensorError::NotFound)
        }
    }
}

impl<C: Clock> ActuatorPort for SimulatedMash<C> {
    fn power(&self, actuator: &DeviceId) -> Result<f32, ActuatorError> {
        if *actuator != self.wiring.heater {
            return Err(ActuatorError::NotFound);
        }
        Ok(self.power)
    }

    fn set_power(&mut self, actuator: &DeviceId, power: f32) -> Result<(), ActuatorError> {
        if *actuator != self.wiring.heater {
            return Err(ActuatorError::NotFound);
        }
        if !(0.0..=100.0).contains(&power) {
            return Err(ActuatorError::CommandFailed);
        }
        // Heat delivered so far was at the old power level.
        self.advance();
        debug!("sim: heater {:.1}% -> {:.1}%", self.power, power);
        self.power = power;
        Ok(())
    }

    fn turn_off(&mut self, actuator: &DeviceId) -> Result<(), ActuatorError> {
        self.set_power(actuator, 0.0)
    }
}

impl<C: Clock> KettlePort for SimulatedMash<C> {
    fn target_temperature(&self, kettle: &DeviceId) -> Result<f32, KettleError> {
        if *kettle != self.wiring.kettle {
            return Err(KettleError::NotFound);
        }
        Ok(self.target)
    }
}
