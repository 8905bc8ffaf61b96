//! Discrete PID controller for RIMS heater power.
//!
//! Arduino-style positional PID:
//!
//! - recomputes at most once per sample period, whatever the call rate;
//! - derivative acts on the measured input, not the error, so setpoint
//!   changes do not kick the output;
//! - the integral term only accumulates while the previous output was
//!   unsaturated, and is itself clamped to the output limits.
//!
//! `ki` and `kd` are scaled by the sample period at construction so the
//! per-sample formula carries no time units.

use core::cmp::Ordering;

use log::debug;

use super::Clock;
use crate::error::ConfigError;

/// Default output range: heater power in percent.
pub const DEFAULT_OUTPUT_MIN: f32 = 0.0;
pub const DEFAULT_OUTPUT_MAX: f32 = 100.0;

/// Breakdown of the most recent recomputation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidTerms {
    pub p: f32,
    pub i: f32,
    pub d: f32,
}

/// Validating builder for [`PidController`].
#[derive(Debug, Clone, Copy)]
pub struct PidBuilder {
    kp: Option<f32>,
    ki: Option<f32>,
    kd: Option<f32>,
    sample_time_secs: f32,
    output_min: f32,
    output_max: f32,
}

impl Default for PidBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PidBuilder {
    pub fn new() -> Self {
        Self {
            kp: None,
            ki: None,
            kd: None,
            sample_time_secs: 0.0,
            output_min: DEFAULT_OUTPUT_MIN,
            output_max: DEFAULT_OUTPUT_MAX,
        }
    }

    /// Unscaled proportional, integral and derivative gains.
    pub fn gains(mut self, kp: f32, ki: f32, kd: f32) -> Self {
        self.kp = Some(kp);
        self.ki = Some(ki);
        self.kd = Some(kd);
        self
    }

    pub fn kp(mut self, kp: f32) -> Self {
        self.kp = Some(kp);
        self
    }

    pub fn ki(mut self, ki: f32) -> Self {
        self.ki = Some(ki);
        self
    }

    pub fn kd(mut self, kd: f32) -> Self {
        self.kd = Some(kd);
        self
    }

    pub fn sample_time_secs(mut self, secs: f32) -> Self {
        self.sample_time_secs = secs;
        self
    }

    pub fn output_limits(mut self, min: f32, max: f32) -> Self {
        self.output_min = min;
        self.output_max = max;
        self
    }

    /// Validate the parameters and build a controller reading time from `clock`.
    pub fn build<C: Clock>(self, clock: C) -> Result<PidController<C>, ConfigError> {
        let kp = finite_gain(self.kp, "kp")?;
        let ki = finite_gain(self.ki, "ki")?;
        let kd = finite_gain(self.kd, "kd")?;

        let secs = self.sample_time_secs;
        if !secs.is_finite() || secs <= 0.0 {
            return Err(ConfigError::NonPositiveSampleTime);
        }
        // NaN limits compare as unordered and are rejected here too.
        if self.output_min.partial_cmp(&self.output_max) != Some(Ordering::Less) {
            return Err(ConfigError::InvertedOutputLimits);
        }

        Ok(PidController {
            kp,
            ki: ki * secs,
            kd: kd / secs,
            sample_time_ms: f64::from(secs) * 1000.0,
            output_min: self.output_min,
            output_max: self.output_max,
            integral: 0.0,
            last_input: 0.0,
            last_output: 0.0,
            last_calc_ms: None,
            terms: PidTerms::default(),
            clock,
        })
    }
}

fn finite_gain(gain: Option<f32>, name: &'static str) -> Result<f32, ConfigError> {
    match gain {
        None => Err(ConfigError::MissingGain(name)),
        Some(g) if !g.is_finite() => Err(ConfigError::InvalidGain(name)),
        Some(g) => Ok(g),
    }
}

/// PID controller with sample-time gating and integral anti-windup.
pub struct PidController<C: Clock> {
    kp: f32,
    /// Integral gain, pre-multiplied by the sample period (s).
    ki: f32,
    /// Derivative gain, pre-divided by the sample period (s).
    kd: f32,
    sample_time_ms: f64,
    output_min: f32,
    output_max: f32,
    integral: f32,
    last_input: f32,
    last_output: f32,
    /// `None` until the first recomputation, so the first call always computes.
    last_calc_ms: Option<f64>,
    terms: PidTerms,
    clock: C,
}

impl<C: Clock> PidController<C> {
    /// Compute the output for `input` against `setpoint`.
    ///
    /// Returns the previous output unchanged if less than one sample period
    /// has elapsed since the last recomputation.
    pub fn calc(&mut self, input: f32, setpoint: f32) -> f32 {
        let now = self.clock.now_ms();
        if let Some(last) = self.last_calc_ms {
            if now - last < self.sample_time_ms {
                return self.last_output;
            }
        }

        let error = setpoint - input;
        let d_input = input - self.last_input;

        if self.last_output > self.output_min && self.last_output < self.output_max {
            self.integral =
                (self.integral + self.ki * error).clamp(self.output_min, self.output_max);
        }

        let p = self.kp * error;
        let i = self.integral;
        let d = -(self.kd * d_input);
        let output = (p + i + d).clamp(self.output_min, self.output_max);

        debug!("PID P: {:.3} I: {:.3} D: {:.3} output: {:.3}", p, i, d, output);

        self.terms = PidTerms { p, i, d };
        self.last_input = input;
        self.last_output = output;
        self.last_calc_ms = Some(now);
        output
    }

    /// Current integral accumulator.
    pub fn integral(&self) -> f32 {
        self.integral
    }

    /// Output returned by the most recent recomputation.
    pub fn last_output(&self) -> f32 {
        self.last_output
    }

    /// P/I/D contributions of the most recent recomputation.
    pub fn terms(&self) -> PidTerms {
        self.terms
    }

    /// Gains as used per sample: `(kp, ki * T, kd / T)`.
    pub fn tunings(&self) -> (f32, f32, f32) {
        (self.kp, self.ki, self.kd)
    }

    pub fn sample_time_ms(&self) -> f64 {
        self.sample_time_ms
    }

    pub fn output_limits(&self) -> (f32, f32) {
        (self.output_min, self.output_max)
    }
}
