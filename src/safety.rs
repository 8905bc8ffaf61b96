//! RIMS over-temperature interlock.
//!
//! The heating element sits in a small tube; if recirculation slows, the
//! liquid there can run far hotter than the mash the PID is watching. The
//! interlock compares the RIMS-side sensor against `target + delta` on
//! **every** loop iteration, independently of the PID's sample-time gate,
//! and forces heater power to zero while the limit is exceeded.
//!
//! ## Semantics
//!
//! - `rims_temp > target + delta` → output `0`, trip reported.
//! - exactly at the limit → no trip.
//! - no RIMS sensor configured → never trips; the candidate passes through.
//!
//! The interlock holds no state: a trip lasts exactly as long as the
//! condition does.

use core::fmt;

use crate::config::TempUnit;

/// Details of an interlock trip, carried in the warning event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterlockTrip {
    /// RIMS-side temperature that exceeded the limit.
    pub rims_temp: f32,
    /// `target + delta` at the time of the trip.
    pub limit: f32,
    pub unit: TempUnit,
}

impl fmt::Display for InterlockTrip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RIMS temperature {:.1}{} above limit {:.1}{}, heater cut",
            self.rims_temp, self.unit, self.limit, self.unit
        )
    }
}

/// Result of one interlock evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterlockDecision {
    /// Output to command: the candidate, or `0` on a trip.
    pub output: f32,
    pub trip: Option<InterlockTrip>,
}

impl InterlockDecision {
    pub fn tripped(&self) -> bool {
        self.trip.is_some()
    }
}

/// Stateless RIMS over-temperature cut-off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyInterlock {
    delta: f32,
    unit: TempUnit,
}

impl SafetyInterlock {
    pub fn new(delta: f32, unit: TempUnit) -> Self {
        Self { delta, unit }
    }

    /// Decide the output for this iteration.
    ///
    /// `rims_temp` is `None` when no RIMS sensor is configured.
    pub fn evaluate(
        &self,
        candidate: f32,
        rims_temp: Option<f32>,
        target: f32,
    ) -> InterlockDecision {
        let limit = target + self.delta;
        match rims_temp {
            Some(rims_temp) if rims_temp > limit => InterlockDecision {
                output: 0.0,
                trip: Some(InterlockTrip {
                    rims_temp,
                    limit,
                    unit: self.unit,
                }),
            },
            _ => InterlockDecision {
                output: candidate,
                trip: None,
            },
        }
    }
}
