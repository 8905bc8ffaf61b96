//! Unified error types for the RIMS controller.
//!
//! A single `Error` enum that every port and subsystem converts into, so the
//! control loop can contain every failure in one place. All variants are
//! `Copy`: they travel through events and run reports without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A temperature sensor could not be read or returned unusable data.
    Sensor(SensorError),
    /// An actuator query or command failed.
    Actuator(ActuatorError),
    /// The kettle's target temperature could not be obtained.
    Kettle(KettleError),
    /// Configuration is invalid or structurally incomplete.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Kettle(e) => write!(f, "kettle: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// No sensor is registered under the requested id.
    NotFound,
    /// The sensor driver failed to produce a reading.
    ReadFailed,
    /// The reading is not a finite number.
    OutOfRange,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "sensor not found"),
            Self::ReadFailed => write!(f, "read failed"),
            Self::OutOfRange => write!(f, "reading out of range"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// No actuator is registered under the requested id.
    NotFound,
    /// The power command was rejected or did not complete.
    CommandFailed,
    /// The actuator state could not be queried.
    QueryFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "actuator not found"),
            Self::CommandFailed => write!(f, "command failed"),
            Self::QueryFailed => write!(f, "power query failed"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Kettle errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KettleError {
    /// No kettle is registered under the requested id.
    NotFound,
    /// The kettle exists but has no usable target temperature.
    TargetUnavailable,
}

impl fmt::Display for KettleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "kettle not found"),
            Self::TargetUnavailable => write!(f, "target temperature unavailable"),
        }
    }
}

impl From<KettleError> for Error {
    fn from(e: KettleError) -> Self {
        Self::Kettle(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A PID gain was never supplied (names the gain).
    MissingGain(&'static str),
    /// A PID gain is NaN or infinite (names the gain).
    InvalidGain(&'static str),
    /// The sample time is zero, negative or not finite.
    NonPositiveSampleTime,
    /// `output_min` is not strictly below `output_max`.
    InvertedOutputLimits,
    /// A property is absent from the property bag (names the key).
    MissingProperty(&'static str),
    /// A property holds a value that cannot be used (names the key).
    InvalidProperty(&'static str),
    /// The kettle has no heater actuator configured.
    MissingHeater,
    /// The kettle has no primary temperature sensor configured.
    MissingSensor,
    /// A device id does not fit the fixed-capacity id buffer.
    IdTooLong,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingGain(name) => write!(f, "gain {name} must be specified"),
            Self::InvalidGain(name) => write!(f, "gain {name} must be finite"),
            Self::NonPositiveSampleTime => write!(f, "sample time must be greater than 0"),
            Self::InvertedOutputLimits => write!(f, "output min must be less than output max"),
            Self::MissingProperty(key) => write!(f, "property '{key}' missing"),
            Self::InvalidProperty(key) => write!(f, "property '{key}' invalid"),
            Self::MissingHeater => write!(f, "no heater configured"),
            Self::MissingSensor => write!(f, "no kettle sensor configured"),
            Self::IdTooLong => write!(f, "device id too long"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
