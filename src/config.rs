//! RIMS controller configuration.
//!
//! The host hands the controller a loosely typed property bag (numbers may
//! arrive as JSON numbers or numeric strings). [`RimsConfig::from_props`]
//! parses it once, at loop start, into a typed struct. Any tunable that is
//! missing or unusable falls back to its default and is logged; nothing is
//! parsed inside the control loop.

use core::fmt;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Maximum length of a sensor, actuator or kettle id.
pub const ID_CAPACITY: usize = 32;

/// Fixed-capacity device identifier.
pub type DeviceId = heapless::String<ID_CAPACITY>;

/// Build a [`DeviceId`] from a string slice.
pub fn device_id(id: &str) -> Result<DeviceId, ConfigError> {
    let mut out = DeviceId::new();
    out.push_str(id).map_err(|()| ConfigError::IdTooLong)?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Property keys and defaults
// ---------------------------------------------------------------------------

pub const KEY_P: &str = "P";
pub const KEY_I: &str = "I";
pub const KEY_D: &str = "D";
pub const KEY_DELTA: &str = "Delta";
pub const KEY_SAMPLE_TIME: &str = "SampleTime";
pub const KEY_RIMS_SENSOR: &str = "RIMS Sensor";
pub const KEY_TEMP_UNIT: &str = "TEMP_UNIT";

pub const DEFAULT_KP: f32 = 117.0795;
pub const DEFAULT_KI: f32 = 0.2747;
pub const DEFAULT_KD: f32 = 41.58;
pub const DEFAULT_DELTA: f32 = 2.0;

/// A configurable property as presented to the host UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyInfo {
    pub key: &'static str,
    pub kind: PropertyKind,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Number,
    /// One of a fixed set of whole-second values.
    Select(&'static [u8]),
    Sensor,
}

// ---------------------------------------------------------------------------
// Sample time
// ---------------------------------------------------------------------------

/// Control period. Only the two periods the host offers are representable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SampleTime {
    Two,
    #[default]
    Five,
}

impl SampleTime {
    pub const OPTIONS: &'static [u8] = &[2, 5];

    pub fn secs(self) -> u8 {
        match self {
            Self::Two => 2,
            Self::Five => 5,
        }
    }

    pub fn duration(self) -> core::time::Duration {
        core::time::Duration::from_secs(u64::from(self.secs()))
    }
}

impl TryFrom<u8> for SampleTime {
    type Error = ConfigError;

    fn try_from(secs: u8) -> Result<Self, Self::Error> {
        match secs {
            2 => Ok(Self::Two),
            5 => Ok(Self::Five),
            _ => Err(ConfigError::InvalidProperty(KEY_SAMPLE_TIME)),
        }
    }
}

impl From<SampleTime> for u8 {
    fn from(t: SampleTime) -> Self {
        t.secs()
    }
}

// ---------------------------------------------------------------------------
// Temperature unit
// ---------------------------------------------------------------------------

/// Process-wide temperature unit, used only to label readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TempUnit {
    #[default]
    #[serde(rename = "C")]
    Celsius,
    #[serde(rename = "F")]
    Fahrenheit,
}

impl TempUnit {
    /// Read `TEMP_UNIT` from the host's global configuration. Absent means
    /// Celsius; an unrecognised value is logged and treated as Celsius.
    pub fn from_host_config(config: &Map<String, Value>) -> Self {
        match config.get(KEY_TEMP_UNIT) {
            None | Some(Value::Null) => Self::default(),
            Some(v) => match v.as_str().map(str::trim) {
                Some("C" | "c") => Self::Celsius,
                Some("F" | "f") => Self::Fahrenheit,
                _ => {
                    warn!("host config: '{KEY_TEMP_UNIT}' invalid, using C");
                    Self::Celsius
                }
            },
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Celsius => "C",
            Self::Fahrenheit => "F",
        }
    }
}

impl fmt::Display for TempUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\u{00b0}{}", self.symbol())
    }
}

// ---------------------------------------------------------------------------
// RimsConfig
// ---------------------------------------------------------------------------

/// Validated controller tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RimsConfig {
    /// Proportional gain.
    pub kp: f32,
    /// Integral gain (per second).
    pub ki: f32,
    /// Derivative gain (seconds).
    pub kd: f32,
    /// Allowed RIMS temperature above target before the heater is cut.
    pub delta: f32,
    pub sample_time: SampleTime,
    /// Secondary sensor at the RIMS tube outlet.
    pub rims_sensor: Option<DeviceId>,
    pub temp_unit: TempUnit,
}

impl Default for RimsConfig {
    fn default() -> Self {
        Self {
            kp: DEFAULT_KP,
            ki: DEFAULT_KI,
            kd: DEFAULT_KD,
            delta: DEFAULT_DELTA,
            sample_time: SampleTime::default(),
            rims_sensor: None,
            temp_unit: TempUnit::default(),
        }
    }
}

impl RimsConfig {
    /// Every property the controller recognises.
    pub const PROPERTIES: &'static [PropertyInfo] = &[
        PropertyInfo {
            key: KEY_P,
            kind: PropertyKind::Number,
            description: "P Value of PID",
        },
        PropertyInfo {
            key: KEY_I,
            kind: PropertyKind::Number,
            description: "I Value of PID",
        },
        PropertyInfo {
            key: KEY_D,
            kind: PropertyKind::Number,
            description: "D Value of PID",
        },
        PropertyInfo {
            key: KEY_DELTA,
            kind: PropertyKind::Number,
            description: "Maximum allowed temperature difference between RIMS and MLT",
        },
        PropertyInfo {
            key: KEY_SAMPLE_TIME,
            kind: PropertyKind::Select(SampleTime::OPTIONS),
            description: "PID sample time in seconds (how often the output is calculated)",
        },
        PropertyInfo {
            key: KEY_RIMS_SENSOR,
            kind: PropertyKind::Sensor,
            description: "Temperature sensor at the RIMS heating element",
        },
    ];

    /// Parse a kettle's property bag, substituting defaults for missing or
    /// invalid entries. The unit is a host-wide setting, not a kettle
    /// property, so it is passed in separately.
    pub fn from_props(props: &Map<String, Value>, temp_unit: TempUnit) -> Self {
        let defaults = Self::default();

        let kp = or_default(number(props, KEY_P), KEY_P, defaults.kp);
        let ki = or_default(number(props, KEY_I), KEY_I, defaults.ki);
        let kd = or_default(number(props, KEY_D), KEY_D, defaults.kd);
        let delta = or_default(
            number(props, KEY_DELTA).and_then(|d| {
                if d < 0.0 {
                    Err(ConfigError::InvalidProperty(KEY_DELTA))
                } else {
                    Ok(d)
                }
            }),
            KEY_DELTA,
            defaults.delta,
        );
        let sample_time = or_default(sample_time(props), KEY_SAMPLE_TIME, defaults.sample_time);

        let rims_sensor = match optional_id(props, KEY_RIMS_SENSOR) {
            Ok(id) => id,
            Err(e) => {
                warn!("RIMS config: {e}, running without RIMS sensor");
                None
            }
        };

        Self {
            kp,
            ki,
            kd,
            delta,
            sample_time,
            rims_sensor,
            temp_unit,
        }
    }
}

fn or_default<T: fmt::Debug + Copy>(
    parsed: Result<T, ConfigError>,
    key: &'static str,
    default: T,
) -> T {
    match parsed {
        Ok(v) => v,
        Err(ConfigError::MissingProperty(_)) => default,
        Err(e) => {
            warn!("RIMS config: {e}, using default {key}={default:?}");
            default
        }
    }
}

/// Read a finite number that may be encoded as a JSON number or a string.
fn number(props: &Map<String, Value>, key: &'static str) -> Result<f32, ConfigError> {
    let parsed = match props.get(key) {
        None | Some(Value::Null) => return Err(ConfigError::MissingProperty(key)),
        Some(Value::Number(n)) => n.as_f64().map(|v| v as f32),
        Some(Value::String(s)) if s.trim().is_empty() => {
            return Err(ConfigError::MissingProperty(key));
        }
        Some(Value::String(s)) => s.trim().parse::<f32>().ok(),
        Some(_) => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(ConfigError::InvalidProperty(key)),
    }
}

fn sample_time(props: &Map<String, Value>) -> Result<SampleTime, ConfigError> {
    let secs = number(props, KEY_SAMPLE_TIME)?;
    if secs.fract() != 0.0 || !(0.0..=f32::from(u8::MAX)).contains(&secs) {
        return Err(ConfigError::InvalidProperty(KEY_SAMPLE_TIME));
    }
    SampleTime::try_from(secs as u8)
}

fn optional_id(
    props: &Map<String, Value>,
    key: &'static str,
) -> Result<Option<DeviceId>, ConfigError> {
    match props.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => device_id(s.trim()).map(Some),
        Some(_) => Err(ConfigError::InvalidProperty(key)),
    }
}

// ---------------------------------------------------------------------------
// Kettle wiring
// ---------------------------------------------------------------------------

/// Which devices a kettle is wired to, as registered with the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KettleSetup {
    pub id: DeviceId,
    /// Heater actuator. A kettle without one cannot be controlled.
    #[serde(default)]
    pub heater: Option<DeviceId>,
    /// Primary (MLT) temperature sensor.
    #[serde(default)]
    pub sensor: Option<DeviceId>,
}
