//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements   | Connects to                |
//! |------------|--------------|----------------------------|
//! | `log_sink` | EventSink    | `log` facade               |
//! | `sim`      | SensorPort   | Simulated RIMS thermal model |
//! |            | ActuatorPort |                            |
//! |            | KettlePort   |                            |
//! | `time`     | TimePort     | `Instant` + async timer    |

pub mod log_sink;
pub mod sim;
pub mod time;
