//! PIDRIMS controller library.
//!
//! A PID controller for a Recirculating Infusion Mash System heater. The
//! core (`app`, `control`, `safety`, `config`) is pure logic behind port
//! traits; `adapters` holds the host-side implementations used by the
//! simulation binary and by tests.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod safety;

pub use error::{Error, Result};
