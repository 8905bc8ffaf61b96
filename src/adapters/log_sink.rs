//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing control-loop events through the
//! `log` facade. Interlock trips go out at warning level and faults at
//! error level; a requested stop is ordinary information.

use log::{debug, error, info, warn};

use crate::app::events::{AppEvent, StopReason};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { kettle, heater } => {
                info!("START | kettle={} heater={}", kettle, heater);
            }
            AppEvent::InterlockTripped(trip) => {
                warn!("INTERLOCK | {}", trip);
            }
            AppEvent::PowerCommanded { power } => {
                debug!("POWER | {:.1}%", power);
            }
            AppEvent::Faulted(e) => {
                error!("FAULT | {}", e);
            }
            AppEvent::Stopped { reason, iterations } => match reason {
                StopReason::Requested => {
                    info!("STOP | requested after {} iterations", iterations);
                }
                StopReason::Cancelled => {
                    info!("STOP | cancelled after {} iterations", iterations);
                }
                StopReason::Faulted(e) => {
                    info!("STOP | faulted ({}) after {} iterations", e, iterations);
                }
            },
        }
    }
}
