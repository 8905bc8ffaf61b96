//! RIMS control loop, the orchestrating core.
//!
//! [`ControlLoop`] owns the loop state and configuration. One call to
//! [`ControlLoop::run`] is one run: it resolves configuration, arms the
//! heater, iterates until stopped or faulted, and always turns the heater
//! off before returning.
//!
//! ```text
//!  SensorPort ──▶ ┌─────────────────────────────┐ ──▶ EventSink
//!  KettlePort ──▶ │         ControlLoop         │
//! ActuatorPort ◀──│  PID · Interlock · Hysteresis│◀── StopSignal
//!                 └─────────────────────────────┘
//!                          ▲ sleep / now
//!                       TimePort
//! ```
//!
//! One iteration:
//!
//! 1. read the heater's reported power;
//! 2. read the MLT sensor, and the RIMS sensor when configured;
//! 3. read the kettle target (never cached);
//! 4. PID candidate from MLT vs. target;
//! 5. RIMS interlock, which may force the output to zero;
//! 6. command the heater if the output differs from the last commanded
//!    value **or** from the reported power;
//! 7. sleep one sample period, or until a stop is requested.
//!
//! Any error in 1–7 ends the run. Nothing propagates past `run`.

use core::time::Duration;

use futures_lite::future;
use log::{debug, info, warn};

use crate::config::{DEFAULT_DELTA, DeviceId, KettleSetup, RimsConfig};
use crate::control::pid::{PidBuilder, PidController};
use crate::error::{ConfigError, Error, KettleError, Result, SensorError};
use crate::safety::SafetyInterlock;

use super::events::{AppEvent, StopReason};
use super::heater::HeaterGuard;
use super::ports::{EventSink, RimsHardware, TimePort};
use super::state::{LoopPhase, LoopState};
use super::stop::StopSignal;

/// Outcome of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub reason: StopReason,
    /// Control iterations completed before the loop stopped.
    pub iterations: u64,
}

/// Everything resolved once at `Starting` and used by every iteration.
struct RunPlan<'t, T: TimePort> {
    pid: PidController<&'t T>,
    interlock: SafetyInterlock,
    kettle: DeviceId,
    heater: DeviceId,
    kettle_sensor: DeviceId,
    rims_sensor: Option<DeviceId>,
    period: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wake {
    Tick,
    Stop,
}

/// Loop state and event sink, borrowed for one run.
///
/// If the scope is dropped before [`RunScope::finish`], as happens when the
/// run future is dropped mid-sleep, the loop still ends `Stopped` and a
/// `Stopped` event with [`StopReason::Cancelled`] is emitted.
struct RunScope<'a, E: EventSink> {
    state: &'a mut LoopState,
    sink: &'a mut E,
}

impl<'a, E: EventSink> RunScope<'a, E> {
    fn begin(state: &'a mut LoopState, sink: &'a mut E) -> Self {
        state.begin();
        Self { state, sink }
    }

    fn emit(&mut self, event: &AppEvent) {
        self.sink.emit(event);
    }

    fn enter_stopping(&mut self, reason: StopReason) {
        self.state.transition(LoopPhase::Stopping);
        if let StopReason::Faulted(e) = reason {
            self.sink.emit(&AppEvent::Faulted(e));
        }
    }

    fn finish(mut self, reason: StopReason) -> RunReport {
        self.close(reason)
    }

    fn close(&mut self, reason: StopReason) -> RunReport {
        self.state.transition(LoopPhase::Stopped);
        let iterations = self.state.iterations();
        self.sink.emit(&AppEvent::Stopped { reason, iterations });
        info!("RIMS controller off after {} iterations", iterations);
        RunReport { reason, iterations }
    }
}

impl<E: EventSink> Drop for RunScope<'_, E> {
    fn drop(&mut self) {
        if self.state.phase() == LoopPhase::Stopped {
            return;
        }
        info!("RIMS run cancelled");
        self.enter_stopping(StopReason::Cancelled);
        self.close(StopReason::Cancelled);
    }
}

/// RIMS heater controller for one kettle.
pub struct ControlLoop {
    config: RimsConfig,
    kettle: KettleSetup,
    state: LoopState,
}

impl ControlLoop {
    pub fn new(config: RimsConfig, kettle: KettleSetup) -> Self {
        Self {
            config,
            kettle,
            state: LoopState::new(),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Run the loop until `stop` is requested or an error occurs.
    ///
    /// Exactly one heater turn-off is issued before this returns whenever a
    /// heater is configured. If the returned future is dropped mid-sleep,
    /// the drop turns the heater off and leaves the loop `Stopped`.
    pub async fn run<H, T, E>(
        &mut self,
        hw: &mut H,
        time: &T,
        sink: &mut E,
        stop: &StopSignal,
    ) -> RunReport
    where
        H: RimsHardware,
        T: TimePort,
        E: EventSink,
    {
        let Self {
            config,
            kettle,
            state,
        } = self;
        // Declared before the heater guard so a dropped run turns the
        // heater off before reporting `Stopped`.
        let mut scope = RunScope::begin(state, sink);
        info!("RIMS controller on (kettle '{}')", kettle.id);

        let Some(heater_id) = kettle.heater.clone() else {
            let reason = StopReason::Faulted(ConfigError::MissingHeater.into());
            scope.enter_stopping(reason);
            return scope.finish(reason);
        };

        let mut heater = HeaterGuard::arm(hw, heater_id);
        let reason = match resolve(config, kettle, heater.heater().clone(), time) {
            Ok(mut plan) => {
                scope.emit(&AppEvent::Started {
                    kettle: plan.kettle.clone(),
                    heater: plan.heater.clone(),
                });
                scope.state.transition(LoopPhase::Running);
                drive(&mut scope, &mut heater, &mut plan, time, stop).await
            }
            Err(e) => StopReason::Faulted(e),
        };

        scope.enter_stopping(reason);
        // A failed turn-off is logged by the guard; the run is over either way.
        let _ = heater.release();
        drop(heater);
        scope.finish(reason)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn phase(&self) -> LoopPhase {
        self.state.phase()
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn kettle(&self) -> &KettleSetup {
        &self.kettle
    }
}

// ── Run phases ────────────────────────────────────────────────

/// Resolve configuration into a run plan. Unusable tunables fall back to
/// defaults; a missing kettle sensor is fatal.
fn resolve<'t, T: TimePort>(
    config: &RimsConfig,
    kettle: &KettleSetup,
    heater: DeviceId,
    time: &'t T,
) -> Result<RunPlan<'t, T>> {
    let kettle_sensor = kettle.sensor.clone().ok_or(ConfigError::MissingSensor)?;

    let sample_time = config.sample_time;
    let pid = match pid_builder(config).build(time) {
        Ok(pid) => pid,
        Err(e) => {
            warn!("RIMS config: {e}, using default gains");
            pid_builder(&RimsConfig {
                sample_time,
                ..RimsConfig::default()
            })
            .build(time)?
        }
    };

    let delta = if config.delta.is_finite() && config.delta >= 0.0 {
        config.delta
    } else {
        warn!("RIMS config: delta {} unusable, using {}", config.delta, DEFAULT_DELTA);
        DEFAULT_DELTA
    };

    info!(
        "RIMS plan: P={} I={} D={} delta={} sample={}s rims_sensor={:?}",
        config.kp,
        config.ki,
        config.kd,
        delta,
        sample_time.secs(),
        config.rims_sensor.as_deref(),
    );

    Ok(RunPlan {
        pid,
        interlock: SafetyInterlock::new(delta, config.temp_unit),
        kettle: kettle.id.clone(),
        heater,
        kettle_sensor,
        rims_sensor: config.rims_sensor.clone(),
        period: sample_time.duration(),
    })
}

/// The `Running` phase. Returns why it ended.
async fn drive<H, T, E>(
    scope: &mut RunScope<'_, E>,
    heater: &mut HeaterGuard<'_, H>,
    plan: &mut RunPlan<'_, T>,
    time: &T,
    stop: &StopSignal,
) -> StopReason
where
    H: RimsHardware,
    T: TimePort,
    E: EventSink,
{
    let period = plan.period;
    loop {
        if stop.is_requested() {
            stop.reset();
            return StopReason::Requested;
        }

        if let Err(e) = iterate(scope, heater.hw(), plan) {
            return StopReason::Faulted(e);
        }
        scope.state.complete_iteration();

        let wake = future::or(
            async {
                stop.wait().await;
                Wake::Stop
            },
            async {
                time.sleep(period).await;
                Wake::Tick
            },
        )
        .await;
        if wake == Wake::Stop {
            return StopReason::Requested;
        }
    }
}

/// One control iteration. Never suspends.
#[allow(clippy::float_cmp)]
fn iterate<H, T, E>(
    scope: &mut RunScope<'_, E>,
    hw: &mut H,
    plan: &mut RunPlan<'_, T>,
) -> Result<()>
where
    H: RimsHardware,
    T: TimePort,
    E: EventSink,
{
    let observed = hw.power(&plan.heater)?;

    let mlt_temp = finite_reading(hw.read_temperature(&plan.kettle_sensor)?)?;
    let rims_temp = match &plan.rims_sensor {
        Some(id) => Some(finite_reading(hw.read_temperature(id)?)?),
        None => None,
    };
    let target = hw.target_temperature(&plan.kettle)?;
    if !target.is_finite() {
        return Err(KettleError::TargetUnavailable.into());
    }

    let candidate = plan.pid.calc(mlt_temp, target);
    let decision = plan.interlock.evaluate(candidate, rims_temp, target);
    if let Some(trip) = decision.trip {
        scope.emit(&AppEvent::InterlockTripped(trip));
    }
    let output = decision.output;

    debug!(
        "RIMS iter: mlt={:.2} rims={:?} target={:.2} candidate={:.1} output={:.1} observed={:.1}",
        mlt_temp, rims_temp, target, candidate, output, observed
    );

    // Exact comparison: any difference is re-commanded, including an
    // external change to the heater's power.
    if output != scope.state.last_commanded_output() || output != observed {
        hw.set_power(&plan.heater, output)?;
        scope.state.record_command(output);
        scope.emit(&AppEvent::PowerCommanded { power: output });
    }
    Ok(())
}

fn pid_builder(config: &RimsConfig) -> PidBuilder {
    PidBuilder::new()
        .gains(config.kp, config.ki, config.kd)
        .sample_time_secs(f32::from(config.sample_time.secs()))
}

fn finite_reading(temp: f32) -> core::result::Result<f32, Error> {
    if temp.is_finite() {
        Ok(temp)
    } else {
        Err(SensorError::OutOfRange.into())
    }
}
