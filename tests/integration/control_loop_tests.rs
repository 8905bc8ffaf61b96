//! Control-loop behaviour: PID output, hysteresis, interlock, and
//! configuration handling, driven iteration by iteration on a virtual clock.

use pidrims::app::control_loop::ControlLoop;
use pidrims::app::events::{AppEvent, StopReason};
use pidrims::app::state::LoopPhase;
use pidrims::config::{KettleSetup, SampleTime, TempUnit};
use pidrims::error::{ConfigError, Error};
use serde_json::json;

use crate::mock_hw::{ActuatorCall, MockHardware, config, config_in, id, kettle, run_for};

/// Proportional-only controller: output is `10 * (target - mlt)`.
fn p_only() -> ControlLoop {
    ControlLoop::new(config(json!({ "P": 10, "I": 0, "D": 0 })), kettle())
}

// ── PID output and hysteresis ─────────────────────────────────

#[test]
fn approaching_target_steps_power_down() {
    let mut ctrl = p_only();
    let mut hw = MockHardware::new(&[60.0, 62.0, 64.0, 65.0, 65.0], 65.0);

    let (report, _) = run_for(&mut ctrl, &mut hw, 5);

    assert_eq!(report.reason, StopReason::Requested);
    assert_eq!(report.iterations, 5);
    // The last iteration repeats 0 % and is not re-commanded.
    assert_eq!(
        hw.calls,
        vec![
            ActuatorCall::SetPower(50.0),
            ActuatorCall::SetPower(30.0),
            ActuatorCall::SetPower(10.0),
            ActuatorCall::SetPower(0.0),
            ActuatorCall::TurnOff,
        ]
    );
}

#[test]
fn output_clamps_to_full_and_zero_power() {
    let mut ctrl = p_only();
    let mut hw = MockHardware::new(&[50.0, 55.0, 60.0, 65.0, 66.0], 65.0);

    let (report, _) = run_for(&mut ctrl, &mut hw, 5);

    assert_eq!(report.iterations, 5);
    // 150 % and 100 % both clamp to 100; -10 % clamps to 0.
    assert_eq!(hw.set_powers(), vec![100.0, 50.0, 0.0]);
    assert_eq!(hw.calls.last(), Some(&ActuatorCall::TurnOff));
}

#[test]
fn steady_output_is_commanded_once() {
    let mut ctrl = p_only();
    let mut hw = MockHardware::new(&[60.0], 65.0);

    let (report, _) = run_for(&mut ctrl, &mut hw, 6);

    assert_eq!(report.iterations, 6);
    assert_eq!(hw.set_powers(), vec![50.0]);
}

#[test]
fn zero_output_at_idle_heater_sends_nothing() {
    let mut ctrl = p_only();
    let mut hw = MockHardware::new(&[66.0], 65.0);

    run_for(&mut ctrl, &mut hw, 3);

    assert_eq!(hw.calls, vec![ActuatorCall::TurnOff]);
}

#[test]
fn external_power_change_is_overridden() {
    let mut ctrl = p_only();
    let mut hw = MockHardware::new(&[60.0], 65.0);
    hw.drift = Some((3, 80.0));

    run_for(&mut ctrl, &mut hw, 4);

    // Iteration 3 sees 80 % reported and restores 50 %.
    assert_eq!(hw.set_powers(), vec![50.0, 50.0]);
}

#[test]
fn target_is_reread_every_iteration() {
    let mut ctrl = p_only();
    let mut hw = MockHardware::new(&[60.0], 65.0).with_targets(&[65.0, 65.0, 70.0]);

    run_for(&mut ctrl, &mut hw, 3);

    assert_eq!(hw.set_powers(), vec![50.0, 100.0]);
}

#[test]
fn power_commands_are_reported_as_events() {
    let mut ctrl = p_only();
    let mut hw = MockHardware::new(&[60.0, 62.0], 65.0);

    let (_, sink) = run_for(&mut ctrl, &mut hw, 2);

    let powers: Vec<f32> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::PowerCommanded { power } => Some(*power),
            _ => None,
        })
        .collect();
    assert_eq!(powers, vec![50.0, 30.0]);
}

// ── RIMS interlock ────────────────────────────────────────────

#[test]
fn interlock_cuts_power_while_tube_runs_hot() {
    let mut ctrl = ControlLoop::new(
        config(json!({ "P": 10, "I": 0, "D": 0, "Delta": 2, "RIMS Sensor": "rims-probe" })),
        kettle(),
    );
    let mut hw = MockHardware::new(&[60.0], 65.0).with_rims(&[66.0, 68.0, 66.0]);

    let (report, sink) = run_for(&mut ctrl, &mut hw, 3);

    assert_eq!(report.reason, StopReason::Requested);
    assert_eq!(hw.set_powers(), vec![50.0, 0.0, 50.0]);
    assert_eq!(sink.interlock_trips(), 1);

    let trip = sink
        .events
        .iter()
        .find_map(|e| match e {
            AppEvent::InterlockTripped(t) => Some(*t),
            _ => None,
        })
        .unwrap();
    assert_eq!(trip.rims_temp, 68.0);
    assert_eq!(trip.limit, 67.0);
    assert_eq!(trip.unit, TempUnit::Celsius);
}

#[test]
fn interlock_warning_carries_configured_unit() {
    let mut ctrl = ControlLoop::new(
        config_in(
            json!({ "P": 10, "I": 0, "D": 0, "RIMS Sensor": "rims-probe" }),
            TempUnit::Fahrenheit,
        ),
        kettle(),
    );
    let mut hw = MockHardware::new(&[150.0], 152.0).with_rims(&[160.0]);

    let (_, sink) = run_for(&mut ctrl, &mut hw, 2);

    // Tripped every iteration, so the heater is never energised.
    assert_eq!(sink.interlock_trips(), 2);
    assert!(hw.set_powers().is_empty());
    assert!(sink.events.iter().any(|e| matches!(
        e,
        AppEvent::InterlockTripped(t) if t.unit == TempUnit::Fahrenheit
    )));
}

#[test]
fn without_rims_sensor_interlock_never_trips() {
    let mut ctrl = p_only();
    let mut hw = MockHardware::new(&[60.0], 65.0).with_rims(&[99.0]);

    let (_, sink) = run_for(&mut ctrl, &mut hw, 3);

    assert_eq!(sink.interlock_trips(), 0);
    assert_eq!(hw.set_powers(), vec![50.0]);
}

// ── Configuration ─────────────────────────────────────────────

#[test]
fn missing_heater_faults_without_touching_hardware() {
    let setup = KettleSetup {
        heater: None,
        ..kettle()
    };
    let mut ctrl = ControlLoop::new(config(json!({})), setup);
    let mut hw = MockHardware::new(&[60.0], 65.0);

    let (report, sink) = run_for(&mut ctrl, &mut hw, 3);

    assert_eq!(
        report.reason,
        StopReason::Faulted(Error::Config(ConfigError::MissingHeater))
    );
    assert_eq!(report.iterations, 0);
    assert!(hw.calls.is_empty());
    assert!(matches!(sink.events.first(), Some(AppEvent::Faulted(_))));
    assert!(matches!(sink.events.last(), Some(AppEvent::Stopped { .. })));
    assert_eq!(ctrl.phase(), LoopPhase::Stopped);
}

#[test]
fn missing_kettle_sensor_faults_and_turns_heater_off() {
    let setup = KettleSetup {
        sensor: None,
        ..kettle()
    };
    let mut ctrl = ControlLoop::new(config(json!({})), setup);
    let mut hw = MockHardware::new(&[60.0], 65.0);

    let (report, _) = run_for(&mut ctrl, &mut hw, 3);

    assert_eq!(
        report.reason,
        StopReason::Faulted(Error::Config(ConfigError::MissingSensor))
    );
    assert_eq!(hw.calls, vec![ActuatorCall::TurnOff]);
}

#[test]
fn invalid_gains_fall_back_to_defaults() {
    let cfg = config(json!({ "P": "abc", "I": null, "D": [1], "SampleTime": 2 }));
    assert_eq!(cfg.sample_time, SampleTime::Two);
    let mut ctrl = ControlLoop::new(cfg, kettle());
    let mut hw = MockHardware::new(&[60.0], 65.0);

    let (report, _) = run_for(&mut ctrl, &mut hw, 2);

    assert_eq!(report.reason, StopReason::Requested);
    // Default P alone drives 5 degrees of error far past full power.
    assert_eq!(hw.set_powers(), vec![100.0]);
}

#[test]
fn unknown_rims_sensor_faults_the_run() {
    let mut ctrl = ControlLoop::new(
        config(json!({ "P": 10, "I": 0, "D": 0, "RIMS Sensor": "not-wired" })),
        kettle(),
    );
    let mut hw = MockHardware::new(&[60.0], 65.0);

    let (report, _) = run_for(&mut ctrl, &mut hw, 3);

    assert!(matches!(report.reason, StopReason::Faulted(Error::Sensor(_))));
    assert_eq!(report.iterations, 0);
    assert_eq!(hw.turn_offs(), 1);
}

#[test]
fn events_bracket_a_normal_run() {
    let mut ctrl = p_only();
    let mut hw = MockHardware::new(&[60.0], 65.0);

    let (_, sink) = run_for(&mut ctrl, &mut hw, 2);

    assert_eq!(
        sink.events.first(),
        Some(&AppEvent::Started {
            kettle: id("mlt"),
            heater: id("rims-heater"),
        })
    );
    assert_eq!(
        sink.events.last(),
        Some(&AppEvent::Stopped {
            reason: StopReason::Requested,
            iterations: 2,
        })
    );
    assert!(!sink.events.iter().any(|e| matches!(e, AppEvent::Faulted(_))));
}
