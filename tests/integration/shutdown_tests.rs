//! Shutdown paths: every way a run can end must leave the heater off,
//! with exactly one turn-off per run.

use futures_lite::future;

use pidrims::app::control_loop::ControlLoop;
use pidrims::app::events::{AppEvent, StopReason};
use pidrims::app::state::LoopPhase;
use pidrims::app::stop::StopSignal;
use pidrims::error::{ActuatorError, Error, KettleError, SensorError};
use serde_json::json;

use crate::mock_hw::{
    ActuatorCall, ManualTime, MockHardware, RecordingSink, config, kettle, run_for,
};

fn p_only() -> ControlLoop {
    ControlLoop::new(config(json!({ "P": 10, "I": 0, "D": 0 })), kettle())
}

#[test]
fn stop_request_turns_heater_off_once() {
    let mut ctrl = p_only();
    let mut hw = MockHardware::new(&[60.0], 65.0);

    let (report, _) = run_for(&mut ctrl, &mut hw, 3);

    assert_eq!(report.reason, StopReason::Requested);
    assert_eq!(hw.turn_offs(), 1);
    assert!(!hw.heater_on());
    assert_eq!(ctrl.phase(), LoopPhase::Stopped);
    assert!(!ctrl.is_running());
}

#[test]
fn stop_requested_before_start_runs_no_iterations() {
    let mut ctrl = p_only();
    let mut hw = MockHardware::new(&[60.0], 65.0);
    let stop = StopSignal::new();
    let time = ManualTime::new();
    let mut sink = RecordingSink::new();

    stop.request_stop();
    let report = future::block_on(ctrl.run(&mut hw, &time, &mut sink, &stop));

    assert_eq!(report.reason, StopReason::Requested);
    assert_eq!(report.iterations, 0);
    assert_eq!(hw.calls, vec![ActuatorCall::TurnOff]);
    assert!(!stop.is_requested(), "request is consumed by the run");
}

#[test]
fn stop_interrupts_a_sleep_in_progress() {
    let mut ctrl = p_only();
    let mut hw = MockHardware::new(&[60.0], 65.0);
    let stop = StopSignal::new();
    // The second sleep never finishes on its own.
    let time = ManualTime::hang_after(1);
    let mut sink = RecordingSink::new();

    let stopper = async {
        while time.sleeps() < 2 {
            future::yield_now().await;
        }
        stop.request_stop();
    };
    let (report, ()) = future::block_on(future::zip(
        ctrl.run(&mut hw, &time, &mut sink, &stop),
        stopper,
    ));

    assert_eq!(report.reason, StopReason::Requested);
    assert_eq!(report.iterations, 2);
    assert_eq!(hw.calls, vec![ActuatorCall::SetPower(50.0), ActuatorCall::TurnOff]);
}

#[test]
fn sensor_failure_faults_and_turns_heater_off() {
    let mut ctrl = p_only();
    let mut hw = MockHardware::new(&[60.0], 65.0);
    hw.fail_mlt_read = Some(3);

    let (report, sink) = run_for(&mut ctrl, &mut hw, 10);

    assert_eq!(
        report.reason,
        StopReason::Faulted(Error::Sensor(SensorError::ReadFailed))
    );
    assert_eq!(report.iterations, 2);
    assert_eq!(hw.calls, vec![ActuatorCall::SetPower(50.0), ActuatorCall::TurnOff]);
    assert!(sink.events.contains(&AppEvent::Faulted(Error::Sensor(SensorError::ReadFailed))));
}

#[test]
fn non_finite_reading_is_a_sensor_fault() {
    let mut ctrl = p_only();
    let mut hw = MockHardware::new(&[60.0, f32::NAN], 65.0);

    let (report, _) = run_for(&mut ctrl, &mut hw, 10);

    assert_eq!(
        report.reason,
        StopReason::Faulted(Error::Sensor(SensorError::OutOfRange))
    );
    assert_eq!(report.iterations, 1);
    assert_eq!(hw.turn_offs(), 1);
}

#[test]
fn unavailable_target_faults_the_run() {
    let mut ctrl = p_only();
    let mut hw = MockHardware::new(&[60.0], 65.0).with_targets(&[65.0, f32::NAN]);

    let (report, _) = run_for(&mut ctrl, &mut hw, 10);

    assert_eq!(
        report.reason,
        StopReason::Faulted(Error::Kettle(KettleError::TargetUnavailable))
    );
    assert_eq!(report.iterations, 1);
    assert_eq!(hw.calls.last(), Some(&ActuatorCall::TurnOff));
}

#[test]
fn actuator_failure_faults_and_still_turns_heater_off() {
    let mut ctrl = p_only();
    let mut hw = MockHardware::new(&[60.0], 65.0);
    hw.fail_set_power = true;

    let (report, _) = run_for(&mut ctrl, &mut hw, 10);

    assert_eq!(
        report.reason,
        StopReason::Faulted(Error::Actuator(ActuatorError::CommandFailed))
    );
    assert_eq!(report.iterations, 0);
    assert_eq!(hw.calls, vec![ActuatorCall::TurnOff]);
}

#[test]
fn failed_turn_off_is_attempted_once_and_run_still_ends() {
    let mut ctrl = p_only();
    let mut hw = MockHardware::new(&[60.0], 65.0);
    hw.fail_turn_off = true;

    let (report, _) = run_for(&mut ctrl, &mut hw, 2);

    assert_eq!(report.reason, StopReason::Requested);
    assert_eq!(hw.turn_offs(), 1);
    assert_eq!(ctrl.phase(), LoopPhase::Stopped);
}

#[test]
fn dropping_the_run_mid_sleep_turns_heater_off_and_stops_the_loop() {
    let mut ctrl = p_only();
    let mut hw = MockHardware::new(&[60.0], 65.0);
    let stop = StopSignal::new();
    let time = ManualTime::hang_after(0);
    let mut sink = RecordingSink::new();

    {
        let mut run = Box::pin(ctrl.run(&mut hw, &time, &mut sink, &stop));
        assert!(future::block_on(future::poll_once(run.as_mut())).is_none());
    }

    assert_eq!(hw.calls, vec![ActuatorCall::SetPower(50.0), ActuatorCall::TurnOff]);
    assert_eq!(ctrl.phase(), LoopPhase::Stopped);
    assert!(!ctrl.is_running());
    assert_eq!(
        sink.events.last(),
        Some(&AppEvent::Stopped {
            reason: StopReason::Cancelled,
            iterations: 1,
        })
    );
    assert!(!sink.events.iter().any(|e| matches!(e, AppEvent::Faulted(_))));
}

#[test]
fn dropped_run_can_be_started_again() {
    let mut ctrl = p_only();
    let mut hw = MockHardware::new(&[60.0], 65.0);
    let stop = StopSignal::new();
    let hanging = ManualTime::hang_after(0);
    let mut sink = RecordingSink::new();

    {
        let mut run = Box::pin(ctrl.run(&mut hw, &hanging, &mut sink, &stop));
        assert!(future::block_on(future::poll_once(run.as_mut())).is_none());
    }
    let (report, _) = run_for(&mut ctrl, &mut hw, 2);

    assert_eq!(report.reason, StopReason::Requested);
    assert_eq!(report.iterations, 2);
    assert_eq!(hw.turn_offs(), 2);
    assert_eq!(ctrl.phase(), LoopPhase::Stopped);
}

#[test]
fn loop_can_be_restarted_after_stop() {
    let mut ctrl = p_only();
    let mut hw = MockHardware::new(&[60.0], 65.0);

    let (first, _) = run_for(&mut ctrl, &mut hw, 2);
    let (second, sink) = run_for(&mut ctrl, &mut hw, 3);

    assert_eq!(first.iterations, 2);
    assert_eq!(second.iterations, 3);
    assert_eq!(hw.turn_offs(), 2);
    // Each run starts from a clean slate and commands 50 % again.
    assert_eq!(hw.set_powers(), vec![50.0, 50.0]);
    assert!(matches!(sink.events.first(), Some(AppEvent::Started { .. })));
}

#[test]
fn two_controllers_share_one_executor() {
    let mut ctrl_a = p_only();
    let mut ctrl_b = p_only();
    let mut hw_a = MockHardware::new(&[60.0], 65.0);
    let mut hw_b = MockHardware::new(&[63.0], 65.0);
    let stop_a = StopSignal::new();
    let stop_b = StopSignal::new();
    let time_a = ManualTime::stop_after(2, &stop_a);
    let time_b = ManualTime::stop_after(4, &stop_b);
    let mut sink_a = RecordingSink::new();
    let mut sink_b = RecordingSink::new();

    let (report_a, report_b) = {
        let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();
        let task_a = executor.spawn(ctrl_a.run(&mut hw_a, &time_a, &mut sink_a, &stop_a));
        let task_b = executor.spawn(ctrl_b.run(&mut hw_b, &time_b, &mut sink_b, &stop_b));
        future::block_on(executor.run(async { (task_a.await, task_b.await) }))
    };

    assert_eq!(report_a.iterations, 2);
    assert_eq!(report_b.iterations, 4);
    assert_eq!(hw_a.calls, vec![ActuatorCall::SetPower(50.0), ActuatorCall::TurnOff]);
    assert_eq!(hw_b.calls, vec![ActuatorCall::SetPower(20.0), ActuatorCall::TurnOff]);
}
