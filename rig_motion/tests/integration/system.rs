//! Rig-wide behaviour: staggered power, referencing, override, panel I/O.

use super::{fast_rig_config, fast_timing, init_tracing};
use rig_common::config::ConfigError;
use rig_common::rig::{AxisAddress, CarrierAxes};
use rig_motion::protocol::codec::CommandCode;
use rig_motion::protocol::map;
use rig_motion::sim::{SimulatedController, SimulatedIo};
use rig_motion::{AxisExpectation, CarrierState, RigError, SystemMessage, SystemOrchestrator};
use std::time::{Duration, Instant};

fn rig() -> (SystemOrchestrator, SimulatedController, SimulatedIo) {
    init_tracing();
    let sim = SimulatedController::new();
    let io = SimulatedIo::new();
    let rig = SystemOrchestrator::new(fast_rig_config(), sim.clone(), io.clone()).unwrap();
    (rig, sim, io)
}

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
}

// ── Construction ────────────────────────────────────────────────────

#[test]
fn duplicate_axis_is_invalid_configuration() {
    let mut config = fast_rig_config();
    config.carriers[1].axes = CarrierAxes {
        x: AxisAddress::new(4).unwrap(),
        y: AxisAddress::new(5).unwrap(),
        z: AxisAddress::new(6).unwrap(),
        c: AxisAddress::new(0).unwrap(),
    };

    let err = SystemOrchestrator::new(config, SimulatedController::new(), SimulatedIo::new())
        .unwrap_err();

    assert!(matches!(
        err,
        RigError::InvalidConfiguration(ConfigError::ValidationError(_))
    ));
}

#[test]
fn missing_carrier_is_invalid_configuration() {
    let mut config = fast_rig_config();
    config.carriers.pop();

    let err = SystemOrchestrator::new(config, SimulatedController::new(), SimulatedIo::new())
        .unwrap_err();
    assert!(matches!(err, RigError::InvalidConfiguration(_)));
}

#[test]
fn construction_writes_nothing() {
    let (_rig, sim, _io) = rig();
    assert!(sim.commands().is_empty());
}

// ── Initialisation and power ────────────────────────────────────────

#[test]
fn initialize_then_enable_and_reference() {
    let (mut rig, _sim, _io) = rig();

    rig.initialize().unwrap();
    rig.enable().unwrap();
    assert!(rig.is_enabled().unwrap());
    assert!(!rig.is_referenced().unwrap());

    rig.reference().unwrap();
    assert!(rig.is_referenced().unwrap());
    assert!(
        rig.carriers()
            .iter()
            .all(|c| c.state() == CarrierState::Ready)
    );
}

#[test]
fn initialize_times_out_when_controller_never_ready() {
    let (rig, sim, _io) = rig();
    sim.block_init();

    assert_eq!(rig.initialize(), Err(RigError::SystemInitTimeout));
}

#[test]
fn enable_staggers_second_carrier_pair() {
    let mut config = fast_rig_config();
    config.timing.enable_stagger_ms = 40;
    let sim = SimulatedController::new();
    let mut rig = SystemOrchestrator::new(config, sim.clone(), SimulatedIo::new()).unwrap();

    let start = Instant::now();
    rig.enable().unwrap();
    assert!(start.elapsed() >= Duration::from_millis(40));

    let order: Vec<u8> = sim
        .commands()
        .iter()
        .filter(|c| c.code == CommandCode::Enable)
        .map(|c| c.axis)
        .collect();
    assert_eq!(order, (0..16).collect::<Vec<u8>>());
}

#[test]
fn disable_twice_is_idempotent() {
    let (mut rig, _sim, _io) = rig();
    rig.enable().unwrap();

    rig.disable().unwrap();
    rig.disable().unwrap();

    assert!(!rig.is_enabled().unwrap());
    assert!(
        rig.carriers()
            .iter()
            .all(|c| c.state() == CarrierState::Disabled)
    );
}

#[test]
fn enable_stops_at_failing_carrier() {
    let (mut rig, sim, _io) = rig();
    // carrier 2, axis Z
    sim.stuck_enable(10);

    let err = rig.enable().unwrap_err();

    assert_eq!(
        err,
        RigError::AxisTimeout {
            axis: AxisAddress::new(10).unwrap(),
            expected: AxisExpectation::Enabled,
        }
    );
    assert!(rig.carrier(1).unwrap().is_enabled().unwrap());
    assert!((12..16).all(|i| sim.axis_enabled(i) == Some(false)));
}

#[test]
fn reference_runs_carriers_in_order() {
    let (mut rig, sim, _io) = rig();
    rig.enable().unwrap();
    sim.clear_commands();

    rig.reference().unwrap();

    let order: Vec<u8> = sim
        .commands()
        .iter()
        .filter(|c| c.code == CommandCode::Reference)
        .map(|c| c.axis)
        .collect();
    assert_eq!(
        order,
        vec![2, 0, 1, 3, 6, 4, 5, 7, 10, 8, 9, 11, 14, 12, 13, 15]
    );
}

#[test]
fn emergency_stop_reaches_all_sixteen_axes() {
    let (mut rig, sim, _io) = rig();
    rig.enable().unwrap();
    sim.clear_commands();
    sim.fail_next_writes(1);

    assert!(rig.emergency_stop().is_err());

    let stopped = sim
        .commands()
        .iter()
        .filter(|c| c.code == CommandCode::EmergencyStop)
        .count();
    assert_eq!(stopped, 15);

    rig.cancel().unwrap();
}

// ── Speed override ──────────────────────────────────────────────────

#[test]
fn override_changes_at_most_one_step_per_call() {
    let (mut rig, sim, _io) = rig();
    assert!(close(rig.get_override().unwrap(), 1.0));

    let written = rig.set_override(5.0).unwrap();

    assert!(close(written, 1.1));
    assert!(close(rig.get_override().unwrap(), 1.1));
    assert!(close(sim.holding_float(map::SPEED_OVERRIDE), 1.1));
    assert!(close(rig.last_override().value(), 1.1));
}

#[test]
fn override_stays_within_range() {
    let (mut rig, _sim, _io) = rig();

    for _ in 0..20 {
        rig.set_override(10.0).unwrap();
    }
    assert!(close(rig.get_override().unwrap(), 2.0));

    for _ in 0..30 {
        rig.set_override(-10.0).unwrap();
    }
    assert!(close(rig.get_override().unwrap(), 0.0));
}

#[test]
fn override_uses_controller_value_as_current() {
    let (mut rig, _sim, _io) = rig();
    rig.protocol()
        .write_float(map::SPEED_OVERRIDE, 0.5)
        .unwrap();

    assert!(close(rig.set_override(1.0).unwrap(), 0.6));
}

#[test]
fn override_garbage_register_steps_up_from_paused() {
    let (mut rig, sim, _io) = rig();
    rig.protocol()
        .write_float(map::SPEED_OVERRIDE, f32::NAN)
        .unwrap();

    let written = rig.set_override(1.0).unwrap();

    assert!(close(written, 0.1));
    assert!(close(sim.holding_float(map::SPEED_OVERRIDE), 0.1));
}

// ── Discrete I/O ────────────────────────────────────────────────────

#[test]
fn coil_and_input_passthrough() {
    let (mut rig, _sim, io) = rig();

    rig.write_coil(7, true).unwrap();
    assert!(io.coil(7));
    assert!(rig.read_coil(7).unwrap());

    io.set_input(20, true);
    assert!(rig.read_discrete_input(20).unwrap());
    assert!(!rig.read_discrete_input(21).unwrap());
}

#[test]
fn system_message_from_lamps() {
    let (mut rig, _sim, io) = rig();
    let lamps = rig_common::rig::LampConfig::default();

    assert_eq!(rig.system_message().unwrap(), SystemMessage::Invalid);

    io.set_input(lamps.green, true);
    assert_eq!(rig.system_message().unwrap(), SystemMessage::MoveActive);

    io.set_input(lamps.orange, true);
    assert_eq!(rig.system_message().unwrap(), SystemMessage::ReadyToMove);

    io.set_input(lamps.red, true);
    assert_eq!(rig.system_message().unwrap(), SystemMessage::PressReady);

    io.set_input(lamps.buzzer, true);
    assert_eq!(rig.system_message().unwrap(), SystemMessage::ServoError);
}

#[test]
fn io_failure_propagates() {
    let (mut rig, _sim, io) = rig();
    io.set_failing(true);

    assert!(matches!(rig.system_message(), Err(RigError::Protocol(_))));
}

#[test]
fn carrier_timing_comes_from_rig_config() {
    let (rig, _sim, _io) = rig();
    assert_eq!(rig.carrier(3).unwrap().timing(), &fast_timing());
    assert!(rig.carrier(4).is_none());
}
