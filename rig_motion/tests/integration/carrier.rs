//! Carrier choreography against the simulated controller.

use super::{carrier, carrier_with, enabled_carrier};
use rig_common::rig::AxisAddress;
use rig_common::vector::{Axis, Vector4D};
use rig_motion::protocol::codec::CommandCode;
use rig_motion::protocol::map;
use rig_motion::sim::SimulationProfile;
use rig_motion::{AxisExpectation, CarrierState, RigError, TransportError};

// Consecutive carrier 0: X = 0, Y = 1, Z = 2, C = 3.
const X: u8 = 0;
const Y: u8 = 1;
const Z: u8 = 2;
const C: u8 = 3;

fn addr(index: u8) -> AxisAddress {
    AxisAddress::new(index).unwrap()
}

// ── Safe move ───────────────────────────────────────────────────────

#[test]
fn safe_move_lifts_z_before_horizontal_travel() {
    let (mut carrier, sim) = enabled_carrier();
    let target = Vector4D::new(100.0, 200.0, 300.0, 400.0);

    carrier.safe_move(target, true, None).unwrap();

    let moves = sim.moves();
    let sequence: Vec<(u8, f32)> = moves.iter().map(|m| (m.axis, m.target)).collect();
    assert_eq!(
        sequence,
        vec![(Z, 1000.0), (X, 100.0), (Y, 200.0), (C, 400.0), (Z, 300.0)]
    );
    assert!(moves.iter().all(|m| m.code == CommandCode::AbsoluteMove));

    // Horizontal moves only start once Z has stopped at the safety height.
    for m in &moves[1..4] {
        assert!(!m.moving.contains(&Z), "Z moving during {:?}", m);
    }
    // X, Y and C are issued back to back, so they travel together.
    assert_eq!(moves[3].moving, vec![X, Y]);
    // Final Z only after X, Y, C are at rest.
    assert!(moves[4].moving.is_empty());

    assert!(carrier.position().unwrap().is_close(&target));
}

#[test]
fn incremental_safe_move_targets_start_height_plus_offset() {
    let (mut carrier, sim) = enabled_carrier();
    sim.set_position(Z, 200.0);
    sim.set_position(X, 40.0);

    carrier
        .safe_move(Vector4D::new(10.0, 20.0, 50.0, 5.0), false, None)
        .unwrap();

    let moves = sim.moves();
    assert_eq!(moves.len(), 5);
    assert_eq!((moves[0].axis, moves[0].code), (Z, CommandCode::AbsoluteMove));
    assert_eq!(moves[0].target, 1000.0);
    for m in &moves[1..4] {
        assert_eq!(m.code, CommandCode::IncrementalMove);
    }
    assert_eq!((moves[4].axis, moves[4].code), (Z, CommandCode::AbsoluteMove));
    assert_eq!(moves[4].target, 250.0);

    let position = carrier.position().unwrap();
    assert!(position.is_close(&Vector4D::new(50.0, 20.0, 250.0, 5.0)));
}

#[test]
fn go_home_and_go_load_use_stored_positions() {
    let (mut carrier, _sim) = enabled_carrier();

    carrier.go_load().unwrap();
    assert!(carrier.position().unwrap().is_close(&carrier.config().load()));

    carrier.set_home(Vector4D::new(10.0, 10.0, 900.0, 0.0)).unwrap();
    carrier.go_home().unwrap();
    assert!(
        carrier
            .position()
            .unwrap()
            .is_close(&Vector4D::new(10.0, 10.0, 900.0, 0.0))
    );
}

#[test]
fn safe_move_outside_travel_writes_nothing() {
    let (mut carrier, sim) = enabled_carrier();

    let err = carrier
        .safe_move(Vector4D::new(0.0, 5000.0, 100.0, 0.0), true, None)
        .unwrap_err();

    assert_eq!(
        err,
        RigError::TargetOutOfTravel {
            carrier: 0,
            axis: Axis::Y,
            target: 5000.0,
        }
    );
    assert!(sim.commands().is_empty());
}

// ── Plain and single-axis moves ─────────────────────────────────────

#[test]
fn move_issues_all_axes_in_order() {
    let (mut carrier, sim) = enabled_carrier();
    let target = Vector4D::new(1.0, 2.0, 3.0, 4.0);

    carrier.move_to(target, true, None).unwrap();

    let axes: Vec<u8> = sim.moves().iter().map(|m| m.axis).collect();
    assert_eq!(axes, vec![X, Y, Z, C]);
    assert!(carrier.position().unwrap().is_close(&target));
    assert_eq!(carrier.state(), CarrierState::Enabled);
}

#[test]
fn every_move_clears_the_command_register() {
    let (mut carrier, sim) = enabled_carrier();

    carrier.move_z(500.0, true, None).unwrap();

    let codes: Vec<CommandCode> = sim.commands().iter().map(|c| c.code).collect();
    assert_eq!(codes, vec![CommandCode::AbsoluteMove, CommandCode::Reset]);
    assert_eq!(sim.holding_register(map::command(addr(Z))), 0);
}

#[test]
fn explicit_velocity_is_clamped() {
    let (mut carrier, sim) = enabled_carrier();
    let limit = carrier.config().limits.max_velocity;

    carrier
        .move_to(Vector4D::splat(10.0), true, Some(Vector4D::splat(1.0e6)))
        .unwrap();

    for (index, axis) in [(X, Axis::X), (Y, Axis::Y), (Z, Axis::Z), (C, Axis::C)] {
        let written = sim.holding_float(map::move_velocity(addr(index)));
        assert_eq!(written, limit.get(axis), "{axis}");
    }
}

#[test]
fn default_speed_is_clamped_and_used() {
    let (mut carrier, sim) = enabled_carrier();
    let limit = carrier.config().limits.max_velocity;

    carrier.set_default_speed(Vector4D::new(50.0, 1.0e6, 50.0, 50.0));
    assert_eq!(carrier.default_speed().y, limit.y);
    assert_eq!(carrier.default_speed().x, 50.0);

    carrier.move_x(25.0, true, None).unwrap();
    assert_eq!(sim.holding_float(map::move_velocity(addr(X))), 50.0);

    carrier.set_default_acceleration(Vector4D::splat(1.0e9));
    assert!(
        carrier
            .default_acceleration()
            .is_close(&carrier.config().limits.max_acceleration)
    );
}

#[test]
fn umove_returns_before_motion_completes() {
    let (mut carrier, sim) = carrier_with(SimulationProfile {
        move_polls: 10,
        ..SimulationProfile::default()
    });
    carrier.enable().unwrap();

    carrier.umove_c(90.0, true, None).unwrap();

    assert_eq!(carrier.state(), CarrierState::Moving);
    assert!(carrier.is_moving().unwrap());
    carrier.wait_for_motion().unwrap();
    assert_eq!(sim.axis_position(C), Some(90.0));
    assert!(!carrier.is_moving().unwrap());
}

#[test]
fn motion_timeout_names_carrier() {
    let (mut carrier, _sim) = carrier_with(SimulationProfile {
        move_polls: u32::MAX,
        ..SimulationProfile::default()
    });
    carrier.enable().unwrap();

    let err = carrier.move_x(100.0, true, None).unwrap_err();

    assert_eq!(err, RigError::MotionTimeout { carrier: 0 });
    assert!(err.is_timeout());
    assert_eq!(carrier.state(), CarrierState::Moving);
}

#[test]
fn emergency_stop_halts_every_axis() {
    let (mut carrier, sim) = carrier_with(SimulationProfile {
        move_polls: u32::MAX,
        ..SimulationProfile::default()
    });
    carrier.enable().unwrap();
    carrier.umove_x(100.0, true, None).unwrap();
    carrier.umove_y(100.0, true, None).unwrap();
    sim.clear_commands();

    carrier.emergency_stop().unwrap();

    let stops: Vec<u8> = sim
        .commands()
        .iter()
        .filter(|c| c.code == CommandCode::EmergencyStop)
        .map(|c| c.axis)
        .collect();
    assert_eq!(stops, vec![X, Y, Z, C]);
    assert!(!carrier.is_moving().unwrap());
}

#[test]
fn cancel_reaches_every_axis_despite_a_failed_write() {
    let (carrier, sim) = enabled_carrier();
    sim.fail_next_writes(1);

    let err = carrier.cancel().unwrap_err();

    assert_eq!(err, RigError::Protocol(TransportError::Timeout));
    let cancelled: Vec<u8> = sim.commands().iter().map(|c| c.axis).collect();
    assert_eq!(cancelled, vec![Y, Z, C]);
}

// ── Enable / disable / reference ────────────────────────────────────

#[test]
fn enable_reports_stuck_axis_and_leaves_others_enabled() {
    let (mut carrier, sim) = carrier();
    sim.stuck_enable(Y);

    let err = carrier.enable().unwrap_err();

    assert_eq!(
        err,
        RigError::AxisTimeout {
            axis: addr(Y),
            expected: AxisExpectation::Enabled,
        }
    );
    for index in [X, Z, C] {
        assert_eq!(sim.axis_enabled(index), Some(true));
    }
    assert_eq!(sim.axis_enabled(Y), Some(false));
    assert_eq!(carrier.state(), CarrierState::Disabled);
}

#[test]
fn enable_single_axis() {
    let (mut carrier, sim) = carrier();

    carrier.enable_axis(Axis::Z).unwrap();

    assert_eq!(sim.axis_enabled(Z), Some(true));
    assert_eq!(sim.axis_enabled(X), Some(false));
    assert!(!carrier.is_enabled().unwrap());

    carrier.disable_axis(Axis::Z).unwrap();
    assert_eq!(sim.axis_enabled(Z), Some(false));
}

#[test]
fn disable_is_idempotent() {
    let (mut carrier, sim) = enabled_carrier();

    carrier.disable().unwrap();
    carrier.disable().unwrap();

    assert!((0..4).all(|i| sim.axis_enabled(i) == Some(false)));
    assert_eq!(carrier.state(), CarrierState::Disabled);
    assert!(!carrier.is_enabled().unwrap());
}

#[test]
fn reference_homes_z_before_horizontal_axes() {
    let (mut carrier, sim) = enabled_carrier();
    sim.set_position(Z, 700.0);

    carrier.reference().unwrap();

    let references: Vec<_> = sim
        .commands()
        .into_iter()
        .filter(|c| c.code == CommandCode::Reference)
        .collect();
    let order: Vec<u8> = references.iter().map(|c| c.axis).collect();
    assert_eq!(order, vec![Z, X, Y, C]);
    for r in &references[1..] {
        assert!(!r.moving.contains(&Z));
    }

    assert!(carrier.is_referenced().unwrap());
    assert_eq!(carrier.state(), CarrierState::Ready);
    assert!(carrier.position().unwrap().is_close(&Vector4D::ZERO));
}

#[test]
fn rereference_waits_for_z_despite_lagging_status() {
    let (mut carrier, sim) = carrier_with(SimulationProfile {
        reference_latency: 1,
        ..SimulationProfile::default()
    });
    carrier.enable().unwrap();
    for index in [X, Y, Z, C] {
        sim.set_referenced(index, true);
    }
    sim.set_position(Z, 700.0);
    sim.clear_commands();

    carrier.reference().unwrap();

    let references: Vec<_> = sim
        .commands()
        .into_iter()
        .filter(|c| c.code == CommandCode::Reference)
        .collect();
    let order: Vec<u8> = references.iter().map(|c| c.axis).collect();
    assert_eq!(order, vec![Z, X, Y, C]);
    for r in &references[1..] {
        assert!(!r.moving.contains(&Z), "Z still homing during {:?}", r);
    }
    assert!(!carrier.is_moving().unwrap());
    assert!(carrier.position().unwrap().is_close(&Vector4D::ZERO));
    assert_eq!(carrier.state(), CarrierState::Ready);
}

#[test]
fn reference_state_reflects_drive_that_tripped_while_homing() {
    let (mut carrier, sim) = enabled_carrier();
    sim.trip_after_homing(Y);

    carrier.reference().unwrap();

    assert_eq!(sim.axis_enabled(Y), Some(false));
    assert_eq!(carrier.state(), CarrierState::Disabled);
}

#[test]
fn negative_explicit_velocity_is_written_as_zero() {
    let (mut carrier, sim) = enabled_carrier();

    carrier.move_x(25.0, true, Some(-30.0)).unwrap();
    assert_eq!(sim.holding_float(map::move_velocity(addr(X))), 0.0);

    carrier
        .move_to(Vector4D::splat(10.0), true, Some(Vector4D::splat(-1.0)))
        .unwrap();
    for index in [X, Y, Z, C] {
        assert_eq!(sim.holding_float(map::move_velocity(addr(index))), 0.0);
    }
}

#[test]
fn reference_on_disabled_carrier_times_out_on_z() {
    let (mut carrier, _sim) = carrier();

    let err = carrier.reference().unwrap_err();

    assert_eq!(
        err,
        RigError::AxisTimeout {
            axis: addr(Z),
            expected: AxisExpectation::Referenced,
        }
    );
    assert_eq!(carrier.state(), CarrierState::Disabled);
}

#[test]
fn state_follows_lifecycle() {
    let (mut carrier, _sim) = carrier();
    assert_eq!(carrier.state(), CarrierState::Disabled);

    carrier.enable().unwrap();
    assert_eq!(carrier.state(), CarrierState::Enabled);

    carrier.reference().unwrap();
    assert_eq!(carrier.state(), CarrierState::Ready);

    carrier.move_to(Vector4D::splat(10.0), true, None).unwrap();
    assert_eq!(carrier.state(), CarrierState::Ready);

    carrier.disable().unwrap();
    assert_eq!(carrier.state(), CarrierState::Disabled);
}

// ── Readbacks and failures ──────────────────────────────────────────

#[test]
fn transport_failure_propagates() {
    let (carrier, sim) = enabled_carrier();
    sim.fail_next_reads(1);

    assert_eq!(
        carrier.is_enabled(),
        Err(RigError::Protocol(TransportError::Timeout))
    );
    assert!(carrier.is_enabled().unwrap());
}

#[test]
fn velocity_readback_while_moving() {
    let (mut carrier, _sim) = carrier_with(SimulationProfile {
        move_polls: u32::MAX,
        ..SimulationProfile::default()
    });
    carrier.enable().unwrap();

    carrier.umove_y(100.0, true, Some(42.0)).unwrap();

    let velocity = carrier.velocity().unwrap();
    assert_eq!(velocity.y, 42.0);
    assert_eq!(velocity.x, 0.0);
}

#[test]
fn setters_reject_positions_outside_travel() {
    let (mut carrier, _sim) = carrier();

    assert!(matches!(
        carrier.set_safety_height(1.0e6),
        Err(RigError::InvalidConfiguration(_))
    ));
    assert!(carrier.set_load(Vector4D::new(0.0, 0.0, 0.0, 1.0e4)).is_err());
    assert!(carrier.set_safety_height(800.0).is_ok());
    assert_eq!(carrier.config().safety_height(), 800.0);
}
