//! Register protocol over the simulated controller.

use rig_common::rig::AxisAddress;
use rig_motion::protocol::codec::{encode_float, CommandCode};
use rig_motion::protocol::map;
use rig_motion::sim::SimulatedController;
use rig_motion::{RegisterProtocol, RigError, TransportError};
use std::thread;
use std::time::Duration;

fn addr(index: u8) -> AxisAddress {
    AxisAddress::new(index).unwrap()
}

#[test]
fn float_written_as_low_then_high_word() {
    let sim = SimulatedController::new();
    let protocol = RegisterProtocol::new(sim.clone());

    protocol.write_float(map::target(addr(7)), -2.5).unwrap();

    let base = map::target(addr(7));
    let [low, high] = encode_float(-2.5);
    assert_eq!(sim.holding_register(base), low);
    assert_eq!(sim.holding_register(base + 1), high);
    assert_eq!(protocol.read_float(base).unwrap(), -2.5);
}

#[test]
fn position_and_status_readback() {
    let sim = SimulatedController::new();
    let protocol = RegisterProtocol::new(sim.clone());
    sim.set_position(9, 123.25);

    assert_eq!(protocol.read_float(map::position(addr(9))).unwrap(), 123.25);

    let status = protocol.read_status(addr(9)).unwrap();
    assert!(!status.enabled && !status.referenced && !status.moving);

    protocol.write_command(addr(9), CommandCode::Enable).unwrap();
    assert!(protocol.read_status(addr(9)).unwrap().enabled);
}

#[test]
fn init_handshake() {
    let sim = SimulatedController::new();
    let protocol = RegisterProtocol::new(sim.clone());

    protocol
        .initialize(Duration::from_millis(1), Duration::from_millis(100))
        .unwrap();

    assert_eq!(sim.holding_register(map::SYSTEM_INIT), map::SYSTEM_INIT_REQUEST);
}

#[test]
fn init_handshake_times_out() {
    let sim = SimulatedController::new();
    sim.block_init();
    let protocol = RegisterProtocol::new(sim);

    let err = protocol
        .initialize(Duration::from_millis(1), Duration::from_millis(20))
        .unwrap_err();
    assert_eq!(err, RigError::SystemInitTimeout);
}

#[test]
fn disconnect_fails_exchanges_until_reconnected() {
    let protocol = RegisterProtocol::new(SimulatedController::new());

    protocol.disconnect().unwrap();
    assert_eq!(
        protocol.read_word(map::SYSTEM_READY),
        Err(RigError::Protocol(TransportError::Disconnected))
    );

    protocol.connect().unwrap();
    assert!(protocol.read_word(map::SYSTEM_READY).is_ok());
}

#[test]
fn clones_share_one_transport_across_threads() {
    let sim = SimulatedController::new();
    let protocol = RegisterProtocol::new(sim.clone());

    let handles: Vec<_> = (0..4u8)
        .map(|i| {
            let protocol = protocol.clone();
            thread::spawn(move || {
                for n in 0..50 {
                    let value = f32::from(i) * 1000.0 + n as f32;
                    protocol.write_float(map::target(addr(i)), value).unwrap();
                    assert_eq!(protocol.read_float(map::target(addr(i))).unwrap(), value);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(sim.holding_float(map::target(addr(3))), 3049.0);
}
