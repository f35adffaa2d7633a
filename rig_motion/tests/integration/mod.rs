//! Shared fixtures for the integration tests.

mod carrier;
mod protocol;
mod system;

use rig_common::config::LogLevel;
use rig_common::rig::{CarrierConfig, RigConfig, TimingConfig};
use rig_motion::sim::{SimulatedController, SimulationProfile};
use rig_motion::{CarrierCoordinator, RegisterProtocol};
use tracing_subscriber::EnvFilter;

/// Route library events to the test output. `RUST_LOG` overrides the
/// default `warn` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(LogLevel::Warn.as_filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// 1 ms polling with short bounds so failure paths finish quickly.
pub fn fast_timing() -> TimingConfig {
    TimingConfig {
        poll_interval_ms: 1,
        axis_timeout_ms: 50,
        reference_timeout_ms: 500,
        motion_timeout_ms: 500,
        init_timeout_ms: 50,
        enable_stagger_ms: 5,
        disable_stagger_ms: 2,
    }
}

/// Default four-carrier rig with [`fast_timing`].
pub fn fast_rig_config() -> RigConfig {
    RigConfig {
        timing: fast_timing(),
        ..RigConfig::default()
    }
}

/// Carrier 0 (axes 0..4) on its own simulated controller.
pub fn carrier_with(profile: SimulationProfile) -> (CarrierCoordinator, SimulatedController) {
    init_tracing();
    let sim = SimulatedController::with_profile(profile);
    let protocol = RegisterProtocol::new(sim.clone());
    let carrier = CarrierCoordinator::new(
        0,
        CarrierConfig::consecutive(0).unwrap(),
        fast_timing(),
        protocol,
    )
    .unwrap();
    (carrier, sim)
}

pub fn carrier() -> (CarrierCoordinator, SimulatedController) {
    carrier_with(SimulationProfile::default())
}

/// Carrier 0, enabled, with an empty command log.
pub fn enabled_carrier() -> (CarrierCoordinator, SimulatedController) {
    let (mut carrier, sim) = carrier();
    carrier.enable().unwrap();
    sim.clear_commands();
    (carrier, sim)
}
