//! Motion core of the four-carrier positioning rig.
//!
//! Layering, leaf first:
//!
//! - [`transport`] - Collaborator traits for the register and discrete-I/O services
//! - [`protocol`] - Address map, float/word codec, status word, command codes
//! - [`axis`] - Per-axis command/status lifecycle
//! - [`carrier`] - Four-axis choreography (safe moves, referencing order)
//! - [`system`] - Staggered power, rig-wide referencing, speed override, panel lamps
//! - [`sim`] - Simulated controllers for running without hardware
//!
//! All waits are blocking polls bounded by [`TimingConfig`](rig_common::rig::TimingConfig).
//! The crate emits `tracing` events but never installs a subscriber.
//!
//! # Example
//!
//! ```
//! use rig_common::rig::RigConfig;
//! use rig_motion::sim::{SimulatedController, SimulatedIo};
//! use rig_motion::SystemOrchestrator;
//!
//! let mut config = RigConfig::default();
//! config.timing.poll_interval_ms = 1;
//! config.timing.enable_stagger_ms = 1;
//! config.timing.disable_stagger_ms = 1;
//!
//! let mut rig = SystemOrchestrator::new(config, SimulatedController::new(), SimulatedIo::new())?;
//! rig.initialize()?;
//! rig.enable()?;
//! assert!(rig.is_enabled()?);
//! # Ok::<(), rig_motion::RigError>(())
//! ```

pub mod axis;
pub mod carrier;
pub mod error;
pub mod poll;
pub mod protocol;
pub mod sim;
pub mod system;
pub mod transport;

pub use axis::AxisController;
pub use carrier::{CarrierCoordinator, CarrierState};
pub use error::{AxisExpectation, RigError, RigResult};
pub use protocol::RegisterProtocol;
pub use system::{LampState, OverrideState, SystemMessage, SystemOrchestrator};
pub use transport::{DiscreteIo, RegisterTransport, TransportError};
