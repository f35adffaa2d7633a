//! Rig-wide orchestration of the four carriers.
//!
//! The [`SystemOrchestrator`] owns the carriers, the shared register
//! protocol and the discrete-I/O collaborator. Across carriers it imposes
//! only a timing stagger on enable/disable; carriers are otherwise
//! independent.

use crate::carrier::CarrierCoordinator;
use crate::error::RigResult;
use crate::protocol::{map, RegisterProtocol};
use crate::transport::{DiscreteIo, RegisterTransport, TransportError};
use rig_common::consts::{CARRIER_COUNT, OVERRIDE_MAX, OVERRIDE_STEP};
use rig_common::rig::{LampConfig, RigConfig, TimingConfig};
use static_assertions::const_assert;
use std::fmt;
use std::thread;
use tracing::{debug, info, warn};

/// Carriers switched together before the stagger pause.
const STAGGER_GROUP: usize = 2;

/// Global speed-override scalar.
///
/// Range `[0, OVERRIDE_MAX]`, `0` pauses all motion. Each change is
/// limited to `OVERRIDE_STEP` from the current value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverrideState {
    value: f32,
}

impl Default for OverrideState {
    fn default() -> Self {
        Self { value: 1.0 }
    }
}

impl OverrideState {
    pub fn value(self) -> f32 {
        self.value
    }

    /// Value reached from `current` when `requested` is asked for.
    ///
    /// Limited to `current ± OVERRIDE_STEP`, then to `[0, OVERRIDE_MAX]`.
    /// A NaN request leaves the value unchanged. A non-finite `current`
    /// counts as paused (`0`).
    pub fn step_toward(current: f32, requested: f32) -> f32 {
        let current = if current.is_finite() { current } else { 0.0 };
        if requested.is_nan() {
            return current.clamp(0.0, OVERRIDE_MAX);
        }
        requested
            .clamp(current - OVERRIDE_STEP, current + OVERRIDE_STEP)
            .clamp(0.0, OVERRIDE_MAX)
    }
}

/// Operator-panel message derived from the lamp and buzzer inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemMessage {
    /// Red lamp, buzzer silent: press the ready button.
    PressReady,
    /// Red lamp with buzzer: servo fault.
    ServoError,
    /// Orange lamp: ready to move.
    ReadyToMove,
    /// Green lamp: motion active.
    MoveActive,
    /// No lamp lit.
    Invalid,
}

impl fmt::Display for SystemMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::PressReady => "press ready",
            Self::ServoError => "servo error",
            Self::ReadyToMove => "ready to move",
            Self::MoveActive => "move active",
            Self::Invalid => "invalid",
        };
        f.write_str(text)
    }
}

/// Snapshot of the four panel inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LampState {
    pub red: bool,
    pub orange: bool,
    pub green: bool,
    pub buzzer: bool,
}

impl LampState {
    /// Decode by priority: red (split by buzzer), then orange, then green.
    pub const fn message(self) -> SystemMessage {
        if self.red {
            if self.buzzer {
                SystemMessage::ServoError
            } else {
                SystemMessage::PressReady
            }
        } else if self.orange {
            SystemMessage::ReadyToMove
        } else if self.green {
            SystemMessage::MoveActive
        } else {
            SystemMessage::Invalid
        }
    }
}

/// Top-level owner of the rig.
pub struct SystemOrchestrator {
    protocol: RegisterProtocol,
    io: Box<dyn DiscreteIo>,
    carriers: Vec<CarrierCoordinator>,
    timing: TimingConfig,
    lamps: LampConfig,
    override_state: OverrideState,
}

impl SystemOrchestrator {
    /// Validate `config` and build the four carriers on one shared transport.
    ///
    /// # Errors
    /// `RigError::InvalidConfiguration` on any validation failure. Nothing
    /// is written to the controller.
    pub fn new(
        mut config: RigConfig,
        transport: impl RegisterTransport + 'static,
        io: impl DiscreteIo + 'static,
    ) -> RigResult<Self> {
        config.validate()?;
        let protocol = RegisterProtocol::new(transport);
        let carriers = config
            .carriers
            .into_iter()
            .enumerate()
            .map(|(index, carrier)| {
                CarrierCoordinator::new(index, carrier, config.timing, protocol.clone())
            })
            .collect::<RigResult<Vec<_>>>()?;

        info!(
            service = %config.shared.service_name,
            carriers = carriers.len(),
            "rig orchestrator created"
        );

        Ok(Self {
            protocol,
            io: Box::new(io),
            carriers,
            timing: config.timing,
            lamps: config.lamps,
            override_state: OverrideState::default(),
        })
    }

    pub fn protocol(&self) -> &RegisterProtocol {
        &self.protocol
    }

    pub fn carriers(&self) -> &[CarrierCoordinator] {
        &self.carriers
    }

    /// Carrier `index`, if it exists.
    pub fn carrier(&self, index: usize) -> Option<&CarrierCoordinator> {
        self.carriers.get(index)
    }

    pub fn carrier_mut(&mut self, index: usize) -> Option<&mut CarrierCoordinator> {
        self.carriers.get_mut(index)
    }

    /// Request controller initialisation and wait for the ready handshake.
    pub fn initialize(&self) -> RigResult<()> {
        self.protocol
            .initialize(self.timing.poll_interval(), self.timing.init_timeout())
    }

    // ─── Power ──────────────────────────────────────────────────────

    /// Enable carriers 0 and 1, pause `enable_stagger`, then carriers 2 and 3.
    ///
    /// Stops at the first failing carrier; carriers after it are left
    /// untouched.
    pub fn enable(&mut self) -> RigResult<()> {
        let stagger = self.timing.enable_stagger();
        for (index, carrier) in self.carriers.iter_mut().enumerate() {
            if index == STAGGER_GROUP {
                debug!(?stagger, "enable stagger");
                thread::sleep(stagger);
            }
            carrier.enable()?;
        }
        info!("rig enabled");
        Ok(())
    }

    /// Disable carriers 0 and 1, pause `disable_stagger`, then carriers 2 and 3.
    pub fn disable(&mut self) -> RigResult<()> {
        let stagger = self.timing.disable_stagger();
        for (index, carrier) in self.carriers.iter_mut().enumerate() {
            if index == STAGGER_GROUP {
                debug!(?stagger, "disable stagger");
                thread::sleep(stagger);
            }
            carrier.disable()?;
        }
        info!("rig disabled");
        Ok(())
    }

    /// Reference the carriers one after another, 0 through 3.
    pub fn reference(&mut self) -> RigResult<()> {
        for carrier in &mut self.carriers {
            carrier.reference()?;
        }
        info!("rig referenced");
        Ok(())
    }

    pub fn is_enabled(&self) -> RigResult<bool> {
        for carrier in &self.carriers {
            if !carrier.is_enabled()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn is_referenced(&self) -> RigResult<bool> {
        for carrier in &self.carriers {
            if !carrier.is_referenced()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Cancel motion on every carrier. Every carrier is addressed even if
    /// an earlier one fails; the first failure is returned.
    pub fn cancel(&self) -> RigResult<()> {
        Self::first_failure(self.carriers.iter().map(CarrierCoordinator::cancel))
    }

    /// Emergency-stop every carrier, with the same fan-out as [`cancel`](Self::cancel).
    pub fn emergency_stop(&self) -> RigResult<()> {
        warn!("rig emergency stop");
        Self::first_failure(
            self.carriers
                .iter()
                .map(CarrierCoordinator::emergency_stop),
        )
    }

    fn first_failure(results: impl Iterator<Item = RigResult<()>>) -> RigResult<()> {
        let mut first = None;
        for result in results {
            if let Err(e) = result {
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }

    // ─── Speed Override ─────────────────────────────────────────────

    /// Step the global override toward `requested` and write it.
    ///
    /// The current value is read back from the controller first. Returns
    /// the value actually written.
    pub fn set_override(&mut self, requested: f32) -> RigResult<f32> {
        let current = self.get_override()?;
        if !current.is_finite() {
            warn!(current, "override register not finite, treating as paused");
        }
        let value = OverrideState::step_toward(current, requested);
        if value != requested {
            warn!(requested, value, "override request limited");
        }
        self.protocol.write_float(map::SPEED_OVERRIDE, value)?;
        self.override_state = OverrideState { value };
        info!(from = current, to = value, "speed override");
        Ok(value)
    }

    /// Read the override register.
    pub fn get_override(&mut self) -> RigResult<f32> {
        let value = self.protocol.read_float(map::SPEED_OVERRIDE)?;
        self.override_state = OverrideState { value };
        Ok(value)
    }

    /// Last override value read or written, without touching the controller.
    pub fn last_override(&self) -> OverrideState {
        self.override_state
    }

    // ─── Discrete I/O ───────────────────────────────────────────────

    fn first_bit(bits: Vec<bool>, addr: u16) -> RigResult<bool> {
        bits.first()
            .copied()
            .ok_or_else(|| TransportError::Io(format!("empty response reading bit {addr}")).into())
    }

    pub fn read_coil(&mut self, addr: u16) -> RigResult<bool> {
        let bits = self.io.read_coils(addr, 1)?;
        Self::first_bit(bits, addr)
    }

    pub fn read_discrete_input(&mut self, addr: u16) -> RigResult<bool> {
        let bits = self.io.read_discrete_inputs(addr, 1)?;
        Self::first_bit(bits, addr)
    }

    pub fn write_coil(&mut self, addr: u16, value: bool) -> RigResult<()> {
        debug!(addr, value, "write coil");
        self.io.write_coil(addr, value)?;
        Ok(())
    }

    /// Sample the panel lamp and buzzer inputs.
    pub fn lamp_state(&mut self) -> RigResult<LampState> {
        let lamps = self.lamps;
        Ok(LampState {
            red: self.read_discrete_input(lamps.red)?,
            orange: self.read_discrete_input(lamps.orange)?,
            green: self.read_discrete_input(lamps.green)?,
            buzzer: self.read_discrete_input(lamps.buzzer)?,
        })
    }

    /// Operator-panel message from the current lamp state.
    pub fn system_message(&mut self) -> RigResult<SystemMessage> {
        Ok(self.lamp_state()?.message())
    }
}

impl fmt::Debug for SystemOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemOrchestrator")
            .field("carriers", &self.carriers.len())
            .field("timing", &self.timing)
            .field("override", &self.override_state.value)
            .finish_non_exhaustive()
    }
}

const_assert!(STAGGER_GROUP < CARRIER_COUNT);
