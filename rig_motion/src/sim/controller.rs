//! Simulated motion controller speaking the register map.

use super::axis::SimAxis;
use crate::protocol::codec::{decode_float, encode_float, CommandCode};
use crate::protocol::map;
use crate::transport::{RegisterTransport, TransportError};
use rig_common::consts::AXIS_COUNT;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace, warn};

/// Step counts of the simulated motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationProfile {
    /// Status reads of an axis until a move completes
    pub move_polls: u32,
    /// Status reads of an axis until homing completes
    pub reference_polls: u32,
    /// Ready-register reads after the init request until ready is reported
    pub init_polls: u32,
    /// Status reads after a Reference command that still report the
    /// previous status word
    pub reference_latency: u32,
}

impl Default for SimulationProfile {
    fn default() -> Self {
        Self {
            move_polls: 3,
            reference_polls: 3,
            init_polls: 2,
            reference_latency: 0,
        }
    }
}

/// One command register write observed by the simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRecord {
    /// Axis index the command was written to
    pub axis: u8,
    /// Decoded command
    pub code: CommandCode,
    /// Content of the axis' move-target register at that moment
    pub target: f32,
    /// Axes in motion, or holding a latched reference, when the command arrived
    pub moving: Vec<u8>,
}

#[derive(Debug)]
struct SimState {
    profile: SimulationProfile,
    axes: Vec<SimAxis>,
    /// Output registers as last written
    holding: HashMap<u16, u16>,
    /// Remaining ready-register reads before ready; `None` until requested
    init_countdown: Option<u32>,
    /// Never report ready
    init_blocked: bool,
    commands: Vec<CommandRecord>,
    failing_reads: u32,
    failing_writes: u32,
    connected: bool,
}

impl SimState {
    fn new(profile: SimulationProfile) -> Self {
        let mut holding = HashMap::new();
        let [low, high] = encode_float(1.0);
        holding.insert(map::SPEED_OVERRIDE, low);
        holding.insert(map::SPEED_OVERRIDE + 1, high);
        Self {
            profile,
            axes: (0..AXIS_COUNT as u8).map(SimAxis::new).collect(),
            holding,
            init_countdown: None,
            init_blocked: false,
            commands: Vec::new(),
            failing_reads: 0,
            failing_writes: 0,
            connected: true,
        }
    }

    fn holding_float(&self, addr: u16) -> f32 {
        let word = |a| self.holding.get(&a).copied().unwrap_or(0);
        decode_float([word(addr), word(addr + 1)])
    }

    /// Word at `addr` of an input float bank, given the axis' value.
    fn float_word(addr: u16, base: u16, value: impl Fn(usize) -> f32, axes: usize) -> Option<u16> {
        let offset = addr.checked_sub(base)?;
        let index = usize::from(offset / map::FLOAT_WIDTH);
        if index >= axes {
            return None;
        }
        Some(encode_float(value(index))[usize::from(offset % map::FLOAT_WIDTH)])
    }

    fn read_one(&mut self, addr: u16) -> u16 {
        if let Some(index) = map::axis_in_bank(addr, map::STATUS_BASE, 1) {
            let axis = &mut self.axes[usize::from(index)];
            axis.step();
            return axis.status().to_word();
        }
        if addr == map::SYSTEM_READY {
            return self.read_ready();
        }
        let axes = self.axes.len();
        let bank_end = |base: u16| base + map::FLOAT_WIDTH * axes as u16;
        if addr < bank_end(map::POSITION_BASE) {
            return Self::float_word(addr, map::POSITION_BASE, |i| self.axes[i].position(), axes)
                .unwrap_or(0);
        }
        if (map::VELOCITY_BASE..bank_end(map::VELOCITY_BASE)).contains(&addr) {
            return Self::float_word(addr, map::VELOCITY_BASE, |i| self.axes[i].velocity(), axes)
                .unwrap_or(0);
        }
        self.holding.get(&addr).copied().unwrap_or(0)
    }

    fn read_ready(&mut self) -> u16 {
        if self.init_blocked {
            return 0;
        }
        match self.init_countdown {
            Some(0) => map::SYSTEM_READY_VALUE,
            Some(n) => {
                self.init_countdown = Some(n - 1);
                0
            }
            None => 0,
        }
    }

    fn write_one(&mut self, addr: u16, value: u16) {
        self.holding.insert(addr, value);
        if addr == map::SYSTEM_INIT && value == map::SYSTEM_INIT_REQUEST {
            debug!("sim init requested");
            self.init_countdown = Some(self.profile.init_polls);
            return;
        }
        if let Some(index) = map::axis_in_bank(addr, map::COMMAND_BASE, 1) {
            self.command(index, value);
        }
    }

    fn command(&mut self, index: u8, raw: u16) {
        let Some(code) = CommandCode::from_u16(raw) else {
            warn!(axis = index, raw, "sim ignoring unknown command");
            return;
        };
        let axis_slot = |base: u16| base + map::FLOAT_WIDTH * u16::from(index);
        let target = self.holding_float(axis_slot(map::TARGET_BASE));
        let velocity = self.holding_float(axis_slot(map::MOVE_VELOCITY_BASE));
        let moving = self
            .axes
            .iter()
            .enumerate()
            .filter(|(_, axis)| axis.is_busy())
            .map(|(i, _)| i as u8)
            .collect();
        self.commands.push(CommandRecord {
            axis: index,
            code,
            target,
            moving,
        });
        trace!(axis = index, ?code, target, "sim command");
        let profile = self.profile;
        self.axes[usize::from(index)].apply(code, target, velocity, &profile);
    }
}

/// In-memory motion controller for tests and dry runs.
///
/// Cloning yields another handle to the same controller, so a test can
/// hand one clone to the protocol and inspect the other.
///
/// # Behaviour
///
/// | Command | Effect |
/// |---------|--------|
/// | Enable | Enabled at once, unless the axis is marked stuck |
/// | Disable | Halts and disables |
/// | Reference | After `reference_latency` status reads, clears referenced and homes to 0 over `reference_polls` reads |
/// | Absolute / Incremental move | Reaches the target over `move_polls` status reads |
/// | Cancel / Emergency stop | Halts in place |
/// | Reset | No effect |
///
/// Commands to a disabled axis other than Enable/Disable are ignored.
#[derive(Debug, Clone)]
pub struct SimulatedController {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimulatedController {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedController {
    pub fn new() -> Self {
        Self::with_profile(SimulationProfile::default())
    }

    pub fn with_profile(profile: SimulationProfile) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState::new(profile))),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ─── Fault Injection ────────────────────────────────────────────

    /// Make axis `index` ignore enable commands.
    pub fn stuck_enable(&self, index: u8) {
        if let Some(axis) = self.state().axes.get_mut(usize::from(index)) {
            axis.set_stuck_enable(true);
        }
    }

    /// Fail the next `n` read exchanges with a transport timeout.
    pub fn fail_next_reads(&self, n: u32) {
        self.state().failing_reads = n;
    }

    /// Fail the next `n` write exchanges with a transport timeout.
    pub fn fail_next_writes(&self, n: u32) {
        self.state().failing_writes = n;
    }

    /// Never report system ready.
    pub fn block_init(&self) {
        self.state().init_blocked = true;
    }

    /// Make axis `index` drop its enable when homing completes.
    pub fn trip_after_homing(&self, index: u8) {
        if let Some(axis) = self.state().axes.get_mut(usize::from(index)) {
            axis.set_trip_after_homing(true);
        }
    }

    /// Place axis `index` at `position` without motion.
    pub fn set_position(&self, index: u8, position: f32) {
        if let Some(axis) = self.state().axes.get_mut(usize::from(index)) {
            axis.set_position(position);
        }
    }

    /// Force the referenced flag of axis `index`.
    pub fn set_referenced(&self, index: u8, referenced: bool) {
        if let Some(axis) = self.state().axes.get_mut(usize::from(index)) {
            axis.set_referenced(referenced);
        }
    }

    // ─── Inspection ─────────────────────────────────────────────────

    /// Every command written so far, in arrival order.
    pub fn commands(&self) -> Vec<CommandRecord> {
        self.state().commands.clone()
    }

    /// Move commands only.
    pub fn moves(&self) -> Vec<CommandRecord> {
        self.state()
            .commands
            .iter()
            .filter(|record| record.code.is_move())
            .cloned()
            .collect()
    }

    pub fn clear_commands(&self) {
        self.state().commands.clear();
    }

    pub fn axis_position(&self, index: u8) -> Option<f32> {
        self.state().axes.get(usize::from(index)).map(SimAxis::position)
    }

    pub fn axis_enabled(&self, index: u8) -> Option<bool> {
        self.state().axes.get(usize::from(index)).map(SimAxis::is_enabled)
    }

    pub fn axis_referenced(&self, index: u8) -> Option<bool> {
        self.state()
            .axes
            .get(usize::from(index))
            .map(SimAxis::is_referenced)
    }

    /// Raw content of an output register.
    pub fn holding_register(&self, addr: u16) -> u16 {
        self.state().holding.get(&addr).copied().unwrap_or(0)
    }

    /// Float stored at an output register pair.
    pub fn holding_float(&self, addr: u16) -> f32 {
        self.state().holding_float(addr)
    }

    pub fn is_connected(&self) -> bool {
        self.state().connected
    }
}

impl RegisterTransport for SimulatedController {
    fn read_registers(&mut self, addr: u16, count: u16) -> Result<Vec<u16>, TransportError> {
        let mut state = self.state();
        if !state.connected {
            return Err(TransportError::Disconnected);
        }
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(TransportError::Timeout);
        }
        let end = addr
            .checked_add(count)
            .ok_or(TransportError::Exception { code: 2 })?;
        Ok((addr..end).map(|a| state.read_one(a)).collect())
    }

    fn write_register(&mut self, addr: u16, value: u16) -> Result<(), TransportError> {
        self.write_registers(addr, &[value])
    }

    fn write_registers(&mut self, addr: u16, values: &[u16]) -> Result<(), TransportError> {
        let mut state = self.state();
        if !state.connected {
            return Err(TransportError::Disconnected);
        }
        if state.failing_writes > 0 {
            state.failing_writes -= 1;
            return Err(TransportError::Timeout);
        }
        for (offset, &value) in values.iter().enumerate() {
            let a = u16::try_from(offset)
                .ok()
                .and_then(|o| addr.checked_add(o))
                .ok_or(TransportError::Exception { code: 2 })?;
            state.write_one(a, value);
        }
        Ok(())
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        self.state().connected = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        self.state().connected = false;
        Ok(())
    }
}
