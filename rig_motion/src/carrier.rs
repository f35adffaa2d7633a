//! Carrier-level motion choreography.
//!
//! A [`CarrierCoordinator`] owns the four axis controllers of one carrier
//! and sequences their commands so that horizontal travel only happens
//! with Z at or above the safety height.
//!
//! # Aggregate State
//!
//! ```text
//! Disabled ─► Enabling ─► Enabled ─► Referencing ─► Referenced ─► Ready ◄─► Moving
//! ```
//!
//! After any failed wait the state is re-derived from one status sample of
//! each axis, so it always reflects the last observed hardware state.
//!
//! # Ordering Guarantees
//!
//! | Operation | Guarantee |
//! |-----------|-----------|
//! | `reference()` | Z homed and at rest before X/Y/C homing is issued |
//! | `safe_move()` | Z at safety height before X/Y/C move; X/Y/C at rest before final Z |
//! | `move_to()` | None: X, Y, Z, C issued back to back |

use crate::axis::AxisController;
use crate::error::{AxisExpectation, RigError, RigResult};
use crate::poll::poll_until;
use crate::protocol::RegisterProtocol;
use rig_common::config::ConfigError;
use rig_common::rig::{AxisAddress, CarrierConfig, TimingConfig};
use rig_common::vector::{Axis, Vector4D};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Aggregate lifecycle state of one carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarrierState {
    /// At least one axis disabled.
    Disabled,
    /// Enable issued, waiting for confirmation.
    Enabling,
    /// All axes enabled, not all referenced.
    Enabled,
    /// Homing in progress.
    Referencing,
    /// Homing finished on all axes.
    Referenced,
    /// Enabled, referenced and at rest.
    Ready,
    /// At least one axis moving.
    Moving,
}

impl fmt::Display for CarrierState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Coordinator for the X/Y/Z/C axes of one carrier.
#[derive(Debug)]
pub struct CarrierCoordinator {
    index: usize,
    config: CarrierConfig,
    timing: TimingConfig,
    axes: [AxisController; 4],
    state: CarrierState,
}

impl CarrierCoordinator {
    /// Build a coordinator for carrier `index`.
    ///
    /// # Errors
    /// `RigError::InvalidConfiguration` if the configuration fails
    /// validation or assigns one axis index twice.
    pub fn new(
        index: usize,
        mut config: CarrierConfig,
        timing: TimingConfig,
        protocol: RegisterProtocol,
    ) -> RigResult<Self> {
        config.validate()?;
        timing.validate()?;

        let addresses = config.axes.to_array();
        let unique: HashSet<_> = addresses.iter().collect();
        if unique.len() != addresses.len() {
            return Err(ConfigError::ValidationError(format!(
                "carrier {index} assigns an axis index twice"
            ))
            .into());
        }

        let axes = addresses
            .map(|addr| AxisController::new(addr, protocol.clone(), timing.poll_interval()));

        debug!(
            carrier = index,
            x = %config.axes.x,
            y = %config.axes.y,
            z = %config.axes.z,
            c = %config.axes.c,
            "carrier created"
        );

        Ok(Self {
            index,
            config,
            timing,
            axes,
            state: CarrierState::Disabled,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn config(&self) -> &CarrierConfig {
        &self.config
    }

    /// Last known aggregate state.
    pub fn state(&self) -> CarrierState {
        self.state
    }

    /// Controller of one channel.
    pub fn axis(&self, axis: Axis) -> &AxisController {
        &self.axes[axis.index()]
    }

    fn transition(&mut self, next: CarrierState) {
        if self.state != next {
            debug!(carrier = self.index, from = %self.state, to = %next, "carrier state");
            self.state = next;
        }
    }

    /// Re-derive the aggregate state from one status read per axis.
    pub fn refresh_state(&mut self) -> RigResult<CarrierState> {
        let mut enabled = true;
        let mut referenced = true;
        let mut moving = false;
        for axis in &self.axes {
            let status = axis.status()?;
            enabled &= status.enabled;
            referenced &= status.referenced;
            moving |= status.moving;
        }
        let state = if !enabled {
            CarrierState::Disabled
        } else if moving {
            CarrierState::Moving
        } else if !referenced {
            CarrierState::Enabled
        } else {
            CarrierState::Ready
        };
        self.transition(state);
        Ok(state)
    }

    /// Refresh after a failure; a failing refresh keeps the previous state.
    fn settle_state(&mut self) {
        if let Err(e) = self.refresh_state() {
            warn!(carrier = self.index, "state refresh failed: {}", e);
        }
    }

    // ─── Readbacks ──────────────────────────────────────────────────

    /// Actual position of all four channels.
    pub fn position(&self) -> RigResult<Vector4D> {
        let mut position = Vector4D::ZERO;
        for axis in Axis::ALL {
            position = position.with(axis, self.axis(axis).position()?);
        }
        Ok(position)
    }

    /// Actual velocity of all four channels.
    pub fn velocity(&self) -> RigResult<Vector4D> {
        let mut velocity = Vector4D::ZERO;
        for axis in Axis::ALL {
            velocity = velocity.with(axis, self.axis(axis).velocity()?);
        }
        Ok(velocity)
    }

    /// True if all four axes report enabled.
    pub fn is_enabled(&self) -> RigResult<bool> {
        self.all(|axis| axis.is_enabled())
    }

    /// True if all four axes report referenced.
    pub fn is_referenced(&self) -> RigResult<bool> {
        self.all(|axis| axis.is_referenced())
    }

    /// True if any axis reports moving.
    pub fn is_moving(&self) -> RigResult<bool> {
        for axis in &self.axes {
            if axis.is_moving()? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn all(&self, mut f: impl FnMut(&AxisController) -> RigResult<bool>) -> RigResult<bool> {
        for axis in &self.axes {
            if !f(axis)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    // ─── Enable / Disable ───────────────────────────────────────────

    /// Enable all four axes and wait until each reports enabled.
    ///
    /// All enable commands are issued before waiting, so an axis that never
    /// confirms does not hold back the others.
    ///
    /// # Errors
    /// `RigError::AxisTimeout` naming the first axis still disabled.
    pub fn enable(&mut self) -> RigResult<()> {
        self.transition(CarrierState::Enabling);
        let result = self.switch_all(true);
        match result {
            Ok(()) => {
                self.settle_state();
                info!(carrier = self.index, "carrier enabled");
                Ok(())
            }
            Err(e) => {
                self.settle_state();
                Err(e)
            }
        }
    }

    /// Disable all four axes and wait until each reports disabled.
    /// Safe to call on an already disabled carrier.
    pub fn disable(&mut self) -> RigResult<()> {
        let result = self.switch_all(false);
        self.settle_state();
        if result.is_ok() {
            info!(carrier = self.index, "carrier disabled");
        }
        result
    }

    /// Enable a single axis.
    pub fn enable_axis(&mut self, axis: Axis) -> RigResult<()> {
        let result = self.axis(axis).enable(self.timing.axis_timeout());
        self.settle_state();
        result
    }

    /// Disable a single axis.
    pub fn disable_axis(&mut self, axis: Axis) -> RigResult<()> {
        let result = self.axis(axis).disable(self.timing.axis_timeout());
        self.settle_state();
        result
    }

    fn switch_all(&self, enable: bool) -> RigResult<()> {
        for axis in &self.axes {
            if enable {
                axis.request_enable()?;
            } else {
                axis.request_disable()?;
            }
        }
        let reached = poll_until(self.timing.poll_interval(), self.timing.axis_timeout(), || {
            self.all(|axis| Ok(axis.is_enabled()? == enable))
        })?;
        if reached {
            return Ok(());
        }
        let expected = if enable {
            AxisExpectation::Enabled
        } else {
            AxisExpectation::Disabled
        };
        let stuck = self.first_axis(|axis| Ok(axis.is_enabled()? != enable))?;
        warn!(carrier = self.index, axis = %stuck, %expected, "carrier switch wait expired");
        Err(RigError::AxisTimeout {
            axis: stuck,
            expected,
        })
    }

    /// Address of the first axis matching `f`, or of X if none does any more.
    fn first_axis(
        &self,
        mut f: impl FnMut(&AxisController) -> RigResult<bool>,
    ) -> RigResult<AxisAddress> {
        for axis in &self.axes {
            if f(axis)? {
                return Ok(axis.address());
            }
        }
        Ok(self.axes[Axis::X.index()].address())
    }

    // ─── Referencing ────────────────────────────────────────────────

    /// Home the carrier: Z first and to completion, then X, Y, C together.
    ///
    /// # Errors
    /// `RigError::AxisTimeout { expected: Referenced }` naming the first
    /// axis that did not finish homing within the reference timeout.
    pub fn reference(&mut self) -> RigResult<()> {
        self.transition(CarrierState::Referencing);
        let result = self.reference_sequence();
        match result {
            Ok(()) => {
                self.transition(CarrierState::Referenced);
                info!(carrier = self.index, "carrier referenced");
                self.settle_state();
                Ok(())
            }
            Err(e) => {
                self.settle_state();
                Err(e)
            }
        }
    }

    fn reference_sequence(&self) -> RigResult<()> {
        let timeout = self.timing.reference_timeout();

        debug!(carrier = self.index, "referencing Z");
        let z = self.axis(Axis::Z);
        z.reference()?;
        z.wait_referenced(timeout)?;

        debug!(carrier = self.index, "referencing X, Y, C");
        for axis in Axis::HORIZONTAL {
            self.axis(axis).reference()?;
        }
        let mut departed = [false; 3];
        let mut finished = [false; 3];
        let done = poll_until(self.timing.poll_interval(), timeout, || {
            for (i, axis) in Axis::HORIZONTAL.into_iter().enumerate() {
                if !finished[i] {
                    finished[i] = self.axis(axis).homing_finished(&mut departed[i])?;
                }
            }
            Ok(finished.iter().all(|&f| f))
        })?;
        if done {
            return Ok(());
        }
        let stuck = Axis::HORIZONTAL
            .into_iter()
            .zip(finished)
            .find(|&(_, f)| !f)
            .map_or(Axis::X, |(axis, _)| axis);
        let stuck = self.axis(stuck).address();
        warn!(carrier = self.index, axis = %stuck, "reference wait expired");
        Err(RigError::AxisTimeout {
            axis: stuck,
            expected: AxisExpectation::Referenced,
        })
    }

    // ─── Defaults ───────────────────────────────────────────────────

    /// Store the default velocity, clamped to the carrier's ceilings.
    pub fn set_default_speed(&mut self, velocity: Vector4D) {
        self.config.set_default_velocity(velocity);
    }

    /// Store the default acceleration, clamped to the carrier's ceilings.
    pub fn set_default_acceleration(&mut self, acceleration: Vector4D) {
        self.config.set_default_acceleration(acceleration);
    }

    pub fn default_speed(&self) -> Vector4D {
        self.config.default_velocity()
    }

    pub fn default_acceleration(&self) -> Vector4D {
        self.config.default_acceleration()
    }

    pub fn set_home(&mut self, position: Vector4D) -> RigResult<()> {
        Ok(self.config.set_home(position)?)
    }

    pub fn set_load(&mut self, position: Vector4D) -> RigResult<()> {
        Ok(self.config.set_load(position)?)
    }

    pub fn set_safety_height(&mut self, height: f32) -> RigResult<()> {
        Ok(self.config.set_safety_height(height)?)
    }

    fn resolve_velocity(&self, velocity: Option<Vector4D>) -> Vector4D {
        self.config
            .limits
            .clamp_velocity(velocity.unwrap_or(self.config.default_velocity()))
    }

    fn resolve_axis_velocity(&self, axis: Axis, velocity: Option<f32>) -> f32 {
        let limit = self.config.limits.max_velocity.get(axis);
        velocity
            .unwrap_or(self.config.default_velocity().get(axis))
            .max(0.0)
            .min(limit)
    }

    fn check_travel(&self, axis: Axis, target: f32) -> RigResult<()> {
        if self.config.limits.axis_within_travel(axis, target) {
            return Ok(());
        }
        warn!(carrier = self.index, %axis, target, "target outside travel");
        Err(RigError::TargetOutOfTravel {
            carrier: self.index,
            axis,
            target,
        })
    }

    fn check_target(&self, target: &Vector4D) -> RigResult<()> {
        for axis in Axis::ALL {
            self.check_travel(axis, target.get(axis))?;
        }
        Ok(())
    }

    // ─── Motion ─────────────────────────────────────────────────────

    fn issue(&self, axis: Axis, target: f32, velocity: f32, absolute: bool) -> RigResult<()> {
        let acceleration = self.config.default_acceleration().get(axis);
        self.axis(axis)
            .move_to(target, velocity, acceleration, absolute)
    }

    /// Wait until none of `axes` reports moving.
    fn wait_idle(&self, axes: &[Axis]) -> RigResult<()> {
        let idle = poll_until(
            self.timing.poll_interval(),
            self.timing.motion_timeout(),
            || {
                for &axis in axes {
                    if self.axis(axis).is_moving()? {
                        return Ok(false);
                    }
                }
                Ok(true)
            },
        )?;
        if idle {
            Ok(())
        } else {
            warn!(carrier = self.index, ?axes, "motion wait expired");
            Err(RigError::MotionTimeout {
                carrier: self.index,
            })
        }
    }

    /// Wait until all four axes are at rest.
    ///
    /// # Errors
    /// `RigError::MotionTimeout` if the motion timeout expires. Command
    /// registers are left untouched.
    pub fn wait_for_motion(&mut self) -> RigResult<()> {
        let result = self.wait_idle(&Axis::ALL);
        self.settle_state();
        result
    }

    /// Run `moves` with the state set to `Moving`, then re-derive it.
    fn in_motion(&mut self, moves: impl FnOnce(&Self) -> RigResult<()>) -> RigResult<()> {
        self.transition(CarrierState::Moving);
        let result = moves(self);
        self.settle_state();
        result
    }

    /// Move all four axes at once and wait until they stop.
    ///
    /// Issues X, Y, Z, C back to back. This ordering is NOT collision-safe:
    /// Z travels concurrently with X/Y. Use [`safe_move`](Self::safe_move)
    /// whenever Z clearance matters.
    ///
    /// # Errors
    /// `RigError::TargetOutOfTravel` for an absolute target outside travel
    /// (nothing is written); `RigError::MotionTimeout` on an expired wait.
    pub fn move_to(
        &mut self,
        target: Vector4D,
        absolute: bool,
        velocity: Option<Vector4D>,
    ) -> RigResult<()> {
        if absolute {
            self.check_target(&target)?;
        }
        let velocity = self.resolve_velocity(velocity);
        debug!(carrier = self.index, %target, absolute, "carrier move");
        self.in_motion(|carrier| {
            for axis in Axis::ALL {
                carrier.issue(axis, target.get(axis), velocity.get(axis), absolute)?;
            }
            carrier.wait_idle(&Axis::ALL)
        })
    }

    /// Collision-safe move in three phases.
    ///
    /// 1. Z to the safety height, wait.
    /// 2. X, Y, C to their targets together, wait.
    /// 3. Z to its final height, wait.
    ///
    /// For `absolute = false` the X/Y/C moves are incremental and the final
    /// Z height is the starting height plus `target.z`.
    ///
    /// An emergency stop racing this call may leave Z at the safety height.
    ///
    /// # Errors
    /// `RigError::TargetOutOfTravel` if an absolute target or the final Z
    /// height leaves travel; `RigError::MotionTimeout` on an expired wait.
    pub fn safe_move(
        &mut self,
        target: Vector4D,
        absolute: bool,
        velocity: Option<Vector4D>,
    ) -> RigResult<()> {
        if absolute {
            self.check_target(&target)?;
        }
        let final_z = if absolute {
            target.z
        } else {
            self.axis(Axis::Z).position()? + target.z
        };
        self.check_travel(Axis::Z, final_z)?;

        let velocity = self.resolve_velocity(velocity);
        let safety_height = self.config.safety_height();
        debug!(carrier = self.index, %target, absolute, safety_height, "carrier safe move");

        self.in_motion(|carrier| {
            debug!(carrier = carrier.index, "safe move: Z to safety height");
            carrier.issue(Axis::Z, safety_height, velocity.z, true)?;
            carrier.wait_idle(&[Axis::Z])?;

            debug!(carrier = carrier.index, "safe move: horizontal");
            for axis in Axis::HORIZONTAL {
                carrier.issue(axis, target.get(axis), velocity.get(axis), absolute)?;
            }
            carrier.wait_idle(&Axis::HORIZONTAL)?;

            debug!(carrier = carrier.index, final_z, "safe move: Z to target");
            carrier.issue(Axis::Z, final_z, velocity.z, true)?;
            carrier.wait_idle(&[Axis::Z])
        })
    }

    /// Safe move to the stored home position.
    pub fn go_home(&mut self) -> RigResult<()> {
        info!(carrier = self.index, "going home");
        self.safe_move(self.config.home(), true, None)
    }

    /// Safe move to the stored load position.
    pub fn go_load(&mut self) -> RigResult<()> {
        info!(carrier = self.index, "going to load position");
        self.safe_move(self.config.load(), true, None)
    }

    /// Single-axis move, waiting for completion.
    ///
    /// Unsafe: bypasses the choreography, the caller owns collision
    /// avoidance.
    pub fn move_axis(
        &mut self,
        axis: Axis,
        target: f32,
        absolute: bool,
        velocity: Option<f32>,
    ) -> RigResult<()> {
        self.umove_axis(axis, target, absolute, velocity)?;
        self.in_motion(|carrier| carrier.wait_idle(&[axis]))
    }

    /// Single-axis move without waiting.
    ///
    /// Unsafe: bypasses the choreography, the caller owns collision
    /// avoidance.
    pub fn umove_axis(
        &mut self,
        axis: Axis,
        target: f32,
        absolute: bool,
        velocity: Option<f32>,
    ) -> RigResult<()> {
        if absolute {
            self.check_travel(axis, target)?;
        }
        let velocity = self.resolve_axis_velocity(axis, velocity);
        self.transition(CarrierState::Moving);
        self.issue(axis, target, velocity, absolute)
    }

    /// Unsafe single-axis X move, blocking.
    pub fn move_x(&mut self, target: f32, absolute: bool, velocity: Option<f32>) -> RigResult<()> {
        self.move_axis(Axis::X, target, absolute, velocity)
    }

    /// Unsafe single-axis Y move, blocking.
    pub fn move_y(&mut self, target: f32, absolute: bool, velocity: Option<f32>) -> RigResult<()> {
        self.move_axis(Axis::Y, target, absolute, velocity)
    }

    /// Unsafe single-axis Z move, blocking.
    pub fn move_z(&mut self, target: f32, absolute: bool, velocity: Option<f32>) -> RigResult<()> {
        self.move_axis(Axis::Z, target, absolute, velocity)
    }

    /// Unsafe single-axis C move, blocking.
    pub fn move_c(&mut self, target: f32, absolute: bool, velocity: Option<f32>) -> RigResult<()> {
        self.move_axis(Axis::C, target, absolute, velocity)
    }

    /// Unsafe single-axis X move, non-blocking.
    pub fn umove_x(&mut self, target: f32, absolute: bool, velocity: Option<f32>) -> RigResult<()> {
        self.umove_axis(Axis::X, target, absolute, velocity)
    }

    /// Unsafe single-axis Y move, non-blocking.
    pub fn umove_y(&mut self, target: f32, absolute: bool, velocity: Option<f32>) -> RigResult<()> {
        self.umove_axis(Axis::Y, target, absolute, velocity)
    }

    /// Unsafe single-axis Z move, non-blocking.
    pub fn umove_z(&mut self, target: f32, absolute: bool, velocity: Option<f32>) -> RigResult<()> {
        self.umove_axis(Axis::Z, target, absolute, velocity)
    }

    /// Unsafe single-axis C move, non-blocking.
    pub fn umove_c(&mut self, target: f32, absolute: bool, velocity: Option<f32>) -> RigResult<()> {
        self.umove_axis(Axis::C, target, absolute, velocity)
    }

    // ─── Stop ───────────────────────────────────────────────────────

    /// Cancel the current move on every axis. Does not wait.
    pub fn cancel(&self) -> RigResult<()> {
        self.fan_out(AxisController::cancel_move)
    }

    /// Emergency-stop every axis. Does not wait and does not roll back a
    /// running safe move.
    pub fn emergency_stop(&self) -> RigResult<()> {
        warn!(carrier = self.index, "carrier emergency stop");
        self.fan_out(AxisController::emergency_stop)
    }

    /// Send to every axis even if one fails; report the first failure.
    fn fan_out(&self, f: impl Fn(&AxisController) -> RigResult<()>) -> RigResult<()> {
        let mut first_error = None;
        for axis in &self.axes {
            if let Err(e) = f(axis) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Timing bounds in use.
    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Poll interval in use.
    pub fn poll_interval(&self) -> Duration {
        self.timing.poll_interval()
    }
}
