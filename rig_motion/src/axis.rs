//! Per-axis command/status lifecycle.
//!
//! An [`AxisController`] owns the command register of exactly one axis and
//! decodes its status word on demand. Status is never cached: every query
//! is one register read, the controller is the source of truth.

use crate::error::{AxisExpectation, RigError, RigResult};
use crate::poll::poll_until;
use crate::protocol::codec::{AxisStatus, CommandCode};
use crate::protocol::{map, RegisterProtocol};
use rig_common::rig::AxisAddress;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Command and status access for one physical axis.
#[derive(Debug, Clone)]
pub struct AxisController {
    address: AxisAddress,
    protocol: RegisterProtocol,
    poll_interval: Duration,
}

impl AxisController {
    pub fn new(address: AxisAddress, protocol: RegisterProtocol, poll_interval: Duration) -> Self {
        Self {
            address,
            protocol,
            poll_interval,
        }
    }

    pub fn address(&self) -> AxisAddress {
        self.address
    }

    /// One status read, decoded.
    pub fn status(&self) -> RigResult<AxisStatus> {
        self.protocol.read_status(self.address)
    }

    pub fn is_enabled(&self) -> RigResult<bool> {
        Ok(self.status()?.enabled)
    }

    pub fn is_referenced(&self) -> RigResult<bool> {
        Ok(self.status()?.referenced)
    }

    pub fn is_moving(&self) -> RigResult<bool> {
        Ok(self.status()?.moving)
    }

    /// Actual position from the position bank.
    pub fn position(&self) -> RigResult<f32> {
        self.protocol.read_float(map::position(self.address))
    }

    /// Actual velocity from the velocity bank.
    pub fn velocity(&self) -> RigResult<f32> {
        self.protocol.read_float(map::velocity(self.address))
    }

    fn command(&self, code: CommandCode) -> RigResult<()> {
        debug!(axis = %self.address, ?code, "axis command");
        self.protocol.write_command(self.address, code)
    }

    /// Enable the drive and wait until the enabled bit is set.
    ///
    /// # Errors
    /// `RigError::AxisTimeout { expected: Enabled }` if `timeout` expires.
    pub fn enable(&self, timeout: Duration) -> RigResult<()> {
        self.request_enable()?;
        self.wait_enabled(true, timeout)
    }

    /// Write the enable command without waiting.
    pub fn request_enable(&self) -> RigResult<()> {
        self.command(CommandCode::Enable)
    }

    /// Write the disable command without waiting.
    pub fn request_disable(&self) -> RigResult<()> {
        self.command(CommandCode::Disable)
    }

    /// Disable the drive and wait until the enabled bit is clear.
    ///
    /// # Errors
    /// `RigError::AxisTimeout { expected: Disabled }` if `timeout` expires.
    pub fn disable(&self, timeout: Duration) -> RigResult<()> {
        self.request_disable()?;
        self.wait_enabled(false, timeout)
    }

    /// Wait until the enabled bit equals `enabled`, without issuing a command.
    pub fn wait_enabled(&self, enabled: bool, timeout: Duration) -> RigResult<()> {
        let reached = poll_until(self.poll_interval, timeout, || {
            Ok(self.status()?.enabled == enabled)
        })?;
        if reached {
            return Ok(());
        }
        let expected = if enabled {
            AxisExpectation::Enabled
        } else {
            AxisExpectation::Disabled
        };
        warn!(axis = %self.address, %expected, "axis wait expired");
        Err(RigError::AxisTimeout {
            axis: self.address,
            expected,
        })
    }

    /// Start homing. Completion is awaited separately with
    /// [`wait_referenced`](Self::wait_referenced).
    pub fn reference(&self) -> RigResult<()> {
        self.command(CommandCode::Reference)
    }

    /// Wait until the axis reports referenced and at rest.
    ///
    /// The first samples after a Reference command may still carry the
    /// word from before it, so the wait only counts a homed sample once
    /// the axis has been seen leaving that state.
    ///
    /// # Errors
    /// `RigError::AxisTimeout { expected: Referenced }` if `timeout` expires.
    pub fn wait_referenced(&self, timeout: Duration) -> RigResult<()> {
        let mut departed = false;
        let reached = poll_until(self.poll_interval, timeout, || {
            self.homing_finished(&mut departed)
        })?;
        if reached {
            return Ok(());
        }
        warn!(axis = %self.address, departed, "axis reference wait expired");
        Err(RigError::AxisTimeout {
            axis: self.address,
            expected: AxisExpectation::Referenced,
        })
    }

    /// One sample of a homing wait.
    ///
    /// `departed` starts `false` and latches once the referenced bit is
    /// seen clear or the axis is seen moving. Homing is finished on the
    /// first referenced, at-rest sample after that.
    pub fn homing_finished(&self, departed: &mut bool) -> RigResult<bool> {
        let status = self.status()?;
        if !*departed {
            if status.referenced && !status.moving {
                trace!(axis = %self.address, "homing not yet visible");
                return Ok(false);
            }
            *departed = true;
        }
        Ok(status.referenced && !status.moving)
    }

    /// Issue one move without waiting for completion.
    ///
    /// Writes target, velocity and acceleration, then the move code,
    /// samples the status once and clears the command register so the
    /// controller does not re-trigger the same move. Callers await
    /// completion through [`is_moving`](Self::is_moving).
    pub fn move_to(
        &self,
        target: f32,
        velocity: f32,
        acceleration: f32,
        absolute: bool,
    ) -> RigResult<()> {
        self.protocol.write_float(map::target(self.address), target)?;
        self.protocol
            .write_float(map::move_velocity(self.address), velocity)?;
        self.protocol
            .write_float(map::move_acceleration(self.address), acceleration)?;
        debug!(
            axis = %self.address,
            target,
            velocity,
            acceleration,
            absolute,
            "axis move"
        );
        self.protocol
            .write_command(self.address, CommandCode::for_move(absolute))?;
        let status = self.status()?;
        trace!(axis = %self.address, ?status, "status after move command");
        self.protocol.write_command(self.address, CommandCode::Reset)
    }

    /// Abort the current move. Fire-and-forget.
    pub fn cancel_move(&self) -> RigResult<()> {
        self.command(CommandCode::Cancel)
    }

    /// Immediate emergency stop. Fire-and-forget.
    pub fn emergency_stop(&self) -> RigResult<()> {
        warn!(axis = %self.address, "emergency stop");
        self.protocol
            .write_command(self.address, CommandCode::EmergencyStop)
    }
}
