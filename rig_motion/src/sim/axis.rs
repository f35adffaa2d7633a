//! Step-based model of one simulated axis.
//!
//! Motion advances one step per status read of that axis, so a test run
//! is fully deterministic regardless of wall-clock timing.

use super::controller::SimulationProfile;
use crate::protocol::codec::{AxisStatus, CommandCode};
use tracing::trace;

/// What the running motion of an axis will do when it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Motion {
    Idle,
    Moving,
    Homing,
}

/// Reference command accepted but not yet visible in the status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingReference {
    /// Status reads still reporting the previous word
    delay: u32,
    /// Homing length once started
    steps: u32,
}

/// State of one simulated axis.
#[derive(Debug, Clone)]
pub(crate) struct SimAxis {
    /// Axis index on the controller
    index: u8,
    /// Drive enabled
    enabled: bool,
    /// Homing completed
    referenced: bool,
    /// Actual position
    position: f32,
    /// Position reached when the running motion completes
    target: f32,
    /// Velocity reported while moving
    velocity: f32,
    /// Running motion kind
    motion: Motion,
    /// Status reads left until the running motion completes
    remaining: u32,
    /// Homing latched but not started
    pending: Option<PendingReference>,
    /// Fault: enable commands are ignored
    stuck_enable: bool,
    /// Fault: the drive drops its enable when homing completes
    trip_after_homing: bool,
}

impl SimAxis {
    pub(crate) fn new(index: u8) -> Self {
        Self {
            index,
            enabled: false,
            referenced: false,
            position: 0.0,
            target: 0.0,
            velocity: 0.0,
            motion: Motion::Idle,
            remaining: 0,
            pending: None,
            stuck_enable: false,
            trip_after_homing: false,
        }
    }

    pub(crate) fn status(&self) -> AxisStatus {
        AxisStatus {
            enabled: self.enabled,
            referenced: self.referenced,
            moving: self.is_moving(),
        }
    }

    pub(crate) fn is_moving(&self) -> bool {
        self.motion != Motion::Idle
    }

    /// Moving, or holding a reference command not yet reflected in status.
    pub(crate) fn is_busy(&self) -> bool {
        self.is_moving() || self.pending.is_some()
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn is_referenced(&self) -> bool {
        self.referenced
    }

    pub(crate) fn position(&self) -> f32 {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: f32) {
        self.position = position;
    }

    /// Velocity readback: commanded velocity while moving, zero at rest.
    pub(crate) fn velocity(&self) -> f32 {
        if self.is_moving() { self.velocity } else { 0.0 }
    }

    pub(crate) fn set_stuck_enable(&mut self, stuck: bool) {
        self.stuck_enable = stuck;
        if stuck {
            self.enabled = false;
        }
    }

    pub(crate) fn set_trip_after_homing(&mut self, trip: bool) {
        self.trip_after_homing = trip;
    }

    /// Force the referenced flag, e.g. to model a drive that keeps it across power cycles.
    pub(crate) fn set_referenced(&mut self, referenced: bool) {
        self.referenced = referenced;
    }

    /// Advance the running motion by one step.
    pub(crate) fn step(&mut self) {
        if let Some(pending) = &mut self.pending {
            if pending.delay > 0 {
                pending.delay -= 1;
                return;
            }
            let steps = pending.steps;
            self.pending = None;
            self.start_homing(steps);
            return;
        }
        if self.motion == Motion::Idle {
            return;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.complete();
        }
    }

    fn complete(&mut self) {
        self.position = self.target;
        if self.motion == Motion::Homing {
            self.referenced = true;
            if self.trip_after_homing {
                self.enabled = false;
            }
        }
        trace!(axis = self.index, position = self.position, "sim motion complete");
        self.motion = Motion::Idle;
    }

    fn halt(&mut self) {
        self.motion = Motion::Idle;
        self.remaining = 0;
        self.target = self.position;
    }

    fn start_homing(&mut self, steps: u32) {
        self.referenced = false;
        self.start(Motion::Homing, 0.0, steps);
    }

    fn start(&mut self, motion: Motion, target: f32, steps: u32) {
        self.motion = motion;
        self.target = target;
        self.remaining = steps;
        if steps == 0 {
            self.complete();
        }
    }

    /// Apply a command code. `move_target` and `move_velocity` are the
    /// current contents of the axis' move registers.
    pub(crate) fn apply(
        &mut self,
        code: CommandCode,
        move_target: f32,
        move_velocity: f32,
        profile: &SimulationProfile,
    ) {
        if !matches!(code, CommandCode::Reset | CommandCode::Enable) {
            self.pending = None;
        }
        match code {
            CommandCode::Reset => {}
            CommandCode::Enable => {
                if !self.stuck_enable {
                    self.enabled = true;
                }
            }
            CommandCode::Disable => {
                self.halt();
                self.enabled = false;
            }
            CommandCode::Reference => {
                if self.enabled {
                    self.velocity = move_velocity;
                    if profile.reference_latency == 0 {
                        self.start_homing(profile.reference_polls);
                    } else {
                        self.pending = Some(PendingReference {
                            delay: profile.reference_latency,
                            steps: profile.reference_polls,
                        });
                    }
                }
            }
            CommandCode::AbsoluteMove | CommandCode::IncrementalMove => {
                if self.enabled {
                    let target = if code == CommandCode::AbsoluteMove {
                        move_target
                    } else {
                        self.position + move_target
                    };
                    self.velocity = move_velocity;
                    self.start(Motion::Moving, target, profile.move_polls);
                }
            }
            CommandCode::Cancel | CommandCode::EmergencyStop => self.halt(),
        }
    }
}
