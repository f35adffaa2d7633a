//! Fixed register map of the motion controller.
//!
//! | Purpose | Base | Stride | Width |
//! |---|---|---|---|
//! | position (input) | 0 | 2 words/axis | float |
//! | velocity (input) | 600 | 2 words/axis | float |
//! | status (input) | 900 | 1 word/axis | bitfield |
//! | system-ready (input) | 1000 | - | word |
//! | system-init (output) | 2048 | - | word |
//! | speed-override (output) | 2050 | 2 words | float |
//! | move-target (output) | 3000 | 2 words/axis | float |
//! | move-velocity (output) | 3100 | 2 words/axis | float |
//! | move-acceleration (output) | 3200 | 2 words/axis | float |
//! | command (output) | 3300 | 1 word/axis | code |

use rig_common::consts::AXIS_COUNT;
use rig_common::rig::AxisAddress;
use static_assertions::const_assert;

pub const POSITION_BASE: u16 = 0;
pub const VELOCITY_BASE: u16 = 600;
pub const STATUS_BASE: u16 = 900;
pub const SYSTEM_READY: u16 = 1000;
pub const SYSTEM_INIT: u16 = 2048;
pub const SPEED_OVERRIDE: u16 = 2050;
pub const TARGET_BASE: u16 = 3000;
pub const MOVE_VELOCITY_BASE: u16 = 3100;
pub const MOVE_ACCELERATION_BASE: u16 = 3200;
pub const COMMAND_BASE: u16 = 3300;

/// Value written to `SYSTEM_INIT` to request initialisation.
pub const SYSTEM_INIT_REQUEST: u16 = 1;

/// Value of `SYSTEM_READY` once initialisation finished.
pub const SYSTEM_READY_VALUE: u16 = 2;

/// Words per float register.
pub const FLOAT_WIDTH: u16 = 2;

const AXES: u16 = AXIS_COUNT as u16;

// Banks must not overlap for the full rig.
const_assert!(POSITION_BASE + FLOAT_WIDTH * AXES <= VELOCITY_BASE);
const_assert!(VELOCITY_BASE + FLOAT_WIDTH * AXES <= STATUS_BASE);
const_assert!(STATUS_BASE + AXES <= SYSTEM_READY);
const_assert!(SYSTEM_INIT < SPEED_OVERRIDE);
const_assert!(TARGET_BASE + FLOAT_WIDTH * AXES <= MOVE_VELOCITY_BASE);
const_assert!(MOVE_VELOCITY_BASE + FLOAT_WIDTH * AXES <= MOVE_ACCELERATION_BASE);
const_assert!(MOVE_ACCELERATION_BASE + FLOAT_WIDTH * AXES <= COMMAND_BASE);

#[inline]
const fn float_slot(base: u16, axis: AxisAddress) -> u16 {
    base + FLOAT_WIDTH * axis.index() as u16
}

#[inline]
const fn word_slot(base: u16, axis: AxisAddress) -> u16 {
    base + axis.index() as u16
}

pub const fn position(axis: AxisAddress) -> u16 {
    float_slot(POSITION_BASE, axis)
}

pub const fn velocity(axis: AxisAddress) -> u16 {
    float_slot(VELOCITY_BASE, axis)
}

pub const fn status(axis: AxisAddress) -> u16 {
    word_slot(STATUS_BASE, axis)
}

pub const fn target(axis: AxisAddress) -> u16 {
    float_slot(TARGET_BASE, axis)
}

pub const fn move_velocity(axis: AxisAddress) -> u16 {
    float_slot(MOVE_VELOCITY_BASE, axis)
}

pub const fn move_acceleration(axis: AxisAddress) -> u16 {
    float_slot(MOVE_ACCELERATION_BASE, axis)
}

pub const fn command(axis: AxisAddress) -> u16 {
    word_slot(COMMAND_BASE, axis)
}

/// Axis owning `addr` inside a per-axis bank starting at `base`, if any.
pub fn axis_in_bank(addr: u16, base: u16, stride: u16) -> Option<u8> {
    let offset = addr.checked_sub(base)?;
    if offset % stride != 0 {
        return None;
    }
    let index = offset / stride;
    (index < AXES).then_some(index as u8)
}
