//! Prelude module for common re-exports.
//!
//! ```rust
//! use rig_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::rig::{
    AxisAddress, CarrierAxes, CarrierConfig, LampConfig, MotionLimits, RigConfig, TimingConfig,
};

// ─── Values ─────────────────────────────────────────────────────────
pub use crate::vector::{Axis, Vector4D};

// ─── Rig Constants ──────────────────────────────────────────────────
pub use crate::consts::{AXES_PER_CARRIER, AXIS_COUNT, CARRIER_COUNT};
