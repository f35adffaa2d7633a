//! Rig-wide constants.
//!
//! Single source of truth for carrier/axis counts and the timing defaults
//! used when a configuration file leaves a field out.

/// Number of carriers on the rig.
pub const CARRIER_COUNT: usize = 4;

/// Number of axes per carrier (X, Y, Z, C).
pub const AXES_PER_CARRIER: usize = 4;

/// Total number of addressable axes on the rig.
pub const AXIS_COUNT: usize = CARRIER_COUNT * AXES_PER_CARRIER;

/// Pause between two status reads of a polling loop.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

/// Bound on an enable/disable wait.
pub const DEFAULT_AXIS_TIMEOUT_MS: u64 = 5_000;

/// Bound on a reference (homing) wait.
pub const DEFAULT_REFERENCE_TIMEOUT_MS: u64 = 60_000;

/// Bound on a motion-completion wait.
pub const DEFAULT_MOTION_TIMEOUT_MS: u64 = 60_000;

/// Bound on the system-init handshake.
pub const DEFAULT_INIT_TIMEOUT_MS: u64 = 10_000;

/// Pause between the two enable groups (carriers 0-1, then 2-3).
pub const DEFAULT_ENABLE_STAGGER_MS: u64 = 1_000;

/// Pause between the two disable groups.
pub const DEFAULT_DISABLE_STAGGER_MS: u64 = 250;

/// Upper bound of the global speed override.
pub const OVERRIDE_MAX: f32 = 2.0;

/// Largest override change accepted per call.
pub const OVERRIDE_STEP: f32 = 0.1;

/// Tolerance used by [`crate::vector::Vector4D::is_close`].
pub const VECTOR_EPSILON: f32 = 1e-3;
