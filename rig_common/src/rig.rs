//! Rig description: axis addressing, motion limits, carrier and timing
//! configuration.
//!
//! - `AxisAddress` - Range-checked rig-wide axis index
//! - `CarrierAxes` - The four addresses of one carrier
//! - `MotionLimits` - Per-carrier velocity/acceleration ceilings and travel
//! - `CarrierConfig` - Everything one carrier coordinator owns
//! - `TimingConfig` / `LampConfig` - Polling bounds and lamp input addresses
//! - `RigConfig` - Root of `rig.toml`

use crate::config::{ConfigError, SharedConfig};
use crate::consts::{
    AXIS_COUNT, CARRIER_COUNT, DEFAULT_AXIS_TIMEOUT_MS, DEFAULT_DISABLE_STAGGER_MS,
    DEFAULT_ENABLE_STAGGER_MS, DEFAULT_INIT_TIMEOUT_MS, DEFAULT_MOTION_TIMEOUT_MS,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_REFERENCE_TIMEOUT_MS,
};
use crate::vector::{Axis, Vector4D};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tracing::warn;

/// Rig-wide axis index, range-checked to `[0, AXIS_COUNT)`.
///
/// Register offsets of an axis are derived from this index, so each index
/// maps to exactly one register group on the motion controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct AxisAddress(u8);

impl AxisAddress {
    /// # Errors
    /// Returns `ConfigError::ValidationError` if `index >= AXIS_COUNT`.
    pub fn new(index: u8) -> Result<Self, ConfigError> {
        if (index as usize) < AXIS_COUNT {
            Ok(Self(index))
        } else {
            Err(ConfigError::ValidationError(format!(
                "axis index {index} out of range (max {})",
                AXIS_COUNT - 1
            )))
        }
    }

    /// Raw index.
    #[inline]
    pub const fn index(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for AxisAddress {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AxisAddress> for u8 {
    fn from(addr: AxisAddress) -> Self {
        addr.0
    }
}

impl fmt::Display for AxisAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "axis#{}", self.0)
    }
}

/// Axis addresses of one carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierAxes {
    pub x: AxisAddress,
    pub y: AxisAddress,
    pub z: AxisAddress,
    pub c: AxisAddress,
}

impl CarrierAxes {
    /// Address of one channel.
    pub const fn get(&self, axis: Axis) -> AxisAddress {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
            Axis::C => self.c,
        }
    }

    /// Addresses in X, Y, Z, C order.
    pub const fn to_array(&self) -> [AxisAddress; 4] {
        [self.x, self.y, self.z, self.c]
    }

    /// Carrier `n` with consecutive indices `4n..4n+4`.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if the indices leave the rig range.
    pub fn consecutive(carrier: usize) -> Result<Self, ConfigError> {
        let base = u8::try_from(carrier * 4).map_err(|_| {
            ConfigError::ValidationError(format!("carrier {carrier} out of range"))
        })?;
        Ok(Self {
            x: AxisAddress::new(base)?,
            y: AxisAddress::new(base.saturating_add(1))?,
            z: AxisAddress::new(base.saturating_add(2))?,
            c: AxisAddress::new(base.saturating_add(3))?,
        })
    }
}

/// Velocity/acceleration ceilings and positional travel of one carrier.
///
/// Configured once at startup; never mutated during operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MotionLimits {
    /// Per-channel velocity ceiling.
    pub max_velocity: Vector4D,
    /// Per-channel acceleration ceiling.
    pub max_acceleration: Vector4D,
    /// Lower end of travel.
    pub min_position: Vector4D,
    /// Upper end of travel.
    pub max_position: Vector4D,
}

impl MotionLimits {
    /// Componentwise clamp of `requested` into `[0, max_velocity]`.
    #[must_use]
    pub fn clamp_velocity(&self, requested: Vector4D) -> Vector4D {
        requested.max(Vector4D::ZERO).min(self.max_velocity)
    }

    /// Componentwise clamp of `requested` into `[0, max_acceleration]`.
    #[must_use]
    pub fn clamp_acceleration(&self, requested: Vector4D) -> Vector4D {
        requested.max(Vector4D::ZERO).min(self.max_acceleration)
    }

    /// True if `value` lies within the travel of `axis`.
    pub fn axis_within_travel(&self, axis: Axis, value: f32) -> bool {
        value >= self.min_position.get(axis) && value <= self.max_position.get(axis)
    }

    /// First channel of `point` outside travel, if any.
    pub fn outside_travel(&self, point: &Vector4D) -> Option<Axis> {
        Axis::ALL
            .into_iter()
            .find(|&axis| !self.axis_within_travel(axis, point.get(axis)))
    }

    /// # Errors
    /// Returns `ConfigError::ValidationError` on non-finite values,
    /// non-positive ceilings or an inverted travel range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, v) in [
            ("max_velocity", &self.max_velocity),
            ("max_acceleration", &self.max_acceleration),
            ("min_position", &self.min_position),
            ("max_position", &self.max_position),
        ] {
            if !v.is_finite() {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be finite, got {v}"
                )));
            }
        }
        for axis in Axis::ALL {
            if self.max_velocity.get(axis) <= 0.0 || self.max_acceleration.get(axis) <= 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "velocity and acceleration ceilings of {axis} must be positive"
                )));
            }
            if self.min_position.get(axis) > self.max_position.get(axis) {
                return Err(ConfigError::ValidationError(format!(
                    "travel of {axis} is inverted: {} > {}",
                    self.min_position.get(axis),
                    self.max_position.get(axis)
                )));
            }
        }
        Ok(())
    }
}

impl Default for MotionLimits {
    fn default() -> Self {
        Self {
            max_velocity: Vector4D::new(500.0, 500.0, 500.0, 360.0),
            max_acceleration: Vector4D::new(2000.0, 2000.0, 2000.0, 1440.0),
            min_position: Vector4D::new(-10.0, -10.0, -10.0, -720.0),
            max_position: Vector4D::new(1500.0, 1500.0, 1500.0, 720.0),
        }
    }
}

/// Configuration owned by one carrier coordinator.
///
/// # TOML Example
///
/// ```toml
/// [[carriers]]
/// axes = { x = 0, y = 1, z = 2, c = 3 }
/// default_velocity = { x = 100.0, y = 100.0, z = 100.0, c = 90.0 }
/// default_acceleration = { x = 500.0, y = 500.0, z = 500.0, c = 360.0 }
/// home = { z = 1000.0 }
/// load = { x = 500.0, y = 500.0, z = 1000.0 }
/// safety_height = 1000.0
///
/// [carriers.limits]
/// max_velocity = { x = 500.0, y = 500.0, z = 500.0, c = 360.0 }
/// max_acceleration = { x = 2000.0, y = 2000.0, z = 2000.0, c = 1440.0 }
/// min_position = { x = -10.0, y = -10.0, z = -10.0, c = -720.0 }
/// max_position = { x = 1500.0, y = 1500.0, z = 1500.0, c = 720.0 }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierConfig {
    /// Rig-wide axis indices, fixed at construction.
    pub axes: CarrierAxes,
    /// Ceilings and travel.
    #[serde(default)]
    pub limits: MotionLimits,
    /// Velocity used when a move does not specify one.
    default_velocity: Vector4D,
    /// Acceleration used for every move.
    default_acceleration: Vector4D,
    /// Position of `go_home`.
    home: Vector4D,
    /// Position of `go_load`.
    load: Vector4D,
    /// Minimum Z clearance for horizontal travel.
    safety_height: f32,
}

impl CarrierConfig {
    /// Build a carrier configuration, clamping the defaults against `limits`.
    pub fn new(
        axes: CarrierAxes,
        limits: MotionLimits,
        default_velocity: Vector4D,
        default_acceleration: Vector4D,
        home: Vector4D,
        load: Vector4D,
        safety_height: f32,
    ) -> Self {
        let mut config = Self {
            axes,
            limits,
            default_velocity,
            default_acceleration,
            home,
            load,
            safety_height,
        };
        config.set_default_velocity(default_velocity);
        config.set_default_acceleration(default_acceleration);
        config
    }

    /// Carrier `n` on consecutive axis indices with the default limits.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if `carrier` is out of range.
    pub fn consecutive(carrier: usize) -> Result<Self, ConfigError> {
        Ok(Self::new(
            CarrierAxes::consecutive(carrier)?,
            MotionLimits::default(),
            Vector4D::new(100.0, 100.0, 100.0, 90.0),
            Vector4D::new(500.0, 500.0, 500.0, 360.0),
            Vector4D::new(0.0, 0.0, 1000.0, 0.0),
            Vector4D::new(500.0, 500.0, 1000.0, 0.0),
            1000.0,
        ))
    }

    pub fn default_velocity(&self) -> Vector4D {
        self.default_velocity
    }

    pub fn default_acceleration(&self) -> Vector4D {
        self.default_acceleration
    }

    pub fn home(&self) -> Vector4D {
        self.home
    }

    pub fn load(&self) -> Vector4D {
        self.load
    }

    pub fn safety_height(&self) -> f32 {
        self.safety_height
    }

    /// Store `requested` clamped into `[0, max_velocity]`. Never fails.
    pub fn set_default_velocity(&mut self, requested: Vector4D) {
        let clamped = self.limits.clamp_velocity(requested);
        if !clamped.is_close(&requested) {
            warn!("Default velocity {} clamped to {}", requested, clamped);
        }
        self.default_velocity = clamped;
    }

    /// Store `requested` clamped into `[0, max_acceleration]`. Never fails.
    pub fn set_default_acceleration(&mut self, requested: Vector4D) {
        let clamped = self.limits.clamp_acceleration(requested);
        if !clamped.is_close(&requested) {
            warn!("Default acceleration {} clamped to {}", requested, clamped);
        }
        self.default_acceleration = clamped;
    }

    /// # Errors
    /// Returns `ConfigError::ValidationError` if `position` leaves travel.
    pub fn set_home(&mut self, position: Vector4D) -> Result<(), ConfigError> {
        self.check_travel("home", &position)?;
        self.home = position;
        Ok(())
    }

    /// # Errors
    /// Returns `ConfigError::ValidationError` if `position` leaves travel.
    pub fn set_load(&mut self, position: Vector4D) -> Result<(), ConfigError> {
        self.check_travel("load", &position)?;
        self.load = position;
        Ok(())
    }

    /// # Errors
    /// Returns `ConfigError::ValidationError` if `height` leaves Z travel.
    pub fn set_safety_height(&mut self, height: f32) -> Result<(), ConfigError> {
        if !height.is_finite() || !self.limits.axis_within_travel(Axis::Z, height) {
            return Err(ConfigError::ValidationError(format!(
                "safety height {height} outside Z travel"
            )));
        }
        self.safety_height = height;
        Ok(())
    }

    fn check_travel(&self, name: &str, position: &Vector4D) -> Result<(), ConfigError> {
        if let Some(axis) = self.limits.outside_travel(position) {
            return Err(ConfigError::ValidationError(format!(
                "{name} position {position} outside travel of {axis}"
            )));
        }
        Ok(())
    }

    /// Validate limits, stored positions and safety height.
    ///
    /// Defaults loaded from a file are clamped, not rejected.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` on the first violation.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.limits.validate()?;
        self.check_travel("home", &self.home)?;
        self.check_travel("load", &self.load)?;
        self.set_safety_height(self.safety_height)?;
        self.set_default_velocity(self.default_velocity);
        self.set_default_acceleration(self.default_acceleration);
        Ok(())
    }
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}
fn default_axis_timeout_ms() -> u64 {
    DEFAULT_AXIS_TIMEOUT_MS
}
fn default_reference_timeout_ms() -> u64 {
    DEFAULT_REFERENCE_TIMEOUT_MS
}
fn default_motion_timeout_ms() -> u64 {
    DEFAULT_MOTION_TIMEOUT_MS
}
fn default_init_timeout_ms() -> u64 {
    DEFAULT_INIT_TIMEOUT_MS
}
fn default_enable_stagger_ms() -> u64 {
    DEFAULT_ENABLE_STAGGER_MS
}
fn default_disable_stagger_ms() -> u64 {
    DEFAULT_DISABLE_STAGGER_MS
}

/// Polling interval, wait bounds and enable/disable stagger, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_axis_timeout_ms")]
    pub axis_timeout_ms: u64,
    #[serde(default = "default_reference_timeout_ms")]
    pub reference_timeout_ms: u64,
    #[serde(default = "default_motion_timeout_ms")]
    pub motion_timeout_ms: u64,
    #[serde(default = "default_init_timeout_ms")]
    pub init_timeout_ms: u64,
    #[serde(default = "default_enable_stagger_ms")]
    pub enable_stagger_ms: u64,
    #[serde(default = "default_disable_stagger_ms")]
    pub disable_stagger_ms: u64,
}

impl TimingConfig {
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub const fn axis_timeout(&self) -> Duration {
        Duration::from_millis(self.axis_timeout_ms)
    }

    pub const fn reference_timeout(&self) -> Duration {
        Duration::from_millis(self.reference_timeout_ms)
    }

    pub const fn motion_timeout(&self) -> Duration {
        Duration::from_millis(self.motion_timeout_ms)
    }

    pub const fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }

    pub const fn enable_stagger(&self) -> Duration {
        Duration::from_millis(self.enable_stagger_ms)
    }

    pub const fn disable_stagger(&self) -> Duration {
        Duration::from_millis(self.disable_stagger_ms)
    }

    /// # Errors
    /// Returns `ConfigError::ValidationError` if the poll interval or any
    /// timeout is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("poll_interval_ms", self.poll_interval_ms),
            ("axis_timeout_ms", self.axis_timeout_ms),
            ("reference_timeout_ms", self.reference_timeout_ms),
            ("motion_timeout_ms", self.motion_timeout_ms),
            ("init_timeout_ms", self.init_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be greater than 0"
                )));
            }
        }
        Ok(())
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            axis_timeout_ms: DEFAULT_AXIS_TIMEOUT_MS,
            reference_timeout_ms: DEFAULT_REFERENCE_TIMEOUT_MS,
            motion_timeout_ms: DEFAULT_MOTION_TIMEOUT_MS,
            init_timeout_ms: DEFAULT_INIT_TIMEOUT_MS,
            enable_stagger_ms: DEFAULT_ENABLE_STAGGER_MS,
            disable_stagger_ms: DEFAULT_DISABLE_STAGGER_MS,
        }
    }
}

/// Discrete-input addresses of the status lamp tower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LampConfig {
    pub red: u16,
    pub orange: u16,
    pub green: u16,
    pub buzzer: u16,
}

impl Default for LampConfig {
    fn default() -> Self {
        Self {
            red: 0,
            orange: 1,
            green: 2,
            buzzer: 3,
        }
    }
}

/// Root of `rig.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigConfig {
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub lamps: LampConfig,
    pub carriers: Vec<CarrierConfig>,
}

impl RigConfig {
    /// Validate the whole rig.
    ///
    /// # Validation Rules
    /// 1. Exactly `CARRIER_COUNT` carriers
    /// 2. Every axis index unique across the rig
    /// 3. Per-carrier limits, positions and safety height (see [`CarrierConfig::validate`])
    /// 4. Non-zero poll interval and timeouts
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` on the first violation.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.timing.validate()?;

        if self.carriers.len() != CARRIER_COUNT {
            return Err(ConfigError::ValidationError(format!(
                "expected {CARRIER_COUNT} carriers, got {}",
                self.carriers.len()
            )));
        }

        let mut seen = HashSet::new();
        for (idx, carrier) in self.carriers.iter_mut().enumerate() {
            for addr in carrier.axes.to_array() {
                if !seen.insert(addr) {
                    return Err(ConfigError::ValidationError(format!(
                        "{addr} of carrier {idx} is already assigned"
                    )));
                }
            }
            carrier.validate().map_err(|e| match e {
                ConfigError::ValidationError(msg) => {
                    ConfigError::ValidationError(format!("carrier {idx}: {msg}"))
                }
                other => other,
            })?;
        }
        Ok(())
    }
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            shared: SharedConfig::default(),
            timing: TimingConfig::default(),
            lamps: LampConfig::default(),
            carriers: (0..CARRIER_COUNT)
                .filter_map(|n| CarrierConfig::consecutive(n).ok())
                .collect(),
        }
    }
}
