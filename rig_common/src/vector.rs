//! Four-channel value type used for carrier positions, velocities,
//! accelerations and limits.
//!
//! All arithmetic is componentwise. Equality goes through
//! [`Vector4D::approx_eq`], since values that crossed a register round trip
//! are not expected to be bit-identical to what was commanded.

use crate::consts::VECTOR_EPSILON;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Channel selector for one carrier axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Axis {
    /// Horizontal X translation.
    X = 0,
    /// Horizontal Y translation.
    Y = 1,
    /// Vertical Z translation.
    Z = 2,
    /// Rotation about Z.
    C = 3,
}

impl Axis {
    /// All channels in command-issue order.
    pub const ALL: [Axis; 4] = [Axis::X, Axis::Y, Axis::Z, Axis::C];

    /// Channels that travel horizontally and therefore need Z clearance.
    pub const HORIZONTAL: [Axis; 3] = [Axis::X, Axis::Y, Axis::C];

    /// Position of this channel inside a carrier.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Channel letter.
    pub const fn as_str(self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
            Axis::C => "C",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// (X, Y, Z, C) tuple of single-precision values.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Vector4D {
    /// X channel.
    #[serde(default)]
    pub x: f32,
    /// Y channel.
    #[serde(default)]
    pub y: f32,
    /// Z channel.
    #[serde(default)]
    pub z: f32,
    /// C channel.
    #[serde(default)]
    pub c: f32,
}

impl Vector4D {
    /// All channels zero.
    pub const ZERO: Self = Self::splat(0.0);

    pub const fn new(x: f32, y: f32, z: f32, c: f32) -> Self {
        Self { x, y, z, c }
    }

    /// Same value on every channel.
    pub const fn splat(v: f32) -> Self {
        Self::new(v, v, v, v)
    }

    /// Value of one channel.
    #[inline]
    pub const fn get(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
            Axis::C => self.c,
        }
    }

    /// Copy with one channel replaced.
    #[must_use]
    pub const fn with(mut self, axis: Axis, value: f32) -> Self {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
            Axis::C => self.c = value,
        }
        self
    }

    /// Build from a per-channel function, called in X, Y, Z, C order.
    pub fn from_fn(mut f: impl FnMut(Axis) -> f32) -> Self {
        Self::new(f(Axis::X), f(Axis::Y), f(Axis::Z), f(Axis::C))
    }

    /// Apply `f` to every channel.
    #[must_use]
    pub fn map(self, mut f: impl FnMut(f32) -> f32) -> Self {
        Self::new(f(self.x), f(self.y), f(self.z), f(self.c))
    }

    /// Combine two vectors channel by channel.
    #[must_use]
    pub fn zip_with(self, other: Self, mut f: impl FnMut(f32, f32) -> f32) -> Self {
        Self::new(
            f(self.x, other.x),
            f(self.y, other.y),
            f(self.z, other.z),
            f(self.c, other.c),
        )
    }

    /// Componentwise minimum.
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        self.zip_with(other, f32::min)
    }

    /// Componentwise maximum.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        self.zip_with(other, f32::max)
    }

    /// Values as an array in X, Y, Z, C order.
    pub const fn to_array(self) -> [f32; 4] {
        [self.x, self.y, self.z, self.c]
    }

    /// True if every channel is finite.
    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    /// True if every channel of `self` differs from `other` by at most `epsilon`.
    pub fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .all(|(a, b)| (a - b).abs() <= epsilon)
    }

    /// [`approx_eq`](Self::approx_eq) with the rig-wide [`VECTOR_EPSILON`].
    pub fn is_close(&self, other: &Self) -> bool {
        self.approx_eq(other, VECTOR_EPSILON)
    }
}

impl From<[f32; 4]> for Vector4D {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl Add for Vector4D {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.zip_with(rhs, |a, b| a + b)
    }
}

impl Sub for Vector4D {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.zip_with(rhs, |a, b| a - b)
    }
}

impl Mul<f32> for Vector4D {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        self.map(|v| v * rhs)
    }
}

impl Div<f32> for Vector4D {
    type Output = Self;

    fn div(self, rhs: f32) -> Self {
        self.map(|v| v / rhs)
    }
}

impl Neg for Vector4D {
    type Output = Self;

    fn neg(self) -> Self {
        self.map(|v| -v)
    }
}

impl fmt::Display for Vector4D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(X {:.3}, Y {:.3}, Z {:.3}, C {:.3})",
            self.x, self.y, self.z, self.c
        )
    }
}
