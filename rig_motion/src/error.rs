//! Error taxonomy of the motion core.
//!
//! Every bounded wait and every transport failure surfaces to the immediate
//! caller as a [`RigError`]; nothing is swallowed or retried at this layer.

use crate::transport::TransportError;
use rig_common::config::ConfigError;
use rig_common::rig::AxisAddress;
use rig_common::vector::Axis;
use std::fmt;
use thiserror::Error;

/// State an axis wait was expecting when it expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisExpectation {
    Enabled,
    Disabled,
    Referenced,
}

impl fmt::Display for AxisExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::Referenced => "referenced",
        })
    }
}

/// Errors returned by protocol, axis, carrier and system operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RigError {
    /// Register exchange failed.
    #[error("Communication fault: {0}")]
    Protocol(#[from] TransportError),

    /// Axis did not reach the expected state within its bound.
    /// The carrier is left in its last observed state.
    #[error("{axis} did not become {expected} in time")]
    AxisTimeout {
        axis: AxisAddress,
        expected: AxisExpectation,
    },

    /// Carrier did not come to rest within the motion bound.
    /// Command registers are not reset; the caller decides to cancel or retry.
    #[error("Carrier {carrier} still moving after motion timeout")]
    MotionTimeout { carrier: usize },

    /// Controller never reported ready after the init request.
    #[error("System did not report ready after init request")]
    SystemInitTimeout,

    /// Absolute target outside the carrier's travel limits.
    #[error("Carrier {carrier}: target {target} outside travel of {axis}")]
    TargetOutOfTravel {
        carrier: usize,
        axis: Axis,
        target: f32,
    },

    /// Construction-time misconfiguration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
}

impl RigError {
    /// True for the bounded-wait variants.
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::AxisTimeout { .. } | Self::MotionTimeout { .. } | Self::SystemInitTimeout
        )
    }
}

/// Result alias used across the crate.
pub type RigResult<T> = Result<T, RigError>;
