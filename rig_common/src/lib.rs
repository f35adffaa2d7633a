//! Rig Common Library
//!
//! Shared value types, constants and configuration loading for the carrier
//! rig workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - Rig-wide counts and timing defaults
//! - [`vector`] - `Vector4D` and the `Axis` channel selector
//! - [`rig`] - Axis addressing, motion limits and carrier configuration
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use rig_common::prelude::*;
//!
//! let home = Vector4D::new(0.0, 0.0, 1000.0, 0.0);
//! assert_eq!(home.get(Axis::Z), 1000.0);
//! ```

pub mod config;
pub mod consts;
pub mod prelude;
pub mod rig;
pub mod vector;
