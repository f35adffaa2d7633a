//! Software stand-ins for the motion and I/O controllers.
//!
//! Lets the full motion stack run without hardware. Motion is step-based
//! (one step per status read) so sequences are reproducible in tests.

mod axis;
mod controller;
mod io;

pub use controller::{CommandRecord, SimulatedController, SimulationProfile};
pub use io::SimulatedIo;
