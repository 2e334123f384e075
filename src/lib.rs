/*!
Position Based Fluids: a density-constraint particle fluid simulation
driven by a uniform-grid neighbor search inside an axis-aligned box.
*/

mod platform;
mod simulation;

pub use simulation::*;

pub use platform::start;
