//! Pulsar timing model components.
//!
//! - `spin`: intrinsic period and its derivative
//! - `orbit`: Keplerian orbits and their line-of-sight kinematics
//! - `sky`: annual Doppler term from a position offset
//! - `params`: explicit tags for every fittable field
//! - `model`: the composed `TimingModel`

pub mod model;
pub mod orbit;
pub mod params;
pub mod sky;
pub mod spin;

pub use model::*;
pub use orbit::*;
pub use params::*;
pub use sky::*;
pub use spin::*;
