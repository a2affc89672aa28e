//! Mathematical utilities: Kepler's equation and finite-difference Jacobians.

pub mod finite_diff;
pub mod kepler;

pub use finite_diff::*;
pub use kepler::*;
