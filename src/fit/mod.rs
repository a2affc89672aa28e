//! Fitting orchestration.
//!
//! Responsibilities:
//!
//! - map the model's free parameters to a flat vector and back (`selection`)
//! - expose the weighted residuals to the minimizer (`problem`)
//! - run Levenberg–Marquardt, commit the result, keep an undo history (`fitter`)
//! - optional per-evaluation instrumentation (`observer`)

pub mod fitter;
pub mod observer;
mod problem;
pub mod selection;

pub use fitter::*;
pub use observer::*;
pub use selection::*;
