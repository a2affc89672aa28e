//! Reporting utilities: residual tables and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::{ResidualPoint, TimingDataset};
use crate::error::TimingResult;
use crate::models::TimingModel;

/// Predicted period and residual for every measurement.
///
/// `phase` is taken from the first orbit, so residuals of a binary can be
/// plotted against orbital phase.
pub fn compute_residuals(dataset: &TimingDataset, model: &TimingModel) -> TimingResult<Vec<ResidualPoint>> {
    let predicted = model.evaluate(dataset.epochs())?;
    let first_orbit = model.orbits.first();
    Ok(dataset
        .iter()
        .zip(predicted)
        .map(|(m, predicted)| ResidualPoint {
            epoch: m.epoch,
            phase: first_orbit.map(|o| o.phase(m.epoch)),
            observed: m.period,
            predicted,
            residual: m.period - predicted,
            uncertainty: m.uncertainty,
        })
        .collect())
}

/// The `top_n` points with the largest normalized residual magnitude.
pub fn largest_residuals(points: &[ResidualPoint], top_n: usize) -> Vec<ResidualPoint> {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| b.normalized().abs().total_cmp(&a.normalized().abs()));
    sorted.truncate(top_n);
    sorted
}
