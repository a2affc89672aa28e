//! Shared domain types.
//!
//! This module defines:
//!
//! - input configuration enums (`TimeUnit`, `Weighting`)
//! - the validated measurement container (`TimingDataset`)
//! - per-measurement fit outputs (`ResidualPoint`)

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{TimingError, TimingResult};

/// Unit shared by epochs, `pepoch`, `t0` and `pb`.
///
/// `asini` is measured in light-time of the same unit (light-seconds when
/// epochs are in seconds), which keeps the orbital velocity unit-free. Only the
/// annual Doppler term needs the absolute length of the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[default]
    Seconds,
    Days,
}

impl TimeUnit {
    /// Length of one unit in SI seconds.
    pub fn seconds(self) -> f64 {
        match self {
            TimeUnit::Seconds => 1.0,
            TimeUnit::Days => 86_400.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeUnit::Seconds => "s",
            TimeUnit::Days => "d",
        }
    }
}

/// How residuals are scaled before they reach the minimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Weighting {
    /// Divide each residual by its measurement uncertainty.
    #[default]
    Uncertainty,
    /// Use raw residuals.
    Uniform,
}

/// One period measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub epoch: f64,
    pub period: f64,
    pub uncertainty: f64,
}

/// Irregularly sampled `(epoch, period, uncertainty)` triples.
///
/// Invariants (checked on construction, immutable afterwards):
/// - all three columns have the same, non-zero length
/// - every value is finite
/// - every uncertainty is strictly positive
#[derive(Debug, Clone, PartialEq)]
pub struct TimingDataset {
    epochs: Vec<f64>,
    periods: Vec<f64>,
    uncertainties: Vec<f64>,
}

impl TimingDataset {
    pub fn new(epochs: Vec<f64>, periods: Vec<f64>, uncertainties: Vec<f64>) -> TimingResult<Self> {
        if epochs.len() != periods.len() || epochs.len() != uncertainties.len() {
            return Err(TimingError::invalid_data(format!(
                "column lengths differ (epochs={}, periods={}, uncertainties={})",
                epochs.len(),
                periods.len(),
                uncertainties.len()
            )));
        }
        if epochs.is_empty() {
            return Err(TimingError::invalid_data("dataset is empty"));
        }

        for (i, ((&t, &p), &e)) in epochs.iter().zip(&periods).zip(&uncertainties).enumerate() {
            if !(t.is_finite() && p.is_finite()) {
                return Err(TimingError::invalid_data(format!(
                    "non-finite epoch or period at index {i}"
                )));
            }
            // Uncertainties are divisors in the weighted residuals.
            if !(e.is_finite() && e > 0.0) {
                return Err(TimingError::invalid_data(format!(
                    "uncertainty at index {i} must be finite and > 0, got {e}"
                )));
            }
        }

        Ok(Self {
            epochs,
            periods,
            uncertainties,
        })
    }

    pub fn from_measurements<I>(measurements: I) -> TimingResult<Self>
    where
        I: IntoIterator<Item = Measurement>,
    {
        let mut epochs = Vec::new();
        let mut periods = Vec::new();
        let mut uncertainties = Vec::new();
        for m in measurements {
            epochs.push(m.epoch);
            periods.push(m.period);
            uncertainties.push(m.uncertainty);
        }
        Self::new(epochs, periods, uncertainties)
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn epochs(&self) -> &[f64] {
        &self.epochs
    }

    pub fn periods(&self) -> &[f64] {
        &self.periods
    }

    pub fn uncertainties(&self) -> &[f64] {
        &self.uncertainties
    }

    pub fn iter(&self) -> impl Iterator<Item = Measurement> + '_ {
        self.epochs
            .iter()
            .zip(&self.periods)
            .zip(&self.uncertainties)
            .map(|((&epoch, &period), &uncertainty)| Measurement {
                epoch,
                period,
                uncertainty,
            })
    }

    /// `(first, last)` epoch in time order.
    pub fn epoch_range(&self) -> (f64, f64) {
        let min = self.epochs.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.epochs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (min, max)
    }
}

/// Per-measurement fit output, read by reporting and export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidualPoint {
    pub epoch: f64,
    /// Phase of the first orbit in `[0, 1)`; `None` for an isolated pulsar.
    pub phase: Option<f64>,
    pub observed: f64,
    pub predicted: f64,
    pub residual: f64,
    pub uncertainty: f64,
}

impl ResidualPoint {
    /// Residual in units of its uncertainty.
    pub fn normalized(&self) -> f64 {
        self.residual / self.uncertainty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_rejects_zero_uncertainty() {
        let err = TimingDataset::new(vec![0.0, 1.0], vec![0.01, 0.01], vec![1e-6, 0.0]).unwrap_err();
        assert!(matches!(err, TimingError::InvalidData(_)), "got {err:?}");
    }

    #[test]
    fn dataset_rejects_mismatched_and_empty_columns() {
        assert!(TimingDataset::new(vec![0.0], vec![0.01, 0.02], vec![1e-6]).is_err());
        assert!(TimingDataset::new(vec![], vec![], vec![]).is_err());
    }

    #[test]
    fn dataset_rejects_non_finite_values() {
        assert!(TimingDataset::new(vec![f64::NAN], vec![0.01], vec![1e-6]).is_err());
        assert!(TimingDataset::new(vec![0.0], vec![0.01], vec![f64::INFINITY]).is_err());
    }

    #[test]
    fn measurements_round_through_columns() {
        let ms = [
            Measurement { epoch: 3.0, period: 0.5, uncertainty: 0.1 },
            Measurement { epoch: 1.0, period: 0.6, uncertainty: 0.2 },
        ];
        let data = TimingDataset::from_measurements(ms).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.iter().collect::<Vec<_>>(), ms.to_vec());
        assert_eq!(data.epoch_range(), (1.0, 3.0));
    }

    #[test]
    fn day_unit_is_86400_seconds() {
        assert_eq!(TimeUnit::Days.seconds(), 86_400.0);
        assert_eq!(TimeUnit::Seconds.seconds(), 1.0);
    }
}
