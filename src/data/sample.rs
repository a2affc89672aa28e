//! Synthetic timing datasets and perturbed starting guesses.
//!
//! A known `TimingModel` is evaluated on a (optionally jittered) grid of
//! epochs and Gaussian noise is added to the periods. Everything is driven by
//! a seeded `StdRng`, so the same config always yields the same dataset.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::TimingDataset;
use crate::error::{TimingError, TimingResult};
use crate::fit::ParameterSelection;
use crate::models::{OrbitField, ParamId, TimingModel};

#[derive(Debug, Clone, PartialEq)]
pub struct SampleConfig {
    pub n_epochs: usize,
    /// First epoch of the grid.
    pub start: f64,
    /// Distance from the first to the last grid epoch.
    pub span: f64,
    /// Standard deviation of the noise added to each period.
    pub noise: f64,
    /// Uncertainty reported for each measurement.
    pub uncertainty: f64,
    pub seed: u64,
    /// Epoch jitter as a fraction of the grid spacing, in `[0, 1)`.
    pub jitter: f64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            n_epochs: 50,
            start: 0.0,
            span: 36_000.0,
            noise: 0.0,
            uncertainty: 1e-6,
            seed: 42,
            jitter: 0.0,
        }
    }
}

impl SampleConfig {
    fn validate(&self) -> TimingResult<()> {
        if self.n_epochs == 0 {
            return Err(TimingError::invalid_data("sample needs at least one epoch"));
        }
        if !(self.start.is_finite() && self.span.is_finite() && self.span >= 0.0) {
            return Err(TimingError::invalid_data("sample span must be finite and >= 0"));
        }
        if !(self.noise.is_finite() && self.noise >= 0.0) {
            return Err(TimingError::invalid_data("noise must be finite and >= 0"));
        }
        if !(0.0..1.0).contains(&self.jitter) {
            return Err(TimingError::invalid_data("jitter must lie in [0, 1)"));
        }
        // `uncertainty` is checked by `TimingDataset::new`.
        Ok(())
    }
}

/// Sample `model` according to `config`.
pub fn generate_dataset(model: &TimingModel, config: &SampleConfig) -> TimingResult<TimingDataset> {
    config.validate()?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| TimingError::invalid_data(format!("noise distribution error: {e}")))?;

    let step = if config.n_epochs > 1 {
        config.span / (config.n_epochs - 1) as f64
    } else {
        0.0
    };

    let mut epochs: Vec<f64> = (0..config.n_epochs)
        .map(|i| {
            let shift = if config.jitter > 0.0 {
                rng.gen_range(-0.5..0.5) * config.jitter * step
            } else {
                0.0
            };
            config.start + i as f64 * step + shift
        })
        .collect();
    // Jitter below one grid spacing keeps the order, but be explicit.
    epochs.sort_by(f64::total_cmp);

    let periods = model
        .evaluate(&epochs)?
        .into_iter()
        .map(|p| p + config.noise * normal.sample(&mut rng))
        .collect();

    TimingDataset::new(epochs, periods, vec![config.uncertainty; config.n_epochs])
}

/// Copy of `model` with every free parameter moved by up to `fraction` of
/// its magnitude, in a random direction.
///
/// Zero-valued parameters stay at zero, except `t0`, which is shifted by up to
/// `fraction` of its orbit's period. Eccentricities stay inside `[0, 1)`.
pub fn perturb_free_parameters(
    model: &TimingModel,
    selection: &ParameterSelection,
    fraction: f64,
    seed: u64,
) -> TimingResult<TimingModel> {
    if !(fraction.is_finite() && fraction >= 0.0) {
        return Err(TimingError::invalid_data("perturbation fraction must be finite and >= 0"));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut perturbed = model.clone();

    for id in selection.free_ids() {
        let value = model.get(id)?;
        let u: f64 = rng.gen_range(-1.0..=1.0);
        let moved = match id {
            ParamId::Orbit(i, OrbitField::T0) if value == 0.0 => {
                u * fraction * model.get(ParamId::Orbit(i, OrbitField::Pb))?
            }
            ParamId::Orbit(_, OrbitField::Ecc) => (value * (1.0 + u * fraction)).clamp(0.0, 0.99),
            _ => value * (1.0 + u * fraction),
        };
        perturbed.set(id, moved)?;
    }

    Ok(perturbed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrbitalElements, Scope, SpinParameters};

    fn binary() -> TimingModel {
        TimingModel::isolated(SpinParameters::new(0.01, 0.0, 0.0))
            .with_orbit(OrbitalElements::circular(3600.0, 2.0, 0.0))
    }

    #[test]
    fn noiseless_sample_matches_model() {
        let model = binary();
        let data = generate_dataset(&model, &SampleConfig::default()).unwrap();
        assert_eq!(data.len(), 50);
        let (first, last) = data.epoch_range();
        assert_eq!(first, 0.0);
        assert!((last - 36_000.0).abs() < 1e-9);
        let predicted = model.evaluate(data.epochs()).unwrap();
        assert_eq!(data.periods(), predicted.as_slice());
    }

    #[test]
    fn same_seed_same_sample() {
        let model = binary();
        let config = SampleConfig {
            noise: 1e-7,
            jitter: 0.5,
            ..SampleConfig::default()
        };
        let a = generate_dataset(&model, &config).unwrap();
        let b = generate_dataset(&model, &config).unwrap();
        assert_eq!(a, b);

        let c = generate_dataset(&model, &SampleConfig { seed: 7, ..config }).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn jittered_epochs_stay_sorted() {
        let config = SampleConfig {
            jitter: 0.9,
            ..SampleConfig::default()
        };
        let data = generate_dataset(&binary(), &config).unwrap();
        assert!(data.epochs().windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn bad_configs_are_rejected() {
        let model = binary();
        for config in [
            SampleConfig { n_epochs: 0, ..SampleConfig::default() },
            SampleConfig { jitter: 1.0, ..SampleConfig::default() },
            SampleConfig { noise: -1.0, ..SampleConfig::default() },
            SampleConfig { uncertainty: 0.0, ..SampleConfig::default() },
        ] {
            assert!(matches!(
                generate_dataset(&model, &config),
                Err(TimingError::InvalidData(_))
            ));
        }
    }

    #[test]
    fn perturbation_moves_only_free_parameters() {
        let model = binary();
        let mut sel = ParameterSelection::for_model(&model);
        sel.mark_free(Scope::Orbit(0), "pb").unwrap();
        sel.mark_free(Scope::Orbit(0), "t0").unwrap();

        let guess = perturb_free_parameters(&model, &sel, 0.05, 1).unwrap();
        assert_eq!(guess.spin, model.spin);
        assert_eq!(guess.orbits[0].asini, model.orbits[0].asini);
        assert!((guess.orbits[0].pb / 3600.0 - 1.0).abs() <= 0.05);
        assert!(guess.orbits[0].t0.abs() <= 0.05 * 3600.0);
    }
}
