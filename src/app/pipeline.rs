//! Shared fit pipeline used by the `fit` and `demo` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! model + free list -> fit -> optional revert -> residuals
//!
//! The commands then only deal with where the data comes from and how the
//! result is printed or exported.

use crate::data::{SampleConfig, generate_dataset, perturb_free_parameters};
use crate::domain::{ResidualPoint, TimingDataset};
use crate::error::TimingResult;
use crate::fit::{FitOptions, FitReport, Fitter, ParameterSelection, TracingObserver};
use crate::models::{OrbitalElements, ParamId, Scope, SpinParameters, TimingModel};
use crate::report::compute_residuals;

/// All computed outputs of a single fit.
#[derive(Debug, Clone)]
pub struct FitRun {
    pub report: FitReport,
    /// The live model after the fit (the starting model if it was reverted).
    pub model: TimingModel,
    pub residuals: Vec<ResidualPoint>,
    pub reverted: bool,
}

/// Outputs of `porb demo`.
#[derive(Debug, Clone)]
pub struct DemoRun {
    pub truth: TimingModel,
    pub guess: TimingModel,
    pub dataset: TimingDataset,
    pub fit: FitRun,
}

/// Fit `free` parameters of `model` to `dataset`.
pub fn run_fit(
    dataset: &TimingDataset,
    model: TimingModel,
    free: &[ParamId],
    options: FitOptions,
    revert_on_warning: bool,
) -> TimingResult<FitRun> {
    let mut fitter = Fitter::new(dataset, model)
        .with_options(options)
        .with_observer(TracingObserver::new());
    for &id in free {
        fitter.selection_mut().set_free(id, true)?;
    }

    let report = fitter.fit()?;
    let reverted = revert_on_warning && report.warning.is_some();
    if reverted {
        tracing::info!("reverting non-converged fit");
        fitter.revert()?;
    }

    let model = fitter.into_model();
    let residuals = compute_residuals(dataset, &model)?;
    Ok(FitRun {
        report,
        model,
        residuals,
        reverted,
    })
}

/// Circular 1 h binary with a 10 ms pulsar; optionally an eccentric outer orbit.
pub fn demo_model(triple: bool) -> TimingModel {
    let model = TimingModel::isolated(SpinParameters::new(0.01, 0.0, 0.0))
        .with_orbit(OrbitalElements::circular(3600.0, 2.0, 0.0));
    if triple {
        model.with_orbit(OrbitalElements::new(20_000.0, 0.5, 2_000.0, 0.3, 1.0))
    } else {
        model
    }
}

/// Parameters the demo fits.
pub fn demo_free_parameters(model: &TimingModel) -> TimingResult<Vec<ParamId>> {
    let mut free = vec![model.resolve(Scope::Spin, "p0")?];
    for name in ["pb", "asini", "t0"] {
        free.push(model.resolve(Scope::Orbit(0), name)?);
    }
    if model.orbits.len() > 1 {
        for name in ["pb", "asini"] {
            free.push(model.resolve(Scope::Orbit(1), name)?);
        }
    }
    Ok(free)
}

/// Simulate the demo system, perturb its free parameters and fit them back.
pub fn run_demo(
    sample: &SampleConfig,
    triple: bool,
    perturb: f64,
    perturb_seed: u64,
    options: FitOptions,
    revert_on_warning: bool,
) -> TimingResult<DemoRun> {
    let truth = demo_model(triple);
    let dataset = generate_dataset(&truth, sample)?;
    let free = demo_free_parameters(&truth)?;

    let mut selection = ParameterSelection::for_model(&truth);
    for &id in &free {
        selection.set_free(id, true)?;
    }
    let guess = perturb_free_parameters(&truth, &selection, perturb, perturb_seed)?;

    let fit = run_fit(&dataset, guess.clone(), &free, options, revert_on_warning)?;
    Ok(DemoRun {
        truth,
        guess,
        dataset,
        fit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TimingError;

    #[test]
    fn unknown_free_parameter_is_rejected() {
        let model = demo_model(false);
        let data = generate_dataset(&model, &SampleConfig::default()).unwrap();
        let free = ["orbit[1].pb".parse::<ParamId>().unwrap()];
        let err = run_fit(&data, model, &free, FitOptions::default(), false).unwrap_err();
        assert!(matches!(err, TimingError::UnknownParameter { .. }));
    }

    #[test]
    fn demo_recovers_binary() {
        let run = run_demo(&SampleConfig::default(), false, 0.01, 3, FitOptions::default(), false).unwrap();
        assert!(run.fit.report.converged, "termination: {}", run.fit.report.termination);
        assert!(!run.fit.reverted);
        let fitted = &run.fit.model.orbits[0];
        assert!((fitted.pb - 3600.0).abs() < 0.36);
        assert!((fitted.asini - 2.0).abs() < 2e-4);
        assert_eq!(run.fit.residuals.len(), run.dataset.len());
    }

    #[test]
    fn revert_on_warning_restores_guess() {
        let options = FitOptions {
            patience: 1,
            ..FitOptions::default()
        };
        let run = run_demo(&SampleConfig::default(), false, 0.02, 5, options, true).unwrap();
        assert!(run.fit.report.warning.is_some());
        assert!(run.fit.reverted);
        assert_eq!(run.fit.model, run.guess);
    }
}
