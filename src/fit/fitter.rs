//! Nonlinear least-squares fitting of a timing model.
//!
//! Given:
//! - a borrowed `TimingDataset` (epochs, observed periods, uncertainties)
//! - a live `TimingModel`
//! - a `ParameterSelection` saying which parameters vary
//!
//! `Fitter::fit` minimizes the weighted residuals
//!
//! ```text
//! r_i = (p_obs_i - p_model(t_i)) / σ_i
//! ```
//!
//! over the free parameters with Levenberg–Marquardt, writes the best vector
//! back into the live model, and keeps a stack of earlier models so a fit can
//! be undone with `revert`.

use levenberg_marquardt::LevenbergMarquardt;
use nalgebra::DVector;

use crate::domain::{TimingDataset, Weighting};
use crate::error::{TimingError, TimingResult};
use crate::fit::observer::FitObserver;
use crate::fit::problem::TimingProblem;
use crate::fit::selection::ParameterSelection;
use crate::models::{ParamId, TimingModel};

/// Options for a single `fit()` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    /// Divide residuals by the measurement uncertainty, or not.
    pub weighting: Weighting,
    /// Evaluation budget in units of `free + 1` residual evaluations.
    pub patience: usize,
    /// Relative reduction in the sum of squares considered converged.
    pub ftol: f64,
    /// Relative step size considered converged.
    pub xtol: f64,
    /// Orthogonality between residuals and Jacobian columns considered converged.
    pub gtol: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            weighting: Weighting::Uncertainty,
            patience: 200,
            ftol: 1.490_116_119_384_765_6e-8,
            xtol: 1.490_116_119_384_765_6e-8,
            gtol: 0.0,
        }
    }
}

/// Non-fatal outcome of a fit that still produced a result.
#[derive(Debug, Clone, PartialEq)]
pub enum FitWarning {
    /// The minimizer stopped without meeting its tolerances. The best vector
    /// it evaluated has been applied; the caller may `revert`.
    DidNotConverge { termination: String, evaluations: usize },
}

impl std::fmt::Display for FitWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitWarning::DidNotConverge {
                termination,
                evaluations,
            } => write!(
                f,
                "fit did not converge ({termination} after {evaluations} evaluations)"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    /// The minimizer met its tolerances. This is local convergence only and
    /// says nothing about fit quality; check `fitness_after`.
    pub converged: bool,
    /// Minimizer termination reason.
    pub termination: String,
    pub evaluations: usize,
    /// `fitness` of the model before and after the fit.
    pub fitness_before: f64,
    pub fitness_after: f64,
    /// Fitted values of the free parameters, in selection order.
    pub parameters: Vec<(ParamId, f64)>,
    pub warning: Option<FitWarning>,
}

/// `observed - predicted` for every measurement.
pub fn residuals(dataset: &TimingDataset, model: &TimingModel) -> TimingResult<Vec<f64>> {
    let predicted = model.evaluate(dataset.epochs())?;
    Ok(dataset
        .periods()
        .iter()
        .zip(predicted)
        .map(|(obs, pred)| obs - pred)
        .collect())
}

/// Residuals divided by their uncertainties.
pub fn weighted_residuals(dataset: &TimingDataset, model: &TimingModel) -> TimingResult<Vec<f64>> {
    scaled_residuals(dataset, model, Weighting::Uncertainty)
}

/// Residual vector handed to the minimizer under `weighting`.
pub(crate) fn scaled_residuals(
    dataset: &TimingDataset,
    model: &TimingModel,
    weighting: Weighting,
) -> TimingResult<Vec<f64>> {
    let mut r = residuals(dataset, model)?;
    if weighting == Weighting::Uncertainty {
        for (ri, sigma) in r.iter_mut().zip(dataset.uncertainties()) {
            *ri /= sigma;
        }
    }
    Ok(r)
}

/// Weighted sum of squares (chi-square).
pub fn fitness(dataset: &TimingDataset, model: &TimingModel) -> TimingResult<f64> {
    Ok(weighted_residuals(dataset, model)?.iter().map(|r| r * r).sum())
}

pub struct Fitter<'a> {
    dataset: &'a TimingDataset,
    model: TimingModel,
    selection: ParameterSelection,
    history: Vec<TimingModel>,
    options: FitOptions,
    observer: Option<Box<dyn FitObserver + 'a>>,
}

impl<'a> Fitter<'a> {
    /// A fitter with every parameter fixed.
    pub fn new(dataset: &'a TimingDataset, model: TimingModel) -> Self {
        let selection = ParameterSelection::for_model(&model);
        Self {
            dataset,
            model,
            selection,
            history: Vec::new(),
            options: FitOptions::default(),
            observer: None,
        }
    }

    pub fn with_options(mut self, options: FitOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_observer(mut self, observer: impl FitObserver + 'a) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn model(&self) -> &TimingModel {
        &self.model
    }

    pub fn into_model(self) -> TimingModel {
        self.model
    }

    pub fn dataset(&self) -> &TimingDataset {
        self.dataset
    }

    pub fn selection(&self) -> &ParameterSelection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut ParameterSelection {
        &mut self.selection
    }

    pub fn options(&self) -> &FitOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut FitOptions {
        &mut self.options
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn residuals(&self) -> TimingResult<Vec<f64>> {
        residuals(self.dataset, &self.model)
    }

    pub fn weighted_residuals(&self) -> TimingResult<Vec<f64>> {
        weighted_residuals(self.dataset, &self.model)
    }

    pub fn fitness(&self) -> TimingResult<f64> {
        fitness(self.dataset, &self.model)
    }

    /// Fit the free parameters and commit the best vector to the live model.
    ///
    /// The pre-fit model is pushed onto the history only when something is
    /// committed; an error leaves both model and history untouched.
    pub fn fit(&mut self) -> TimingResult<FitReport> {
        let free = self.selection.free_ids();
        if free.is_empty() {
            return Err(TimingError::NoFreeParameters);
        }
        // Also rejects a starting model outside the parameter domain.
        let fitness_before = self.fitness()?;
        let start = DVector::from_vec(self.selection.extract(&self.model)?);

        tracing::debug!(
            free = free.len(),
            measurements = self.dataset.len(),
            fitness = fitness_before,
            "starting fit"
        );

        let observer = self.observer.as_deref_mut().map(|o| o as &mut dyn FitObserver);
        let problem = TimingProblem::new(
            self.dataset,
            &self.model,
            &self.selection,
            self.options.weighting,
            observer,
            start.clone(),
        );

        let (mut problem, outcome) = LevenbergMarquardt::new()
            .with_patience(self.options.patience)
            .with_ftol(self.options.ftol)
            .with_xtol(self.options.xtol)
            .with_gtol(self.options.gtol)
            .minimize(problem);

        if let Some(err) = problem.take_failure() {
            tracing::warn!(error = %err, "fit aborted");
            return Err(err);
        }

        let best = problem.best().map(|(_, x)| x.clone()).unwrap_or(start);
        drop(problem);
        let mut fitted = self.model.clone();
        self.selection.apply(&mut fitted, best.as_slice())?;
        let fitness_after = fitness(self.dataset, &fitted)?;

        let converged = outcome.termination.was_successful();
        let termination = format!("{:?}", outcome.termination);
        let evaluations = outcome.number_of_evaluations;
        let warning = if converged {
            None
        } else {
            tracing::warn!(%termination, evaluations, "fit did not converge");
            Some(FitWarning::DidNotConverge {
                termination: termination.clone(),
                evaluations,
            })
        };

        self.history.push(std::mem::replace(&mut self.model, fitted));

        let report = FitReport {
            converged,
            termination,
            evaluations,
            fitness_before,
            fitness_after,
            parameters: free.into_iter().zip(best.iter().copied()).collect(),
            warning,
        };
        tracing::debug!(
            converged,
            evaluations,
            fitness = fitness_after,
            "fit committed"
        );
        if let Some(observer) = self.observer.as_deref_mut() {
            observer.on_finish(&report);
        }
        Ok(report)
    }

    /// Restore the model as it was before the most recent committed fit.
    pub fn revert(&mut self) -> TimingResult<()> {
        let previous = self.history.pop().ok_or(TimingError::EmptyHistory)?;
        self.model = previous;
        tracing::debug!(remaining = self.history.len(), "reverted fit");
        Ok(())
    }
}
