//! Adapter between the timing model and the Levenberg–Marquardt minimizer.
//!
//! `levenberg_marquardt` drives a `LeastSquaresProblem` by setting a parameter
//! vector and asking for residuals and a Jacobian at that point. Each
//! evaluation here works on a fresh copy of the template model, so the live
//! model held by the `Fitter` is never touched while the minimizer explores.

use std::cell::RefCell;

use levenberg_marquardt::LeastSquaresProblem;
use nalgebra::storage::Owned;
use nalgebra::{DMatrix, DVector, Dyn};

use crate::domain::{TimingDataset, Weighting};
use crate::error::{TimingError, TimingResult};
use crate::fit::fitter::scaled_residuals;
use crate::fit::observer::FitObserver;
use crate::fit::selection::ParameterSelection;
use crate::math::finite_diff;
use crate::models::TimingModel;

/// Residual assigned to every measurement when a trial vector leaves the
/// parameter domain. Large enough that the minimizer always rejects the step.
pub(crate) const REJECTED_RESIDUAL: f64 = 1e50;

pub(crate) struct TimingProblem<'a, 'o> {
    dataset: &'a TimingDataset,
    template: &'a TimingModel,
    selection: &'a ParameterSelection,
    weighting: Weighting,
    observer: Option<&'o mut dyn FitObserver>,
    params: DVector<f64>,
    current: Option<DVector<f64>>,
    best: Option<(f64, DVector<f64>)>,
    failure: RefCell<Option<TimingError>>,
}

impl<'a, 'o> TimingProblem<'a, 'o> {
    pub(crate) fn new(
        dataset: &'a TimingDataset,
        template: &'a TimingModel,
        selection: &'a ParameterSelection,
        weighting: Weighting,
        observer: Option<&'o mut dyn FitObserver>,
        start: DVector<f64>,
    ) -> Self {
        let mut problem = Self {
            dataset,
            template,
            selection,
            weighting,
            observer,
            params: start.clone(),
            current: None,
            best: None,
            failure: RefCell::new(None),
        };
        problem.set_params(&start);
        problem
    }

    /// Weighted residuals for the model obtained by applying `x`.
    pub(crate) fn evaluate(&self, x: &DVector<f64>) -> TimingResult<DVector<f64>> {
        let mut model = self.template.clone();
        self.selection.apply(&mut model, x.as_slice())?;
        let r = scaled_residuals(self.dataset, &model, self.weighting)?;
        Ok(DVector::from_vec(r))
    }

    /// Lowest sum of squares seen at an accepted (in-domain) point.
    pub(crate) fn best(&self) -> Option<&(f64, DVector<f64>)> {
        self.best.as_ref()
    }

    pub(crate) fn take_failure(&mut self) -> Option<TimingError> {
        self.failure.get_mut().take()
    }

    fn record(&mut self, x: &DVector<f64>, r: &DVector<f64>) {
        let ss = r.norm_squared();
        if let Some(observer) = self.observer.as_deref_mut() {
            observer.on_evaluation(x.as_slice(), ss);
        }
        if !ss.is_finite() {
            return;
        }
        let improved = self.best.as_ref().is_none_or(|(best_ss, _)| ss < *best_ss);
        if improved {
            self.best = Some((ss, x.clone()));
        }
    }
}

impl LeastSquaresProblem<f64, Dyn, Dyn> for TimingProblem<'_, '_> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.params.copy_from(x);
        self.current = match self.evaluate(x) {
            Ok(r) => {
                self.record(x, &r);
                Some(r)
            }
            Err(TimingError::InvalidParameter { .. }) => {
                Some(DVector::from_element(self.dataset.len(), REJECTED_RESIDUAL))
            }
            Err(err) => {
                *self.failure.get_mut() = Some(err);
                None
            }
        };
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        self.current.clone()
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        let fx = self.current.as_ref()?;
        match finite_diff::jacobian(&self.params, fx, |x| self.evaluate(x)) {
            Ok(jac) => Some(jac),
            Err(err) => {
                *self.failure.borrow_mut() = Some(err);
                None
            }
        }
    }
}
