//! Optional instrumentation hook for the fit loop.
//!
//! The fitter calls an observer (when one is installed) after every residual
//! evaluation and once when the fit finishes. Nothing in the numeric code is
//! wrapped; observing is opt-in per `Fitter`.

use crate::fit::fitter::FitReport;

pub trait FitObserver {
    /// Called after each evaluation of the residual function at `params`
    /// (in `ParameterSelection` order) with the resulting sum of squares.
    fn on_evaluation(&mut self, params: &[f64], sum_of_squares: f64) {
        let _ = (params, sum_of_squares);
    }

    fn on_finish(&mut self, report: &FitReport) {
        let _ = report;
    }
}

/// Emits every evaluation as a `trace` event and the outcome as `debug`.
#[derive(Debug, Default, Clone)]
pub struct TracingObserver {
    evaluations: usize,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations
    }
}

impl FitObserver for TracingObserver {
    fn on_evaluation(&mut self, params: &[f64], sum_of_squares: f64) {
        self.evaluations += 1;
        tracing::trace!(
            evaluation = self.evaluations,
            ?params,
            sum_of_squares,
            "residual evaluation"
        );
    }

    fn on_finish(&mut self, report: &FitReport) {
        tracing::debug!(
            converged = report.converged,
            termination = %report.termination,
            evaluations = report.evaluations,
            fitness = report.fitness_after,
            "fit finished"
        );
    }
}
