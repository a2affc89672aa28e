//! Finite-difference Jacobian for vector-valued residual functions.
//!
//! The minimizer wants `∂r_i/∂x_j` for the residual vector `r(x)`. Our model is
//! cheap to evaluate but has no analytic derivatives for every parameter
//! combination (Kepler solve, sky geometry), so we difference it numerically.
//!
//! - Central differences with step `h_j = ∛ε · max(|x_j|, 1)`.
//! - If one side of the stencil leaves the parameter domain (e.g. `ecc = 0`
//!   probed at `-h`), that column falls back to a one-sided difference.
//!   Any other evaluation error aborts the Jacobian.

use nalgebra::{DMatrix, DVector};

use crate::error::{TimingError, TimingResult};

/// Relative step for central differences (cube root of machine epsilon).
const FD_STEP: f64 = 6.055_454_452_393_343e-6;

fn step_size(x: f64) -> f64 {
    let h = FD_STEP * x.abs().max(1.0);
    // Use the step actually representable at `x`.
    (x + h) - x
}

fn is_out_of_domain(err: &TimingError) -> bool {
    matches!(err, TimingError::InvalidParameter { .. })
}

/// Approximate the Jacobian of `eval` at `x`, given `fx = eval(x)`.
pub fn jacobian<F>(x: &DVector<f64>, fx: &DVector<f64>, mut eval: F) -> TimingResult<DMatrix<f64>>
where
    F: FnMut(&DVector<f64>) -> TimingResult<DVector<f64>>,
{
    let mut jac = DMatrix::<f64>::zeros(fx.len(), x.len());
    let mut probe = x.clone();

    for j in 0..x.len() {
        let h = step_size(x[j]);

        probe[j] = x[j] + h;
        let forward = eval(&probe);
        probe[j] = x[j] - h;
        let backward = eval(&probe);
        probe[j] = x[j];

        let column = match (forward, backward) {
            (Ok(f), Ok(b)) => (f - b) / (2.0 * h),
            (Ok(f), Err(e)) if is_out_of_domain(&e) => (f - fx) / h,
            (Err(e), Ok(b)) if is_out_of_domain(&e) => (fx - b) / h,
            (Err(e), _) | (_, Err(e)) => return Err(e),
        };

        if column.len() != fx.len() {
            return Err(TimingError::DimensionMismatch {
                expected: fx.len(),
                found: column.len(),
            });
        }
        jac.set_column(j, &column);
    }

    Ok(jac)
}
