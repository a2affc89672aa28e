//! Kepler's equation and the anomaly conversions built on it.
//!
//! Given mean anomaly `M` and eccentricity `e` (`0 <= e < 1`) we solve
//!
//! ```text
//! M = E - e·sin(E)
//! ```
//!
//! for the eccentric anomaly `E`. There is no closed form, so we iterate.
//!
//! Numerical notes:
//! - `M` is reduced into `[0, 2π)` first; callers may pass any real value.
//! - The root always lies in `[M - e, M + e]` because `|E - M| = e·|sin E| <= e`.
//!   Newton steps that would leave the bracket are replaced by bisection, so
//!   the iteration converges for every `e < 1` regardless of the seed.
//! - True anomaly uses the half-angle `atan2` form, which is well defined over
//!   the full circle (no `arccos` branch selection).

use std::f64::consts::TAU;

use crate::error::{TimingError, TimingResult};

/// Convergence threshold on `|E - e·sin(E) - M|`.
pub const KEPLER_TOLERANCE: f64 = 1e-12;

/// Upper bound on root-finding iterations.
pub const KEPLER_MAX_ITER: usize = 100;

/// Above this eccentricity the iteration is seeded at `π`.
const HIGH_ECC_SEED: f64 = 0.8;

/// Reduce an angle into `[0, 2π)`.
pub fn reduce_angle(x: f64) -> f64 {
    let r = x.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if r >= TAU { 0.0 } else { r }
}

/// Solve Kepler's equation for the eccentric anomaly.
///
/// Returns `E` in `[0, 2π]`.
pub fn eccentric_anomaly(mean_anomaly: f64, ecc: f64) -> TimingResult<f64> {
    if !(mean_anomaly.is_finite() && ecc.is_finite() && (0.0..1.0).contains(&ecc)) {
        return Err(TimingError::InvalidParameter {
            parameter: "ecc".to_string(),
            value: ecc,
            reason: "Kepler's equation needs a finite anomaly and 0 <= e < 1",
        });
    }

    let m = reduce_angle(mean_anomaly);
    let mut lo = m - ecc;
    let mut hi = m + ecc;

    let mut e_anom = if ecc > HIGH_ECC_SEED { std::f64::consts::PI } else { m };
    e_anom = e_anom.clamp(lo, hi);

    let mut residual = f64::INFINITY;
    for _ in 0..KEPLER_MAX_ITER {
        residual = e_anom - ecc * e_anom.sin() - m;
        if residual.abs() <= KEPLER_TOLERANCE {
            return Ok(e_anom);
        }

        // f is increasing in E, so the sign tells which side of the root we are on.
        if residual < 0.0 {
            lo = e_anom;
        } else {
            hi = e_anom;
        }

        let slope = 1.0 - ecc * e_anom.cos();
        let newton = e_anom - residual / slope;
        e_anom = if newton > lo && newton < hi {
            newton
        } else {
            0.5 * (lo + hi)
        };

        if hi - lo <= f64::EPSILON * hi.abs().max(1.0) {
            residual = e_anom - ecc * e_anom.sin() - m;
            if residual.abs() <= KEPLER_TOLERANCE {
                return Ok(e_anom);
            }
            break;
        }
    }

    tracing::warn!(
        mean_anomaly = m,
        ecc,
        estimate = e_anom,
        residual,
        "Kepler solve did not converge"
    );
    Err(TimingError::Convergence {
        mean_anomaly: m,
        eccentricity: ecc,
        estimate: e_anom,
        residual,
    })
}

/// True anomaly from eccentric anomaly.
pub fn true_anomaly(ecc_anomaly: f64, ecc: f64) -> f64 {
    let half = 0.5 * ecc_anomaly;
    2.0 * ((1.0 + ecc).sqrt() * half.sin()).atan2((1.0 - ecc).sqrt() * half.cos())
}

/// True anomaly straight from mean anomaly.
pub fn true_anomaly_from_mean(mean_anomaly: f64, ecc: f64) -> TimingResult<f64> {
    let e_anom = eccentric_anomaly(mean_anomaly, ecc)?;
    Ok(true_anomaly(e_anom, ecc))
}
