//! Keplerian orbit and its line-of-sight kinematics.
//!
//! Units: `pb` and `t0` share the epoch unit τ and `asini` is in light-τ, so
//! `(2π/pb)·asini` is a speed in units of c. Velocities are returned in m/s and
//! accelerations in m/s per τ.
//!
//! Sign convention: positive line-of-sight velocity means the pulsar is moving
//! towards the observer, which shortens the apparent period through the Doppler
//! factor `c / (c + v)`. The same convention holds for every orbit and for the
//! annual term in `models::sky`.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::error::{TimingError, TimingResult};
use crate::math::{eccentric_anomaly, reduce_angle, true_anomaly};
use crate::models::params::OrbitField;

/// Speed of light in m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Eccentricities below this are evaluated with the circular closed form.
pub const CIRCULAR_ECC_THRESHOLD: f64 = 1e-6;

/// One Keplerian orbit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitalElements {
    /// Orbital period (τ).
    pub pb: f64,
    /// Projected semi-major axis (light-τ).
    pub asini: f64,
    /// Epoch of periapsis (τ).
    pub t0: f64,
    /// Eccentricity, `0 <= ecc < 1`.
    pub ecc: f64,
    /// Longitude of periastron (radians).
    pub om: f64,
}

/// The three anomalies at one epoch, in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anomalies {
    pub mean: f64,
    pub eccentric: f64,
    pub true_anomaly: f64,
}

impl OrbitalElements {
    pub fn new(pb: f64, asini: f64, t0: f64, ecc: f64, om: f64) -> Self {
        Self {
            pb,
            asini,
            t0,
            ecc,
            om,
        }
    }

    pub fn circular(pb: f64, asini: f64, t0: f64) -> Self {
        Self::new(pb, asini, t0, 0.0, 0.0)
    }

    pub fn is_circular(&self) -> bool {
        self.ecc < CIRCULAR_ECC_THRESHOLD
    }

    pub fn validate(&self) -> TimingResult<()> {
        let invalid = |field: OrbitField, value: f64, reason: &'static str| TimingError::InvalidParameter {
            parameter: field.name().to_string(),
            value,
            reason,
        };

        if !(self.pb.is_finite() && self.pb > 0.0) {
            return Err(invalid(OrbitField::Pb, self.pb, "orbital period must be finite and > 0"));
        }
        if !(self.ecc.is_finite() && (0.0..1.0).contains(&self.ecc)) {
            return Err(invalid(OrbitField::Ecc, self.ecc, "eccentricity must lie in [0, 1)"));
        }
        for field in [OrbitField::Asini, OrbitField::T0, OrbitField::Om] {
            let value = self.get(field);
            if !value.is_finite() {
                return Err(invalid(field, value, "must be finite"));
            }
        }
        Ok(())
    }

    /// Mean motion `2π / pb` (radians per τ).
    pub fn mean_motion(&self) -> f64 {
        TAU / self.pb
    }

    /// Fraction of the orbit elapsed since the last periapsis, in `[0, 1)`.
    pub fn phase(&self, epoch: f64) -> f64 {
        reduce_angle(self.mean_motion() * (epoch - self.t0)) / TAU
    }

    pub fn anomalies(&self, epoch: f64) -> TimingResult<Anomalies> {
        self.validate()?;
        let mean = reduce_angle(self.mean_motion() * (epoch - self.t0));
        if self.is_circular() {
            return Ok(Anomalies {
                mean,
                eccentric: mean,
                true_anomaly: mean,
            });
        }
        let eccentric = eccentric_anomaly(mean, self.ecc)?;
        Ok(Anomalies {
            mean,
            eccentric,
            true_anomaly: true_anomaly(eccentric, self.ecc),
        })
    }

    /// Line-of-sight velocity at `epoch` (m/s).
    pub fn velocity(&self, epoch: f64) -> TimingResult<f64> {
        self.validate()?;
        let n = self.mean_motion();
        // Not reduced here: the Kepler solver reduces the mean anomaly itself.
        let mean = n * (epoch - self.t0);

        if self.is_circular() {
            return Ok(circular_velocity(n, self.asini, mean));
        }
        let nu = true_anomaly(eccentric_anomaly(mean, self.ecc)?, self.ecc);
        Ok(eccentric_velocity(n, self.asini, self.ecc, self.om, nu))
    }

    /// Line-of-sight acceleration at `epoch` (m/s per τ).
    pub fn acceleration(&self, epoch: f64) -> TimingResult<f64> {
        self.validate()?;
        let n = self.mean_motion();
        let mean = n * (epoch - self.t0);

        if self.is_circular() {
            return Ok(circular_acceleration(n, self.asini, mean));
        }
        let nu = true_anomaly(eccentric_anomaly(mean, self.ecc)?, self.ecc);
        Ok(eccentric_acceleration(n, self.asini, self.ecc, self.om, nu))
    }

    pub fn get(&self, field: OrbitField) -> f64 {
        match field {
            OrbitField::Pb => self.pb,
            OrbitField::Asini => self.asini,
            OrbitField::T0 => self.t0,
            OrbitField::Ecc => self.ecc,
            OrbitField::Om => self.om,
        }
    }

    pub fn set(&mut self, field: OrbitField, value: f64) {
        match field {
            OrbitField::Pb => self.pb = value,
            OrbitField::Asini => self.asini = value,
            OrbitField::T0 => self.t0 = value,
            OrbitField::Ecc => self.ecc = value,
            OrbitField::Om => self.om = value,
        }
    }
}

// Mean, eccentric and true anomaly coincide for a circular orbit, and `om` is
// degenerate with `t0`, so it drops out.
fn circular_velocity(n: f64, asini: f64, mean: f64) -> f64 {
    SPEED_OF_LIGHT * n * asini * mean.cos()
}

fn circular_acceleration(n: f64, asini: f64, mean: f64) -> f64 {
    SPEED_OF_LIGHT * n * n * asini * mean.sin()
}

fn eccentric_velocity(n: f64, asini: f64, ecc: f64, om: f64, nu: f64) -> f64 {
    let angle = (nu + om).cos() + ecc * om.cos();
    SPEED_OF_LIGHT * n * asini * angle / (1.0 - ecc * ecc).sqrt()
}

fn eccentric_acceleration(n: f64, asini: f64, ecc: f64, om: f64, nu: f64) -> f64 {
    let angle = (om + nu).sin() * (1.0 + ecc * nu.cos()).powi(2);
    SPEED_OF_LIGHT * n * n * asini * angle / (1.0 - ecc * ecc).sqrt()
}
