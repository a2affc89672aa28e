//! Annual Doppler term from a sky-position error.
//!
//! Periods are assumed to have been transformed to the solar-system barycentre
//! using a reference position `(ra, dec)`. If the true position is
//! `(ra + ra_offset, dec + dec_offset)`, the Earth's orbital velocity projects
//! differently onto the two directions and leaves an annual Doppler signature:
//!
//! ```text
//! v_sky(t) = v_earth(t) · (n̂(ra + Δra, dec + Δdec) - n̂(ra, dec))
//! ```
//!
//! The Earth is placed on a circular heliocentric orbit in the ecliptic, which
//! is plenty for arcminute-level position offsets.

use std::f64::consts::{PI, TAU};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::domain::TimeUnit;
use crate::error::{TimingError, TimingResult};
use crate::models::params::SkyField;

/// Mean orbital speed of the Earth (m/s).
pub const EARTH_ORBITAL_SPEED: f64 = 29_784.7;

/// Sidereal year in SI seconds.
pub const SIDEREAL_YEAR_SECONDS: f64 = 365.256_363_004 * 86_400.0;

/// J2000 obliquity of the ecliptic (radians).
pub const OBLIQUITY: f64 = 23.439_291_1 * PI / 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyPosition {
    /// Reference right ascension (radians).
    pub ra: f64,
    /// Reference declination (radians).
    pub dec: f64,
    /// Fitted right-ascension offset (radians).
    pub ra_offset: f64,
    /// Fitted declination offset (radians).
    pub dec_offset: f64,
    /// Epoch of the March equinox, in the model's epoch unit.
    pub equinox_epoch: f64,
}

impl SkyPosition {
    pub fn new(ra: f64, dec: f64, equinox_epoch: f64) -> Self {
        Self {
            ra,
            dec,
            ra_offset: 0.0,
            dec_offset: 0.0,
            equinox_epoch,
        }
    }

    pub fn validate(&self) -> TimingResult<()> {
        let fields = [
            ("ra", self.ra),
            ("dec", self.dec),
            (SkyField::RaOffset.name(), self.ra_offset),
            (SkyField::DecOffset.name(), self.dec_offset),
            ("equinox_epoch", self.equinox_epoch),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(TimingError::InvalidParameter {
                    parameter: name.to_string(),
                    value,
                    reason: "must be finite",
                });
            }
        }
        Ok(())
    }

    /// Earth's heliocentric velocity in equatorial coordinates (m/s).
    pub fn earth_velocity(&self, epoch: f64, unit: TimeUnit) -> Vector3<f64> {
        let elapsed = (epoch - self.equinox_epoch) * unit.seconds();
        // At the March equinox the Sun sits at ecliptic longitude 0, so the
        // Earth is at 180°.
        let longitude = PI + TAU * elapsed / SIDEREAL_YEAR_SECONDS;
        let vx = -EARTH_ORBITAL_SPEED * longitude.sin();
        let vy = EARTH_ORBITAL_SPEED * longitude.cos();
        // Rotate ecliptic -> equatorial about the x axis (the ecliptic z is 0).
        Vector3::new(vx, vy * OBLIQUITY.cos(), vy * OBLIQUITY.sin())
    }

    /// Residual line-of-sight velocity caused by the position offsets (m/s).
    ///
    /// Positive when the Earth moves towards the true position faster than
    /// towards the reference position.
    pub fn velocity(&self, epoch: f64, unit: TimeUnit) -> TimingResult<f64> {
        self.validate()?;
        let v = self.earth_velocity(epoch, unit);
        let reference = direction(self.ra, self.dec);
        let actual = direction(self.ra + self.ra_offset, self.dec + self.dec_offset);
        Ok(v.dot(&(actual - reference)))
    }

    pub fn get(&self, field: SkyField) -> f64 {
        match field {
            SkyField::RaOffset => self.ra_offset,
            SkyField::DecOffset => self.dec_offset,
        }
    }

    pub fn set(&mut self, field: SkyField, value: f64) {
        match field {
            SkyField::RaOffset => self.ra_offset = value,
            SkyField::DecOffset => self.dec_offset = value,
        }
    }
}

/// Unit vector towards `(ra, dec)` in equatorial coordinates.
fn direction(ra: f64, dec: f64) -> Vector3<f64> {
    let (sin_ra, cos_ra) = ra.sin_cos();
    let (sin_dec, cos_dec) = dec.sin_cos();
    Vector3::new(cos_dec * cos_ra, cos_dec * sin_ra, sin_dec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_offsets_give_zero_velocity() {
        let sky = SkyPosition::new(1.2, -0.4, 0.0);
        for i in 0..12 {
            let t = i as f64 * 30.0;
            assert_eq!(sky.velocity(t, TimeUnit::Days).unwrap(), 0.0);
        }
    }

    #[test]
    fn earth_speed_is_constant() {
        let sky = SkyPosition::new(0.0, 0.0, 0.0);
        for i in 0..8 {
            let v = sky.earth_velocity(i as f64 * 1.0e6, TimeUnit::Seconds);
            assert!((v.norm() - EARTH_ORBITAL_SPEED).abs() < 1e-6);
        }
    }

    #[test]
    fn offset_signal_is_annual() {
        let mut sky = SkyPosition::new(0.5, 0.3, 10.0);
        sky.ra_offset = 1e-3;
        sky.dec_offset = -2e-3;
        let year_days = SIDEREAL_YEAR_SECONDS / 86_400.0;
        let a = sky.velocity(57.0, TimeUnit::Days).unwrap();
        let b = sky.velocity(57.0 + year_days, TimeUnit::Days).unwrap();
        assert!(a.abs() > 1.0, "offset should produce a measurable signal, got {a}");
        assert!((a - b).abs() < 1e-6 * a.abs().max(1.0));
    }

    #[test]
    fn small_offset_velocity_scales_linearly() {
        let mut sky = SkyPosition::new(2.0, 0.1, 0.0);
        sky.dec_offset = 1e-5;
        let v1 = sky.velocity(100.0, TimeUnit::Days).unwrap();
        sky.dec_offset = 2e-5;
        let v2 = sky.velocity(100.0, TimeUnit::Days).unwrap();
        assert!((v2 - 2.0 * v1).abs() < 1e-3 * v1.abs().max(1e-9));
    }
}
