//! Intrinsic spin-down model.

use serde::{Deserialize, Serialize};

use crate::error::{TimingError, TimingResult};
use crate::models::params::SpinField;

/// Linear spin-down: `p(t) = p0 + p1·(t - pepoch)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpinParameters {
    /// Spin period at `pepoch`.
    pub p0: f64,
    /// Period derivative (period units per epoch unit).
    pub p1: f64,
    /// Reference epoch.
    pub pepoch: f64,
}

impl SpinParameters {
    pub fn new(p0: f64, p1: f64, pepoch: f64) -> Self {
        Self { p0, p1, pepoch }
    }

    /// Intrinsic (rest-frame) period at `epoch`.
    pub fn period(&self, epoch: f64) -> f64 {
        self.p0 + self.p1 * (epoch - self.pepoch)
    }

    pub fn get(&self, field: SpinField) -> f64 {
        match field {
            SpinField::P0 => self.p0,
            SpinField::P1 => self.p1,
            SpinField::Pepoch => self.pepoch,
        }
    }

    pub fn set(&mut self, field: SpinField, value: f64) {
        match field {
            SpinField::P0 => self.p0 = value,
            SpinField::P1 => self.p1 = value,
            SpinField::Pepoch => self.pepoch = value,
        }
    }

    pub fn validate(&self) -> TimingResult<()> {
        for field in SpinField::ALL {
            let value = self.get(field);
            if !value.is_finite() {
                return Err(TimingError::InvalidParameter {
                    parameter: field.name().to_string(),
                    value,
                    reason: "must be finite",
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_is_linear_in_time() {
        let spin = SpinParameters::new(0.5, 1e-3, 100.0);
        assert_eq!(spin.period(100.0), 0.5);
        assert!((spin.period(200.0) - 0.6).abs() < 1e-12);
        assert!((spin.period(0.0) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn get_set_by_field() {
        let mut spin = SpinParameters::new(1.0, 2.0, 3.0);
        spin.set(SpinField::P1, -4.0);
        assert_eq!(spin.get(SpinField::P1), -4.0);
        assert_eq!(spin.get(SpinField::Pepoch), 3.0);
    }
}
