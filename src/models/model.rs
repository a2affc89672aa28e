//! Timing model: spin-down plus zero or more orbits and an optional sky term.
//!
//! Every pulsar variant (isolated, binary, hierarchical triple, with or without
//! a position correction) is the same type. The predicted apparent period is
//!
//! ```text
//! p(t) = (p0 + p1·(t - pepoch)) · c / (c + Σ v_i(t))
//! ```
//!
//! where the sum runs over every orbit plus the sky term. Evaluation is a pure
//! function of the current parameter values.

use serde::{Deserialize, Serialize};

use crate::domain::TimeUnit;
use crate::error::{TimingError, TimingResult};
use crate::models::orbit::{OrbitalElements, SPEED_OF_LIGHT};
use crate::models::params::{OrbitField, ParamId, Scope, SkyField, SpinField};
use crate::models::sky::SkyPosition;
use crate::models::spin::SpinParameters;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingModel {
    pub spin: SpinParameters,
    /// Orbits in hierarchy order (inner binary first).
    pub orbits: Vec<OrbitalElements>,
    pub sky: Option<SkyPosition>,
    /// Unit of every epoch-valued field and of the dataset epochs.
    pub time_unit: TimeUnit,
}

impl TimingModel {
    pub fn isolated(spin: SpinParameters) -> Self {
        Self {
            spin,
            orbits: Vec::new(),
            sky: None,
            time_unit: TimeUnit::default(),
        }
    }

    pub fn with_orbit(mut self, orbit: OrbitalElements) -> Self {
        self.orbits.push(orbit);
        self
    }

    pub fn with_sky(mut self, sky: SkyPosition) -> Self {
        self.sky = Some(sky);
        self
    }

    pub fn with_time_unit(mut self, unit: TimeUnit) -> Self {
        self.time_unit = unit;
        self
    }

    /// Total line-of-sight velocity at `epoch` (m/s).
    pub fn los_velocity(&self, epoch: f64) -> TimingResult<f64> {
        let mut v = 0.0;
        for orbit in &self.orbits {
            v += orbit.velocity(epoch)?;
        }
        if let Some(sky) = &self.sky {
            v += sky.velocity(epoch, self.time_unit)?;
        }
        Ok(v)
    }

    /// Multiplicative factor taking the intrinsic period to the apparent one.
    pub fn doppler_factor(&self, epoch: f64) -> TimingResult<f64> {
        if self.orbits.is_empty() && self.sky.is_none() {
            return Ok(1.0);
        }
        let v = self.los_velocity(epoch)?;
        let denominator = SPEED_OF_LIGHT + v;
        if !(denominator.is_finite() && denominator > 0.0) {
            return Err(TimingError::InvalidParameter {
                parameter: "los_velocity".to_string(),
                value: v,
                reason: "line-of-sight velocity must be greater than -c",
            });
        }
        Ok(SPEED_OF_LIGHT / denominator)
    }

    /// Apparent period at one epoch.
    pub fn period(&self, epoch: f64) -> TimingResult<f64> {
        self.spin.validate()?;
        Ok(self.spin.period(epoch) * self.doppler_factor(epoch)?)
    }

    /// Apparent periods at each epoch.
    pub fn evaluate(&self, epochs: &[f64]) -> TimingResult<Vec<f64>> {
        epochs.iter().map(|&t| self.period(t)).collect()
    }

    /// Every addressable parameter, in the fixed fitting order: spin fields,
    /// then each orbit by index, then the sky offsets.
    pub fn parameter_ids(&self) -> Vec<ParamId> {
        let mut ids: Vec<ParamId> = SpinField::ALL.iter().map(|&f| ParamId::Spin(f)).collect();
        for i in 0..self.orbits.len() {
            ids.extend(OrbitField::ALL.iter().map(|&f| ParamId::Orbit(i, f)));
        }
        if self.sky.is_some() {
            ids.extend(SkyField::ALL.iter().map(|&f| ParamId::Sky(f)));
        }
        ids
    }

    /// Whether `id` addresses something this model has.
    pub fn has_parameter(&self, id: ParamId) -> bool {
        match id {
            ParamId::Spin(_) => true,
            ParamId::Orbit(i, _) => i < self.orbits.len(),
            ParamId::Sky(_) => self.sky.is_some(),
        }
    }

    pub fn get(&self, id: ParamId) -> TimingResult<f64> {
        match id {
            ParamId::Spin(f) => Ok(self.spin.get(f)),
            ParamId::Orbit(i, f) => self.orbits.get(i).map(|o| o.get(f)).ok_or_else(|| missing(id)),
            ParamId::Sky(f) => self.sky.as_ref().map(|s| s.get(f)).ok_or_else(|| missing(id)),
        }
    }

    pub fn set(&mut self, id: ParamId, value: f64) -> TimingResult<()> {
        match id {
            ParamId::Spin(f) => self.spin.set(f, value),
            ParamId::Orbit(i, f) => self.orbits.get_mut(i).ok_or_else(|| missing(id))?.set(f, value),
            ParamId::Sky(f) => self.sky.as_mut().ok_or_else(|| missing(id))?.set(f, value),
        }
        Ok(())
    }

    /// Resolve `(scope, name)` against this model.
    pub fn resolve(&self, scope: Scope, name: &str) -> TimingResult<ParamId> {
        let id = scope.field(name)?;
        if self.has_parameter(id) {
            Ok(id)
        } else {
            Err(missing(id))
        }
    }
}

fn missing(id: ParamId) -> TimingError {
    TimingError::UnknownParameter {
        scope: id.scope().to_string(),
        name: id.field_name().to_string(),
    }
}
