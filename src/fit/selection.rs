//! Free/fixed parameter selection.
//!
//! A `ParameterSelection` is built once per model shape and flags each
//! addressable parameter as free or fixed. It maps between the model and the
//! flat vector the minimizer works on:
//!
//! - `extract(model)` walks the parameters in the model's fixed order (spin,
//!   orbits by index, sky) and collects the free values
//! - `apply(model, x)` writes `x` back in exactly the same order
//!
//! That shared order is the contract between the two directions.

use crate::error::{TimingError, TimingResult};
use crate::models::{ParamId, Scope, TimingModel};

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSelection {
    entries: Vec<(ParamId, bool)>,
}

impl ParameterSelection {
    /// All parameters of `model`, all fixed.
    pub fn for_model(model: &TimingModel) -> Self {
        Self {
            entries: model.parameter_ids().into_iter().map(|id| (id, false)).collect(),
        }
    }

    pub fn mark_free(&mut self, scope: Scope, name: &str) -> TimingResult<ParamId> {
        self.set_flag(scope, name, true)
    }

    pub fn mark_fixed(&mut self, scope: Scope, name: &str) -> TimingResult<ParamId> {
        self.set_flag(scope, name, false)
    }

    /// Flag a parameter by id.
    pub fn set_free(&mut self, id: ParamId, free: bool) -> TimingResult<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|(candidate, _)| *candidate == id)
            .ok_or_else(|| TimingError::UnknownParameter {
                scope: id.scope().to_string(),
                name: id.field_name().to_string(),
            })?;
        entry.1 = free;
        Ok(())
    }

    fn set_flag(&mut self, scope: Scope, name: &str, free: bool) -> TimingResult<ParamId> {
        let id = scope.field(name)?;
        self.set_free(id, free)?;
        Ok(id)
    }

    pub fn is_free(&self, id: ParamId) -> bool {
        self.entries.iter().any(|&(candidate, free)| candidate == id && free)
    }

    /// Free parameters, in vector order.
    pub fn free_ids(&self) -> Vec<ParamId> {
        self.entries
            .iter()
            .filter(|(_, free)| *free)
            .map(|&(id, _)| id)
            .collect()
    }

    pub fn free_count(&self) -> usize {
        self.entries.iter().filter(|(_, free)| *free).count()
    }

    /// Every parameter with its flag, in vector order.
    pub fn entries(&self) -> &[(ParamId, bool)] {
        &self.entries
    }

    /// Current values of the free parameters.
    pub fn extract(&self, model: &TimingModel) -> TimingResult<Vec<f64>> {
        self.entries
            .iter()
            .filter(|(_, free)| *free)
            .map(|&(id, _)| model.get(id))
            .collect()
    }

    /// Write `values` into the free parameters of `model`.
    ///
    /// On a length mismatch nothing is written.
    pub fn apply(&self, model: &mut TimingModel, values: &[f64]) -> TimingResult<()> {
        let expected = self.free_count();
        if values.len() != expected {
            return Err(TimingError::DimensionMismatch {
                expected,
                found: values.len(),
            });
        }
        let free = self.entries.iter().filter(|(_, free)| *free).map(|&(id, _)| id);
        for (id, &value) in free.zip(values) {
            model.set(id, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrbitField, OrbitalElements, SkyField, SkyPosition, SpinField, SpinParameters};
    use proptest::prelude::*;

    fn triple() -> TimingModel {
        TimingModel::isolated(SpinParameters::new(0.005, 1e-15, 100.0))
            .with_orbit(OrbitalElements::new(3600.0, 2.0, 10.0, 0.1, 0.5))
            .with_orbit(OrbitalElements::new(3.0e7, 40.0, 5.0e5, 0.3, 2.0))
            .with_sky(SkyPosition::new(1.0, 0.2, 0.0))
    }

    #[test]
    fn extract_follows_declaration_order_not_marking_order() {
        let model = triple();
        let mut sel = ParameterSelection::for_model(&model);
        sel.mark_free(Scope::Sky, "dec_offset").unwrap();
        sel.mark_free(Scope::Orbit(1), "pb").unwrap();
        sel.mark_free(Scope::Orbit(0), "ecc").unwrap();
        sel.mark_free(Scope::Spin, "p0").unwrap();

        assert_eq!(
            sel.free_ids(),
            vec![
                ParamId::Spin(SpinField::P0),
                ParamId::Orbit(0, OrbitField::Ecc),
                ParamId::Orbit(1, OrbitField::Pb),
                ParamId::Sky(SkyField::DecOffset),
            ]
        );
        assert_eq!(sel.extract(&model).unwrap(), vec![0.005, 0.1, 3.0e7, 0.0]);
    }

    #[test]
    fn apply_writes_in_the_same_order() {
        let mut model = triple();
        let mut sel = ParameterSelection::for_model(&model);
        sel.mark_free(Scope::Orbit(1), "om").unwrap();
        sel.mark_free(Scope::Spin, "p1").unwrap();
        sel.apply(&mut model, &[2e-15, 2.5]).unwrap();
        assert_eq!(model.spin.p1, 2e-15);
        assert_eq!(model.orbits[1].om, 2.5);
    }

    #[test]
    fn mark_fixed_removes_from_vector() {
        let model = triple();
        let mut sel = ParameterSelection::for_model(&model);
        sel.mark_free(Scope::Spin, "p0").unwrap();
        sel.mark_free(Scope::Spin, "p1").unwrap();
        sel.mark_fixed(Scope::Spin, "p0").unwrap();
        assert_eq!(sel.free_count(), 1);
        assert!(sel.is_free(ParamId::Spin(SpinField::P1)));
        assert!(!sel.is_free(ParamId::Spin(SpinField::P0)));
    }

    #[test]
    fn unknown_names_and_missing_orbits_are_errors() {
        let model = TimingModel::isolated(SpinParameters::new(1.0, 0.0, 0.0))
            .with_orbit(OrbitalElements::circular(10.0, 1.0, 0.0));
        let mut sel = ParameterSelection::for_model(&model);
        assert!(matches!(
            sel.mark_free(Scope::Spin, "f0"),
            Err(TimingError::UnknownParameter { .. })
        ));
        assert!(matches!(
            sel.mark_free(Scope::Orbit(1), "pb"),
            Err(TimingError::UnknownParameter { .. })
        ));
        assert!(sel.mark_free(Scope::Sky, "ra_offset").is_err());
        assert_eq!(sel.free_count(), 0);
    }

    #[test]
    fn apply_rejects_wrong_length_without_writing() {
        let mut model = triple();
        let before = model.clone();
        let mut sel = ParameterSelection::for_model(&model);
        sel.mark_free(Scope::Spin, "p0").unwrap();
        sel.mark_free(Scope::Orbit(0), "pb").unwrap();

        let err = sel.apply(&mut model, &[1.0]).unwrap_err();
        assert_eq!(err, TimingError::DimensionMismatch { expected: 2, found: 1 });
        assert_eq!(model, before);
    }

    proptest! {
        #[test]
        fn apply_of_extract_is_identity(mask in proptest::collection::vec(any::<bool>(), 15)) {
            let mut model = triple();
            let before = model.clone();
            let mut sel = ParameterSelection::for_model(&model);
            for (id, free) in model.parameter_ids().into_iter().zip(mask) {
                sel.set_free(id, free).unwrap();
            }
            let x = sel.extract(&model).unwrap();
            prop_assert_eq!(x.len(), sel.free_count());
            sel.apply(&mut model, &x).unwrap();
            prop_assert_eq!(model, before);
        }
    }
}
