use pulsar_orbit::data::{SampleConfig, generate_dataset};
use pulsar_orbit::domain::{TimeUnit, TimingDataset};
use pulsar_orbit::error::TimingError;
use pulsar_orbit::fit::{Fitter, fitness};
use pulsar_orbit::models::{OrbitalElements, Scope, SkyPosition, SpinParameters, TimingModel};

fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| start + (stop - start) * i as f64 / (n - 1) as f64)
        .collect()
}

fn noiseless(model: &TimingModel, epochs: Vec<f64>, sigma: f64) -> TimingDataset {
    let periods = model.evaluate(&epochs).unwrap();
    let n = epochs.len();
    TimingDataset::new(epochs, periods, vec![sigma; n]).unwrap()
}

fn rel_err(fitted: f64, truth: f64) -> f64 {
    ((fitted - truth) / truth).abs()
}

#[test]
fn circular_binary_end_to_end() {
    let truth = TimingModel::isolated(SpinParameters::new(0.01, 0.0, 0.0))
        .with_orbit(OrbitalElements::circular(3600.0, 2.0, 0.0));
    let data = noiseless(&truth, linspace(0.0, 36_000.0, 50), 1e-6);

    let mut guess = truth.clone();
    guess.spin.p0 *= 1.05;
    guess.orbits[0].pb *= 0.99;
    guess.orbits[0].asini *= 1.05;
    guess.orbits[0].t0 = 36.0;

    let mut fitter = Fitter::new(&data, guess);
    fitter.selection_mut().mark_free(Scope::Spin, "p0").unwrap();
    for name in ["pb", "asini", "t0"] {
        fitter.selection_mut().mark_free(Scope::Orbit(0), name).unwrap();
    }

    let report = fitter.fit().unwrap();
    assert!(report.converged, "termination: {}", report.termination);
    assert!(report.fitness_after < 1e-6, "fitness {}", report.fitness_after);
    assert_eq!(report.fitness_after, fitter.fitness().unwrap());

    let m = fitter.model();
    assert!(rel_err(m.spin.p0, 0.01) < 1e-4);
    assert!(rel_err(m.orbits[0].pb, 3600.0) < 1e-4);
    assert!(rel_err(m.orbits[0].asini, 2.0) < 1e-4);
    // t0 = 0 has no relative scale; measure it against the orbital period.
    assert!(m.orbits[0].t0.abs() < 1e-4 * 3600.0, "t0 {}", m.orbits[0].t0);
}

#[test]
fn eccentric_binary_recovers_all_eight_parameters() {
    let truth = TimingModel::isolated(SpinParameters::new(0.005, 1e-10, 1000.0))
        .with_orbit(OrbitalElements::new(7200.0, 1.5, 500.0, 0.3, 1.2));
    let data = noiseless(&truth, linspace(0.0, 36_000.0, 200), 1e-9);

    let mut guess = truth.clone();
    guess.spin.p0 *= 1.0005;
    guess.spin.p1 *= 1.1;
    guess.spin.pepoch = 1100.0;
    guess.orbits[0].pb *= 1.002;
    guess.orbits[0].asini *= 0.99;
    guess.orbits[0].t0 += 30.0;
    guess.orbits[0].ecc = 0.31;
    guess.orbits[0].om = 1.23;

    let mut fitter = Fitter::new(&data, guess);
    let ids = fitter.model().parameter_ids();
    for id in ids {
        fitter.selection_mut().set_free(id, true).unwrap();
    }
    assert_eq!(fitter.selection().free_count(), 8);

    let report = fitter.fit().unwrap();
    assert!(report.fitness_after < 1e-6, "fitness {}", report.fitness_after);

    let m = fitter.model();
    let o = &m.orbits[0];
    assert!(rel_err(o.pb, 7200.0) < 1e-6, "pb {}", o.pb);
    assert!(rel_err(o.asini, 1.5) < 1e-6, "asini {}", o.asini);
    assert!((o.t0 - 500.0).abs() < 1e-3, "t0 {}", o.t0);
    assert!((o.ecc - 0.3).abs() < 1e-6, "ecc {}", o.ecc);
    assert!((o.om - 1.2).abs() < 1e-6, "om {}", o.om);
    assert!(rel_err(m.spin.p1, 1e-10) < 1e-4, "p1 {}", m.spin.p1);
    // p0 and pepoch only enter through p0 - p1·pepoch.
    let intercept = m.spin.p0 - m.spin.p1 * m.spin.pepoch;
    assert!(rel_err(intercept, 0.005 - 1e-7) < 1e-9, "intercept {intercept}");
}

#[test]
fn hierarchical_triple_fits_both_orbits() {
    let truth = TimingModel::isolated(SpinParameters::new(0.01, 0.0, 0.0))
        .with_orbit(OrbitalElements::circular(3600.0, 2.0, 0.0))
        .with_orbit(OrbitalElements::new(20_000.0, 0.5, 2_000.0, 0.3, 1.0));
    let config = SampleConfig {
        n_epochs: 120,
        ..SampleConfig::default()
    };
    let data = generate_dataset(&truth, &config).unwrap();

    let mut guess = truth.clone();
    guess.orbits[0].asini *= 1.01;
    guess.orbits[1].asini *= 0.98;
    guess.orbits[1].pb *= 1.005;

    let mut fitter = Fitter::new(&data, guess);
    fitter.selection_mut().mark_free(Scope::Orbit(0), "asini").unwrap();
    fitter.selection_mut().mark_free(Scope::Orbit(1), "asini").unwrap();
    fitter.selection_mut().mark_free(Scope::Orbit(1), "pb").unwrap();

    let report = fitter.fit().unwrap();
    assert!(report.fitness_after < 1e-6, "fitness {}", report.fitness_after);
    let m = fitter.model();
    assert!(rel_err(m.orbits[0].asini, 2.0) < 1e-5);
    assert!(rel_err(m.orbits[1].asini, 0.5) < 1e-5);
    assert!(rel_err(m.orbits[1].pb, 20_000.0) < 1e-5);
}

#[test]
fn sky_offsets_are_fitted_like_orbital_parameters() {
    let mut sky = SkyPosition::new(1.0, 0.3, 0.0);
    sky.ra_offset = 2e-4;
    sky.dec_offset = -1e-4;
    // Ten-day orbit of 1e-4 light-days, epochs in days.
    let truth = TimingModel::isolated(SpinParameters::new(0.005, 0.0, 0.0))
        .with_orbit(OrbitalElements::circular(10.0, 1e-4, 0.0))
        .with_sky(sky)
        .with_time_unit(TimeUnit::Days);
    let epochs: Vec<f64> = (0..200).map(|i| i as f64 * 3.7).collect();
    let data = noiseless(&truth, epochs, 1e-12);

    let mut guess = truth.clone();
    if let Some(sky) = guess.sky.as_mut() {
        sky.ra_offset = 0.0;
        sky.dec_offset = 0.0;
    }

    let mut fitter = Fitter::new(&data, guess);
    fitter.selection_mut().mark_free(Scope::Sky, "ra_offset").unwrap();
    fitter.selection_mut().mark_free(Scope::Sky, "dec_offset").unwrap();

    let report = fitter.fit().unwrap();
    assert!(report.converged, "termination: {}", report.termination);
    assert!(report.fitness_after < 1e-6, "fitness {}", report.fitness_after);

    let fitted = fitter.model().sky.unwrap();
    assert!(rel_err(fitted.ra_offset, 2e-4) < 1e-6, "ra_offset {}", fitted.ra_offset);
    assert!(rel_err(fitted.dec_offset, -1e-4) < 1e-6, "dec_offset {}", fitted.dec_offset);
    assert_eq!(fitted.ra, 1.0);
    assert_eq!(fitted.dec, 0.3);
}

#[test]
fn converged_means_local_not_global() {
    // Five percent off in pb drifts half a cycle over the ten orbits, which
    // puts the start in a different basin: the minimizer meets its
    // tolerances at a much worse fitness than the true solution.
    let truth = TimingModel::isolated(SpinParameters::new(0.01, 0.0, 0.0))
        .with_orbit(OrbitalElements::circular(3600.0, 2.0, 0.0));
    let data = noiseless(&truth, linspace(0.0, 36_000.0, 50), 1e-6);

    let mut guess = truth.clone();
    guess.spin.p0 *= 1.05;
    guess.orbits[0].pb *= 1.05;
    guess.orbits[0].asini *= 1.05;
    guess.orbits[0].t0 = 180.0;

    let mut fitter = Fitter::new(&data, guess);
    fitter.selection_mut().mark_free(Scope::Spin, "p0").unwrap();
    for name in ["pb", "asini", "t0"] {
        fitter.selection_mut().mark_free(Scope::Orbit(0), name).unwrap();
    }

    let report = fitter.fit().unwrap();
    assert!(report.converged, "termination: {}", report.termination);
    assert!(report.fitness_after > 1.0, "fitness {}", report.fitness_after);
    assert!(rel_err(fitter.model().orbits[0].pb, 3600.0) > 0.01);
}

#[test]
fn revert_after_fit_restores_exact_model() {
    let truth = TimingModel::isolated(SpinParameters::new(0.01, 0.0, 0.0))
        .with_orbit(OrbitalElements::circular(3600.0, 2.0, 0.0));
    let data = noiseless(&truth, linspace(0.0, 36_000.0, 50), 1e-6);

    let mut start = truth.clone();
    start.orbits[0].asini = 2.1;
    let before = fitness(&data, &start).unwrap();

    let mut fitter = Fitter::new(&data, start.clone());
    fitter.selection_mut().mark_free(Scope::Orbit(0), "asini").unwrap();
    fitter.fit().unwrap();
    fitter.selection_mut().mark_free(Scope::Spin, "p0").unwrap();
    fitter.fit().unwrap();
    assert_eq!(fitter.history_len(), 2);

    fitter.revert().unwrap();
    fitter.revert().unwrap();
    assert_eq!(fitter.model(), &start);
    assert_eq!(fitter.fitness().unwrap(), before);
    assert_eq!(fitter.revert().unwrap_err(), TimingError::EmptyHistory);
}

#[test]
fn zero_uncertainty_fails_before_fitting() {
    let err = TimingDataset::new(vec![0.0, 1.0, 2.0], vec![0.01; 3], vec![1e-6, 0.0, 1e-6]).unwrap_err();
    assert!(matches!(err, TimingError::InvalidData(_)), "got {err:?}");
}
