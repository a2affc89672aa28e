//! Formatted terminal output.
//!
//! Formatting lives in one place so the model and fitting code stay free of
//! presentation concerns and output changes stay local.

use crate::domain::{ResidualPoint, TimingDataset};
use crate::fit::FitReport;
use crate::models::TimingModel;

/// Dataset overview: size, epoch range, period range.
pub fn format_dataset_summary(dataset: &TimingDataset, model: &TimingModel) -> String {
    let unit = model.time_unit.label();
    let (first, last) = dataset.epoch_range();
    let p_min = dataset.periods().iter().copied().fold(f64::INFINITY, f64::min);
    let p_max = dataset.periods().iter().copied().fold(f64::NEG_INFINITY, f64::max);
    format!(
        "Measurements: n={} | epoch=[{first:.3}, {last:.3}]{unit} | period=[{p_min:.12}, {p_max:.12}]s\n",
        dataset.len()
    )
}

/// Every model parameter, one block per component.
pub fn format_model(model: &TimingModel) -> String {
    let unit = model.time_unit.label();
    let mut out = String::new();

    out.push_str(&format!(
        "spin     p0={:.15}s p1={:.6e} pepoch={}{unit}\n",
        model.spin.p0, model.spin.p1, model.spin.pepoch
    ));
    for (i, o) in model.orbits.iter().enumerate() {
        let label = format!("orbit[{i}]");
        out.push_str(&format!(
            "{label:<8} pb={:.9}{unit} asini={:.9}lt-{unit} t0={:.6}{unit} ecc={:.9} om={:.9}rad{}\n",
            o.pb,
            o.asini,
            o.t0,
            o.ecc,
            o.om,
            if o.is_circular() { " (circular)" } else { "" },
        ));
    }
    if let Some(sky) = &model.sky {
        out.push_str(&format!(
            "sky      ra={:.9} dec={:.9} ra_offset={:.6e} dec_offset={:.6e} (rad)\n",
            sky.ra, sky.dec, sky.ra_offset, sky.dec_offset
        ));
    }

    out
}

/// Fit outcome plus the committed model.
pub fn format_fit_summary(report: &FitReport, model: &TimingModel, measurements: usize) -> String {
    let mut out = String::new();

    out.push_str("=== porb - pulsar period fit ===\n");
    out.push_str(&format!(
        "Status: {} ({}, {} evaluations)\n",
        if report.converged { "converged" } else { "NOT converged" },
        report.termination,
        report.evaluations
    ));
    let dof = measurements.saturating_sub(report.parameters.len());
    out.push_str(&format!(
        "Fitness (chi2): {:.6e} -> {:.6e}",
        report.fitness_before, report.fitness_after
    ));
    if dof > 0 {
        out.push_str(&format!(" | reduced={:.4} (dof={dof})", report.fitness_after / dof as f64));
    }
    out.push('\n');
    if let Some(warning) = &report.warning {
        out.push_str(&format!("Warning: {warning}\n"));
    }

    out.push_str("\nFree parameters:\n");
    for (id, value) in &report.parameters {
        out.push_str(&format!("- {:<18} {value:.12e}\n", id.to_string()));
    }

    out.push_str("\nModel:\n");
    out.push_str(&format_model(model));
    out
}

/// Residual table, optionally limited to the first `limit` rows.
pub fn format_residual_table(points: &[ResidualPoint], limit: Option<usize>) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:>14} {:>7} {:>18} {:>18} {:>12} {:>8}",
            "epoch", "phase", "observed", "predicted", "residual", "norm"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(&format!(
        "{:-<14} {:-<7} {:-<18} {:-<18} {:-<12} {:-<8}\n",
        "", "", "", "", "", ""
    ));

    let shown = limit.unwrap_or(points.len()).min(points.len());
    for p in &points[..shown] {
        let phase = p.phase.map(|v| format!("{v:.4}")).unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:>14.4} {:>7} {:>18.15} {:>18.15} {:>12.4e} {:>8.3}\n",
            p.epoch,
            phase,
            p.observed,
            p.predicted,
            p.residual,
            p.normalized()
        ));
    }
    if shown < points.len() {
        out.push_str(&format!("... {} more rows\n", points.len() - shown));
    }

    out
}
