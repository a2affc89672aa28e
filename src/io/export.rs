//! Export fit results.
//!
//! - per-measurement residuals as CSV (spreadsheets, plotting scripts)
//! - a dataset as CSV in the layout `ingest` reads back
//! - a JSON fit summary: fitted model, free parameters, fit quality

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{ResidualPoint, TimeUnit, TimingDataset, Weighting};
use crate::error::AppError;
use crate::fit::FitReport;
use crate::models::TimingModel;

/// Schema of the fit summary JSON.
#[derive(Debug, Clone, Serialize)]
pub struct FitSummaryFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub time_unit: TimeUnit,
    pub weighting: Weighting,
    pub measurements: usize,
    pub converged: bool,
    pub termination: String,
    pub evaluations: usize,
    pub fitness_before: f64,
    pub fitness_after: f64,
    /// Reduced chi-square, `None` when there are no degrees of freedom left.
    pub reduced_chi2: Option<f64>,
    pub warning: Option<String>,
    pub free_parameters: Vec<FittedParameter>,
    pub model: TimingModel,
}

#[derive(Debug, Clone, Serialize)]
pub struct FittedParameter {
    pub name: String,
    pub value: f64,
}

impl FitSummaryFile {
    pub fn new(report: &FitReport, model: &TimingModel, measurements: usize, weighting: Weighting) -> Self {
        let dof = measurements.saturating_sub(report.parameters.len());
        Self {
            tool: "porb".to_string(),
            generated_at: Utc::now(),
            time_unit: model.time_unit,
            weighting,
            measurements,
            converged: report.converged,
            termination: report.termination.clone(),
            evaluations: report.evaluations,
            fitness_before: report.fitness_before,
            fitness_after: report.fitness_after,
            reduced_chi2: (dof > 0).then(|| report.fitness_after / dof as f64),
            warning: report.warning.as_ref().map(ToString::to_string),
            free_parameters: report
                .parameters
                .iter()
                .map(|(id, value)| FittedParameter {
                    name: id.to_string(),
                    value: *value,
                })
                .collect(),
            model: model.clone(),
        }
    }
}

/// Write per-measurement residuals as CSV.
pub fn write_residuals<W: Write>(writer: W, points: &[ResidualPoint]) -> Result<(), AppError> {
    let mut out = csv::Writer::from_writer(writer);
    for p in points {
        out.serialize(p)
            .map_err(|e| AppError::new(2, format!("Failed to write residual CSV row: {e}")))?;
    }
    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush residual CSV: {e}")))
}

pub fn write_residuals_csv(path: &Path, points: &[ResidualPoint]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_residuals(file, points)
}

/// Write a dataset with `epoch,period,uncertainty` columns.
pub fn write_dataset<W: Write>(writer: W, dataset: &TimingDataset) -> Result<(), AppError> {
    let mut out = csv::Writer::from_writer(writer);
    for m in dataset.iter() {
        out.serialize(m)
            .map_err(|e| AppError::new(2, format!("Failed to write dataset CSV row: {e}")))?;
    }
    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush dataset CSV: {e}")))
}

pub fn write_dataset_csv(path: &Path, dataset: &TimingDataset) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create dataset CSV '{}': {e}", path.display())))?;
    write_dataset(file, dataset)
}

pub fn write_fit_summary_json(path: &Path, summary: &FitSummaryFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create summary JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, summary)
        .map_err(|e| AppError::new(2, format!("Failed to write summary JSON: {e}")))?;
    Ok(())
}
