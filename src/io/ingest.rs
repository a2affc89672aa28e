//! CSV ingest for period measurements.
//!
//! Turns a CSV with one measurement per row into a validated `TimingDataset`.
//!
//! - **Flexible schema**: each column is found by any of a few common names
//!   (`epoch`/`t`, `period`/`p0`, `uncertainty`/`perr`), case-insensitive
//! - **Row-level validation**: bad rows are skipped and reported with their
//!   line number
//! - **No fitting logic here**

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{Measurement, TimingDataset};
use crate::error::AppError;

const EPOCH_COLUMNS: [&str; 3] = ["epoch", "t", "time"];
const PERIOD_COLUMNS: [&str; 3] = ["period", "p0", "p"];
const UNCERTAINTY_COLUMNS: [&str; 4] = ["uncertainty", "perr", "err", "sigma"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the validated dataset plus what was skipped.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub dataset: TimingDataset,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    epoch: usize,
    period: usize,
    uncertainty: Option<usize>,
}

/// Load a dataset from a CSV file.
///
/// `default_uncertainty` is used when the file has no uncertainty column.
pub fn load_dataset(path: &Path, default_uncertainty: Option<f64>) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_dataset(file, default_uncertainty)
}

/// Read a dataset from any CSV source.
pub fn read_dataset<R: Read>(source: R, default_uncertainty: Option<f64>) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    let columns = resolve_columns(&header_map, default_uncertainty)?;

    let mut measurements = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let parsed = result
            .map_err(|e| format!("CSV parse error: {e}"))
            .and_then(|record| parse_row(&record, columns, default_uncertainty));
        match parsed {
            Ok(m) => measurements.push(m),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    let rows_used = measurements.len();
    if rows_used == 0 {
        return Err(AppError::new(3, "No valid rows remain after validation."));
    }
    for err in &row_errors {
        tracing::warn!(line = err.line, message = %err.message, "skipped CSV row");
    }

    let dataset = TimingDataset::from_measurements(measurements)?;
    Ok(IngestedData {
        dataset,
        row_errors,
        rows_read,
        rows_used,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports may prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn find_column(header_map: &HashMap<String, usize>, aliases: &[&str]) -> Option<usize> {
    aliases.iter().find_map(|alias| header_map.get(*alias).copied())
}

fn resolve_columns(
    header_map: &HashMap<String, usize>,
    default_uncertainty: Option<f64>,
) -> Result<Columns, AppError> {
    let missing = |aliases: &[&str]| {
        AppError::new(
            2,
            format!("Missing required column: one of `{}`", aliases.join("`, `")),
        )
    };
    let epoch = find_column(header_map, &EPOCH_COLUMNS).ok_or_else(|| missing(&EPOCH_COLUMNS))?;
    let period = find_column(header_map, &PERIOD_COLUMNS).ok_or_else(|| missing(&PERIOD_COLUMNS))?;
    let uncertainty = find_column(header_map, &UNCERTAINTY_COLUMNS);
    if uncertainty.is_none() && default_uncertainty.is_none() {
        return Err(missing(&UNCERTAINTY_COLUMNS));
    }
    Ok(Columns {
        epoch,
        period,
        uncertainty,
    })
}

fn parse_row(
    record: &StringRecord,
    columns: Columns,
    default_uncertainty: Option<f64>,
) -> Result<Measurement, String> {
    let epoch = parse_required(record, columns.epoch, "epoch")?;
    let period = parse_required(record, columns.period, "period")?;
    let uncertainty = match (columns.uncertainty, default_uncertainty) {
        (Some(idx), fallback) => match record.get(idx).filter(|s| !s.is_empty()) {
            Some(_) => parse_required(record, idx, "uncertainty")?,
            None => fallback.ok_or_else(|| "Missing required value: `uncertainty`".to_string())?,
        },
        (None, Some(value)) => value,
        (None, None) => return Err("Missing required value: `uncertainty`".to_string()),
    };
    if uncertainty <= 0.0 {
        return Err(format!("Invalid uncertainty {uncertainty} (must be > 0)."));
    }
    Ok(Measurement {
        epoch,
        period,
        uncertainty,
    })
}

fn parse_required(record: &StringRecord, idx: usize, name: &str) -> Result<f64, String> {
    let raw = record
        .get(idx)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))?;
    let value = raw
        .parse::<f64>()
        .map_err(|_| format!("Invalid `{name}` value '{raw}'."))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("Non-finite `{name}` value."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_aliased_columns_in_any_order() {
        let csv = "perr,T,P0\n1e-6,0.0,0.01\n2e-6,10.5,0.0101\n";
        let data = read_dataset(csv.as_bytes(), None).unwrap();
        assert_eq!(data.rows_used, 2);
        assert_eq!(data.dataset.epochs(), &[0.0, 10.5]);
        assert_eq!(data.dataset.periods(), &[0.01, 0.0101]);
        assert_eq!(data.dataset.uncertainties(), &[1e-6, 2e-6]);
    }

    #[test]
    fn bad_rows_are_skipped_with_line_numbers() {
        let csv = "\u{feff}epoch,period,uncertainty\n0,0.01,1e-6\n1,abc,1e-6\n2,0.01,0\n3,0.01,1e-6\n";
        let data = read_dataset(csv.as_bytes(), None).unwrap();
        assert_eq!(data.rows_read, 4);
        assert_eq!(data.rows_used, 2);
        let lines: Vec<usize> = data.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 4]);
    }

    #[test]
    fn default_uncertainty_fills_missing_column() {
        let csv = "t,p0\n0,0.01\n1,0.02\n";
        assert_eq!(read_dataset(csv.as_bytes(), None).unwrap_err().exit_code(), 2);
        let data = read_dataset(csv.as_bytes(), Some(1e-5)).unwrap();
        assert_eq!(data.dataset.uncertainties(), &[1e-5, 1e-5]);
    }

    #[test]
    fn no_valid_rows_is_a_data_error() {
        let csv = "t,p0,perr\nx,y,z\n";
        assert_eq!(read_dataset(csv.as_bytes(), None).unwrap_err().exit_code(), 3);
    }
}
