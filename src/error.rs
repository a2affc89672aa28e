//! Error types.
//!
//! Two layers:
//!
//! - [`TimingError`]: the library taxonomy returned by the model, the parameter
//!   selection and the fitter.
//! - [`AppError`]: what the `porb` binary reports, a message plus a process exit
//!   code.

use thiserror::Error;

/// Result alias for library operations.
pub type TimingResult<T> = Result<T, TimingError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimingError {
    /// Kepler's equation was not solved to tolerance within the iteration bound.
    #[error(
        "Kepler solve did not converge for M={mean_anomaly}, e={eccentricity}: \
         last estimate E={estimate}, residual {residual:e}"
    )]
    Convergence {
        mean_anomaly: f64,
        eccentricity: f64,
        estimate: f64,
        residual: f64,
    },

    /// A parameter name (or orbit index) that the model does not have.
    #[error("Unknown parameter '{name}' in scope {scope}.")]
    UnknownParameter { scope: String, name: String },

    /// A parameter vector whose length differs from the free-parameter count.
    #[error("Parameter vector has length {found}, expected {expected}.")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("No free parameters selected; mark at least one parameter free before fitting.")]
    NoFreeParameters,

    #[error("No earlier model to revert to.")]
    EmptyHistory,

    /// The timing dataset violates its invariants.
    #[error("Invalid timing data: {0}")]
    InvalidData(String),

    /// A parameter value outside its physical domain (e.g. `ecc >= 1`).
    #[error("Invalid value {value} for {parameter}: {reason}")]
    InvalidParameter {
        parameter: String,
        value: f64,
        reason: &'static str,
    },
}

impl TimingError {
    pub(crate) fn invalid_data(message: impl Into<String>) -> Self {
        TimingError::InvalidData(message.into())
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<TimingError> for AppError {
    fn from(err: TimingError) -> Self {
        let exit_code = match &err {
            TimingError::UnknownParameter { .. }
            | TimingError::DimensionMismatch { .. }
            | TimingError::NoFreeParameters
            | TimingError::EmptyHistory
            | TimingError::InvalidParameter { .. } => 2,
            TimingError::InvalidData(_) => 3,
            TimingError::Convergence { .. } => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_errors_map_to_exit_codes() {
        assert_eq!(AppError::from(TimingError::NoFreeParameters).exit_code(), 2);
        assert_eq!(
            AppError::from(TimingError::invalid_data("zero uncertainty")).exit_code(),
            3
        );
        let conv = TimingError::Convergence {
            mean_anomaly: 1.0,
            eccentricity: 0.5,
            estimate: 1.2,
            residual: 1e-3,
        };
        assert_eq!(AppError::from(conv).exit_code(), 4);
    }
}
