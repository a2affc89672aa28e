//! Command-line parsing for the pulsar period fitter.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! modeling/fitting code. Everything here turns flags into library types
//! (`TimingModel`, `SampleConfig`, `FitOptions`); nothing here fits.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};

use crate::data::SampleConfig;
use crate::domain::{TimeUnit, Weighting};
use crate::fit::FitOptions;
use crate::models::{OrbitalElements, ParamId, SkyPosition, SpinParameters, TimingModel};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "porb", version, about = "Pulsar spin-period and orbit fitter")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a timing model to a CSV of period measurements.
    Fit(FitArgs),
    /// Sample a timing model and write the measurements as CSV.
    Simulate(SimulateArgs),
    /// Simulate a binary, perturb the free parameters, fit, and report.
    Demo(DemoArgs),
}

/// The starting timing model.
#[derive(Debug, Args, Clone)]
pub struct ModelArgs {
    /// Reference spin period (s).
    #[arg(long)]
    pub p0: f64,

    /// Spin period derivative (s per time unit).
    #[arg(long, default_value_t = 0.0)]
    pub p1: f64,

    /// Reference epoch of `p0`.
    #[arg(long, default_value_t = 0.0)]
    pub pepoch: f64,

    /// Unit of every epoch, `pepoch`, `t0` and `pb`.
    #[arg(long, value_enum, default_value_t = TimeUnit::Seconds)]
    pub unit: TimeUnit,

    /// Orbit as `pb=..,asini=..[,t0=..][,ecc=..][,om=..]`. Repeat for a
    /// hierarchy, inner orbit first.
    #[arg(long = "orbit", value_name = "ELEMENTS")]
    pub orbits: Vec<OrbitSpec>,

    /// Reference sky position `ra,dec` (radians); enables the annual Doppler term.
    #[arg(long, value_name = "RA,DEC")]
    pub sky: Option<SkySpec>,

    /// Epoch of the March equinox, in the model's time unit.
    #[arg(long, default_value_t = 0.0)]
    pub equinox_epoch: f64,
}

impl ModelArgs {
    pub fn to_model(&self) -> TimingModel {
        let mut model = TimingModel::isolated(SpinParameters::new(self.p0, self.p1, self.pepoch))
            .with_time_unit(self.unit);
        for orbit in &self.orbits {
            model = model.with_orbit(orbit.0);
        }
        if let Some(sky) = self.sky {
            model = model.with_sky(SkyPosition::new(sky.ra, sky.dec, self.equinox_epoch));
        }
        model
    }
}

/// Options for `porb fit`.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// CSV with epoch, period and uncertainty columns.
    #[arg(long, value_name = "CSV")]
    pub data: PathBuf,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Parameters to fit, e.g. `p0,pb,orbit[1].asini,sky.ra_offset`.
    #[arg(long, value_delimiter = ',', required = true)]
    pub free: Vec<ParamId>,

    /// Uncertainty for every row when the CSV has no uncertainty column.
    #[arg(long)]
    pub default_uncertainty: Option<f64>,

    #[command(flatten)]
    pub solver: SolverArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Minimizer options.
#[derive(Debug, Args, Clone)]
pub struct SolverArgs {
    /// How residuals are scaled before minimization.
    #[arg(long, value_enum, default_value_t = Weighting::Uncertainty)]
    pub weighting: Weighting,

    /// Evaluation budget, in units of (free parameters + 1) evaluations.
    #[arg(long, default_value_t = 200)]
    pub patience: usize,

    /// Undo the fit if it did not converge.
    #[arg(long)]
    pub revert_on_warning: bool,
}

impl SolverArgs {
    pub fn to_options(&self) -> FitOptions {
        FitOptions {
            weighting: self.weighting,
            patience: self.patience,
            ..FitOptions::default()
        }
    }
}

/// Report and export options shared by `fit` and `demo`.
#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    /// Residual rows to print (0 disables the table).
    #[arg(long, default_value_t = 20)]
    pub rows: usize,

    /// Largest normalized residuals to list after the table (0 disables).
    #[arg(long, default_value_t = 5)]
    pub top: usize,

    /// Export per-measurement residuals to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the fit summary (fitted model + fit quality) to JSON.
    #[arg(long = "export-summary")]
    pub export_summary: Option<PathBuf>,
}

/// Synthetic sampling options.
#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Number of epochs.
    #[arg(short = 'n', long, default_value_t = 50)]
    pub n_epochs: usize,

    /// First epoch.
    #[arg(long, default_value_t = 0.0)]
    pub start: f64,

    /// Distance between first and last epoch.
    #[arg(long, default_value_t = 36_000.0)]
    pub span: f64,

    /// Gaussian noise (s) added to each period.
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    /// Uncertainty (s) reported for each period.
    #[arg(long, default_value_t = 1e-6)]
    pub uncertainty: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Epoch jitter as a fraction of the grid spacing.
    #[arg(long, default_value_t = 0.0)]
    pub jitter: f64,
}

impl SampleArgs {
    pub fn to_config(&self) -> SampleConfig {
        SampleConfig {
            n_epochs: self.n_epochs,
            start: self.start,
            span: self.span,
            noise: self.noise,
            uncertainty: self.uncertainty,
            seed: self.seed,
            jitter: self.jitter,
        }
    }
}

/// Options for `porb simulate`.
#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    #[command(flatten)]
    pub sample: SampleArgs,

    /// Output CSV path.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,
}

/// Options for `porb demo`.
#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    #[command(flatten)]
    pub sample: SampleArgs,

    /// Add an eccentric outer orbit (hierarchical triple).
    #[arg(long)]
    pub triple: bool,

    /// Maximum relative perturbation of each free parameter.
    #[arg(long, default_value_t = 0.05)]
    pub perturb: f64,

    /// Seed for the perturbation.
    #[arg(long, default_value_t = 7)]
    pub perturb_seed: u64,

    #[command(flatten)]
    pub solver: SolverArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// `--orbit` value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitSpec(pub OrbitalElements);

impl FromStr for OrbitSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut pb = None;
        let mut asini = None;
        let mut elements = OrbitalElements::new(0.0, 0.0, 0.0, 0.0, 0.0);

        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("expected key=value, got '{pair}'"))?;
            let value: f64 = value
                .trim()
                .parse()
                .map_err(|_| format!("invalid number for '{}': '{}'", key.trim(), value.trim()))?;
            match key.trim().to_ascii_lowercase().as_str() {
                "pb" => pb = Some(value),
                "asini" => asini = Some(value),
                "t0" => elements.t0 = value,
                "ecc" => elements.ecc = value,
                "om" => elements.om = value,
                other => return Err(format!("unknown orbital element '{other}'")),
            }
        }

        elements.pb = pb.ok_or("missing 'pb'")?;
        elements.asini = asini.ok_or("missing 'asini'")?;
        elements.validate().map_err(|e| e.to_string())?;
        Ok(OrbitSpec(elements))
    }
}

/// `--sky` value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkySpec {
    pub ra: f64,
    pub dec: f64,
}

impl FromStr for SkySpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ra, dec) = s.split_once(',').ok_or("expected RA,DEC")?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .map_err(|_| format!("invalid angle '{}'", v.trim()))
        };
        Ok(SkySpec {
            ra: parse(ra)?,
            dec: parse(dec)?,
        })
    }
}
