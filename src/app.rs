//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and initializes logging
//! - parses CLI arguments
//! - loads or simulates a dataset
//! - runs the fit pipeline
//! - prints reports and writes optional exports

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, DemoArgs, FitArgs, OutputArgs, SimulateArgs};
use crate::domain::{TimingDataset, Weighting};
use crate::error::AppError;
use crate::io::FitSummaryFile;

pub mod pipeline;

/// Entry point for the `porb` binary.
pub fn run() -> Result<(), AppError> {
    // `RUST_LOG` may come from a project-local `.env`.
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = crate::cli::Cli::parse();
    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Simulate(args) => handle_simulate(args),
        Command::Demo(args) => handle_demo(args),
    }
}

/// Logs go to stderr so stdout carries only reports.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber may already be installed when embedded; keep that one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let ingest = crate::io::load_dataset(&args.data, args.default_uncertainty)?;
    if !ingest.row_errors.is_empty() {
        eprintln!(
            "Skipped {} of {} rows (first: line {}: {}).",
            ingest.row_errors.len(),
            ingest.rows_read,
            ingest.row_errors[0].line,
            ingest.row_errors[0].message
        );
    }

    let model = args.model.to_model();
    println!("{}", crate::report::format_dataset_summary(&ingest.dataset, &model));

    let run = pipeline::run_fit(
        &ingest.dataset,
        model,
        &args.free,
        args.solver.to_options(),
        args.solver.revert_on_warning,
    )?;
    print_and_export(&run, &ingest.dataset, args.solver.weighting, &args.output)
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let model = args.model.to_model();
    let dataset = crate::data::generate_dataset(&model, &args.sample.to_config())?;
    crate::io::write_dataset_csv(&args.out, &dataset)?;
    println!(
        "Wrote {} measurements to {}",
        dataset.len(),
        args.out.display()
    );
    Ok(())
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let demo = pipeline::run_demo(
        &args.sample.to_config(),
        args.triple,
        args.perturb,
        args.perturb_seed,
        args.solver.to_options(),
        args.solver.revert_on_warning,
    )?;

    println!("True model:\n{}", crate::report::format_model(&demo.truth));
    println!("Starting guess:\n{}", crate::report::format_model(&demo.guess));
    print_and_export(&demo.fit, &demo.dataset, args.solver.weighting, &args.output)
}

fn print_and_export(
    run: &pipeline::FitRun,
    dataset: &TimingDataset,
    weighting: Weighting,
    output: &OutputArgs,
) -> Result<(), AppError> {
    println!(
        "{}",
        crate::report::format_fit_summary(&run.report, &run.model, dataset.len())
    );
    if run.reverted {
        println!("Fit did not converge; model reverted to the starting values.\n");
    }
    if output.rows > 0 {
        println!(
            "{}",
            crate::report::format_residual_table(&run.residuals, Some(output.rows))
        );
    }
    if output.top > 0 {
        let top = crate::report::largest_residuals(&run.residuals, output.top);
        println!("Largest residuals:");
        println!("{}", crate::report::format_residual_table(&top, None));
    }

    if let Some(path) = &output.export {
        crate::io::write_residuals_csv(path, &run.residuals)?;
    }
    if let Some(path) = &output.export_summary {
        let summary = FitSummaryFile::new(&run.report, &run.model, dataset.len(), weighting);
        crate::io::write_fit_summary_json(path, &summary)?;
    }

    Ok(())
}
