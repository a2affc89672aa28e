//! `pulsar-orbit` library crate.
//!
//! Models the apparent spin period of a pulsar (spin-down plus Doppler shifts
//! from any number of Keplerian orbits and an optional sky-position term) and
//! fits the model to period measurements.
//!
//! The binary (`porb`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the model and fitter are reusable from other front-ends

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
