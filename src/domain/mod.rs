//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - configuration enums (`TimeUnit`, `Weighting`)
//! - the validated timing dataset (`TimingDataset`)
//! - fit outputs (`ResidualPoint`)

pub mod types;

pub use types::*;
