//! Input/output adapters around the core.
//!
//! - CSV ingest + validation (`ingest`)
//! - residual/dataset CSV and fit summary JSON exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
