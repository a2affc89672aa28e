//! Data sources other than files: synthetic datasets for demos and tests.

pub mod sample;

pub use sample::*;
