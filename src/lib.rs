/// hbv96 -- HBV-96 rainfall-runoff simulation and calibration in Rust.
///
/// Re-exports the core crate and adds a deterministic synthetic forcing
/// generator for demonstrations and benchmarks.
pub use hbv96_core::*;

pub mod synthetic;
