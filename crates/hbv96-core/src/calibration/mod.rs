//! Parameter calibration.
//!
//! `Calibrator` turns a model and a bounds box into an objective over flat
//! parameter vectors and hands it to any `BoundedOptimizer`.
pub mod calibrate;
pub mod config;
pub mod optimizer;

pub use calibrate::{CalibrationResult, Calibrator, Termination};
pub use config::{CalibrationConfig, DivergencePolicy};
pub use optimizer::{BoundedOptimizer, Optimum, OptimizerOptions, ProjectedLbfgs};
