//! HBV-96 simulation and calibration core.
//!
//! Simulates the HBV-96 lumped rainfall-runoff model over a validated
//! forcing sequence and calibrates its 18 parameters against observed
//! discharge.
pub mod calibration;
pub mod error;
pub mod forcing;
pub mod hbv96;
pub mod metrics;
pub mod traits;

pub use error::{Hbv96Error, Result};
