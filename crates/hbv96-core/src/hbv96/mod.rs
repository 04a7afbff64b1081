/// HBV-96 -- a lumped conceptual rainfall-runoff model.
///
/// 18 calibratable parameters plus two fixed problem constants. A run
/// chains the precipitation, snow, soil and response routines per step,
/// then applies triangular-weighting routing over the whole sequence.
pub mod constants;
pub mod model;
pub mod outputs;
pub mod params;
pub mod processes;
pub mod routing;
pub mod run;
pub mod state;
