//! Simulation context: forcing, basin constants and run options.
use serde::{Deserialize, Serialize};

use super::constants::{DEFAULT_Q0, DIVERGENCE_THRESHOLD};
use super::outputs::Simulation;
use super::params::{Parameters, ProblemConstants};
use super::routing::TriangularKernel;
use super::run;
use super::state::State;
use crate::error::{Hbv96Error, Result};
use crate::forcing::Forcing;

/// Options that shape a run but are not calibrated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Routing kernel width in timesteps.
    pub maxbas: usize,
    /// Bypass the snow routine for snow-free basins.
    pub disable_snow: bool,
    pub initial_state: State,
    /// Discharge of record 0 [m3/s].
    pub initial_discharge: f64,
    /// Discharge treated as numerical divergence [m3/s].
    pub divergence_threshold: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            maxbas: 1,
            disable_snow: false,
            initial_state: State::default(),
            initial_discharge: DEFAULT_Q0,
            divergence_threshold: DIVERGENCE_THRESHOLD,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.maxbas == 0 {
            return Err(Hbv96Error::config("maxbas must be >= 1"));
        }
        if !(self.divergence_threshold > 0.0) {
            return Err(Hbv96Error::config(format!(
                "divergence_threshold = {} must be positive",
                self.divergence_threshold
            )));
        }
        if !self.initial_discharge.is_finite() {
            return Err(Hbv96Error::config("initial_discharge must be finite"));
        }
        self.initial_state.check()
    }
}

/// An isolated simulation context.
///
/// Owns its forcing and configuration; `simulate` is a pure function of
/// the parameters handed to it, so one model can serve any number of trials.
#[derive(Debug, Clone)]
pub struct Hbv96Model {
    forcing: Forcing,
    constants: ProblemConstants,
    config: SimulationConfig,
    kernel: TriangularKernel,
}

impl Hbv96Model {
    pub fn new(
        forcing: Forcing,
        constants: ProblemConstants,
        config: SimulationConfig,
    ) -> Result<Self> {
        config.validate()?;
        let kernel = TriangularKernel::new(config.maxbas)?;
        Ok(Self {
            forcing,
            constants,
            config,
            kernel,
        })
    }

    pub fn forcing(&self) -> &Forcing {
        &self.forcing
    }

    pub fn constants(&self) -> &ProblemConstants {
        &self.constants
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn kernel(&self) -> &TriangularKernel {
        &self.kernel
    }

    /// Run the full sequence with `params`.
    pub fn simulate(&self, params: &Parameters) -> Result<Simulation> {
        tracing::debug!(
            steps = self.forcing.len(),
            maxbas = self.config.maxbas,
            "simulating"
        );
        run::run(
            params,
            &self.constants,
            &self.forcing,
            &self.kernel,
            &self.config.initial_state,
            self.config.initial_discharge,
            self.config.disable_snow,
            self.config.divergence_threshold,
        )
    }
}
