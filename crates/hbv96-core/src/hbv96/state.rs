/// HBV-96 model state variables.
///
/// The five storages carried from one timestep to the next.
use serde::{Deserialize, Serialize};

use super::constants::{DEFAULT_LZ, DEFAULT_SM, DEFAULT_SP, DEFAULT_UZ, DEFAULT_WC};
use crate::error::{Hbv96Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Snow pack, solid part [mm].
    pub sp: f64,
    /// Soil moisture [mm].
    pub sm: f64,
    /// Upper zone storage [mm].
    pub uz: f64,
    /// Lower zone storage [mm].
    pub lz: f64,
    /// Liquid water content in the snow pack [mm].
    pub wc: f64,
}

impl State {
    /// Create a state, rejecting negative or non-finite storages.
    pub fn new(sp: f64, sm: f64, uz: f64, lz: f64, wc: f64) -> Result<Self> {
        let state = Self { sp, sm, uz, lz, wc };
        state.check()?;
        Ok(state)
    }

    /// Serialize to `[sp, sm, uz, lz, wc]`.
    pub fn to_array(&self) -> [f64; 5] {
        [self.sp, self.sm, self.uz, self.lz, self.wc]
    }

    /// True when every storage is non-negative.
    pub fn is_non_negative(&self) -> bool {
        self.to_array().iter().all(|&v| v >= 0.0)
    }

    pub(crate) fn check(&self) -> Result<()> {
        let names = super::constants::STATE_NAMES;
        for (name, v) in names.iter().zip(self.to_array()) {
            if !v.is_finite() || v < 0.0 {
                return Err(Hbv96Error::invalid_input(format!(
                    "initial state {name} = {v} must be finite and non-negative"
                )));
            }
        }
        Ok(())
    }
}

impl Default for State {
    /// sp=0, sm=30, uz=30, lz=30, wc=0.
    fn default() -> Self {
        Self {
            sp: DEFAULT_SP,
            sm: DEFAULT_SM,
            uz: DEFAULT_UZ,
            lz: DEFAULT_LZ,
            wc: DEFAULT_WC,
        }
    }
}
