/// HBV-96 calibratable parameters, fixed problem constants and bounds.
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::constants::{LOWER_BOUNDS, N_PARAMS, PARAM_NAMES, UPPER_BOUNDS};
use crate::error::{Hbv96Error, Result};
use crate::traits::ModelParams;

/// The 18 calibratable parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// Lower temperature threshold [C].
    pub ltt: f64,
    /// Upper temperature threshold [C].
    pub utt: f64,
    /// Melting temperature threshold [C].
    pub ttm: f64,
    /// Degree-day factor [mm C^-1 h^-1].
    pub cfmax: f64,
    /// Field capacity [mm].
    pub fc: f64,
    /// Evapotranspiration corrector factor.
    pub e_corr: f64,
    /// Temperature anomaly factor for evapotranspiration.
    pub etf: f64,
    /// Limit for potential evapotranspiration, fraction of `fc`.
    pub lp: f64,
    /// Upper zone recession coefficient [h^-1].
    pub k: f64,
    /// Lower zone recession coefficient [h^-1].
    pub k1: f64,
    /// Upper zone response nonlinearity.
    pub alpha: f64,
    /// Soil shape coefficient.
    pub beta: f64,
    /// Water holding capacity of the snow pack.
    pub cwh: f64,
    /// Refreezing factor.
    pub cfr: f64,
    /// Capillary flux [mm h^-1].
    pub c_flux: f64,
    /// Percolation [mm h^-1].
    pub perc: f64,
    /// Rainfall corrector factor.
    pub rfcf: f64,
    /// Snowfall corrector factor.
    pub sfcf: f64,
}

impl Parameters {
    /// Create Parameters from an 18-element slice in canonical order.
    pub fn from_array(arr: &[f64]) -> Result<Self> {
        if arr.len() != N_PARAMS {
            return Err(Hbv96Error::invalid_parameter(format!(
                "expected {} parameters, got {}",
                N_PARAMS,
                arr.len()
            )));
        }
        if let Some(i) = arr.iter().position(|v| !v.is_finite()) {
            return Err(Hbv96Error::invalid_parameter(format!(
                "{} = {} is not finite",
                PARAM_NAMES[i], arr[i]
            )));
        }
        Ok(Self {
            ltt: arr[0],
            utt: arr[1],
            ttm: arr[2],
            cfmax: arr[3],
            fc: arr[4],
            e_corr: arr[5],
            etf: arr[6],
            lp: arr[7],
            k: arr[8],
            k1: arr[9],
            alpha: arr[10],
            beta: arr[11],
            cwh: arr[12],
            cfr: arr[13],
            c_flux: arr[14],
            perc: arr[15],
            rfcf: arr[16],
            sfcf: arr[17],
        })
    }

    /// Convert to an 18-element array.
    pub fn to_array(&self) -> [f64; N_PARAMS] {
        [
            self.ltt, self.utt, self.ttm, self.cfmax, self.fc, self.e_corr, self.etf, self.lp,
            self.k, self.k1, self.alpha, self.beta, self.cwh, self.cfr, self.c_flux, self.perc,
            self.rfcf, self.sfcf,
        ]
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Option<f64> {
        let i = PARAM_NAMES.iter().position(|&n| n == name)?;
        Some(self.to_array()[i])
    }

    /// Set a parameter by name.
    pub fn set(&mut self, name: &str, value: f64) -> Result<()> {
        let i = PARAM_NAMES
            .iter()
            .position(|&n| n == name)
            .ok_or_else(|| Hbv96Error::invalid_parameter(format!("unknown parameter '{name}'")))?;
        let mut arr = self.to_array();
        arr[i] = value;
        *self = Self::from_array(&arr)?;
        Ok(())
    }
}

impl Default for Parameters {
    /// A mid-range parameter set, inside the default bounds.
    fn default() -> Self {
        Self {
            ltt: -1.0,
            utt: 1.0,
            ttm: 0.5,
            cfmax: 0.2,
            fc: 200.0,
            e_corr: 1.0,
            etf: 0.1,
            lp: 0.35,
            k: 0.005,
            k1: 0.0001,
            alpha: 0.5,
            beta: 2.0,
            cwh: 0.05,
            cfr: 0.05,
            c_flux: 0.02,
            perc: 0.05,
            rfcf: 1.0,
            sfcf: 1.0,
        }
    }
}

impl ModelParams for Parameters {
    const N_PARAMS: usize = N_PARAMS;
    const PARAM_NAMES: &'static [&'static str] = PARAM_NAMES;

    fn from_slice(values: &[f64]) -> Result<Self> {
        Self::from_array(values)
    }

    fn to_vec(&self) -> Vec<f64> {
        self.to_array().to_vec()
    }
}

/// Problem constants fixed by the basin and data, never calibrated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProblemConstants {
    /// Hours per timestep.
    pub tfac: f64,
    /// Catchment area [km2].
    pub area: f64,
}

impl ProblemConstants {
    pub fn new(tfac: f64, area: f64) -> Result<Self> {
        if !(tfac.is_finite() && tfac > 0.0) {
            return Err(Hbv96Error::invalid_parameter(format!(
                "tfac = {tfac} must be positive"
            )));
        }
        if !(area.is_finite() && area > 0.0) {
            return Err(Hbv96Error::invalid_parameter(format!(
                "area = {area} must be positive"
            )));
        }
        Ok(Self { tfac, area })
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "tfac" => Some(self.tfac),
            "area" => Some(self.area),
            _ => None,
        }
    }

    /// Convert a depth flux [mm per step] into discharge [m3/s].
    #[inline]
    pub fn to_discharge(&self, depth: f64) -> f64 {
        self.area * depth / (super::constants::UNIT_CONVERSION * self.tfac)
    }
}

/// Per-parameter calibration box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBounds")]
pub struct ParameterBounds {
    lower: [f64; N_PARAMS],
    upper: [f64; N_PARAMS],
}

#[derive(Deserialize)]
struct RawBounds {
    lower: [f64; N_PARAMS],
    upper: [f64; N_PARAMS],
}

impl TryFrom<RawBounds> for ParameterBounds {
    type Error = Hbv96Error;

    fn try_from(raw: RawBounds) -> Result<Self> {
        Self::new(raw.lower, raw.upper)
    }
}

impl ParameterBounds {
    pub fn new(lower: [f64; N_PARAMS], upper: [f64; N_PARAMS]) -> Result<Self> {
        for i in 0..N_PARAMS {
            if !lower[i].is_finite() || !upper[i].is_finite() {
                return Err(Hbv96Error::config(format!(
                    "bounds for {} must be finite",
                    PARAM_NAMES[i]
                )));
            }
            if lower[i] > upper[i] {
                return Err(Hbv96Error::config(format!(
                    "lower bound {} exceeds upper bound {} for {}",
                    lower[i], upper[i], PARAM_NAMES[i]
                )));
            }
        }
        Ok(Self { lower, upper })
    }

    pub fn lower(&self) -> &[f64; N_PARAMS] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64; N_PARAMS] {
        &self.upper
    }

    /// Bounds as `(lower, upper)` pairs, the shape optimizers consume.
    pub fn as_pairs(&self) -> Vec<(f64, f64)> {
        self.lower.iter().copied().zip(self.upper.iter().copied()).collect()
    }

    pub fn contains(&self, params: &Parameters) -> bool {
        self.validate(params).is_ok()
    }

    /// Check every parameter against its bound, naming the first offender.
    pub fn validate(&self, params: &Parameters) -> Result<()> {
        for (i, &val) in params.to_array().iter().enumerate() {
            if !(self.lower[i]..=self.upper[i]).contains(&val) {
                return Err(Hbv96Error::invalid_parameter(format!(
                    "{} = {} is out of bounds [{}, {}]",
                    PARAM_NAMES[i], val, self.lower[i], self.upper[i]
                )));
            }
        }
        Ok(())
    }

    /// Clamp a flat parameter vector into the box.
    pub fn project(&self, values: &mut [f64]) {
        for (i, v) in values.iter_mut().enumerate().take(N_PARAMS) {
            *v = v.clamp(self.lower[i], self.upper[i]);
        }
    }

    /// Draw a point uniformly inside the box.
    pub fn sample_uniform<R: Rng + ?Sized>(&self, rng: &mut R) -> [f64; N_PARAMS] {
        let mut out = [0.0; N_PARAMS];
        for (i, v) in out.iter_mut().enumerate() {
            *v = rng.gen_range(self.lower[i]..=self.upper[i]);
        }
        out
    }
}

impl Default for ParameterBounds {
    fn default() -> Self {
        Self {
            lower: LOWER_BOUNDS,
            upper: UPPER_BOUNDS,
        }
    }
}
