//! Goodness-of-fit metrics for calibration objectives.
//!
//! Both metrics take observed and simulated slices of equal length, skip
//! pairs where either value is NaN, and return NaN rather than failing on
//! degenerate input.
use serde::{Deserialize, Serialize};

/// Pairs where both values are present.
fn valid_pairs<'a>(
    observed: &'a [f64],
    simulated: &'a [f64],
) -> impl Iterator<Item = (f64, f64)> + 'a {
    observed
        .iter()
        .zip(simulated)
        .filter(|(o, s)| !o.is_nan() && !s.is_nan())
        .map(|(&o, &s)| (o, s))
}

/// Root Mean Square Error. Range: [0, inf), 0 = perfect.
///
/// NaN when no valid pair exists.
pub fn rmse(observed: &[f64], simulated: &[f64]) -> f64 {
    let (sum, n) = valid_pairs(observed, simulated)
        .fold((0.0, 0usize), |(sum, n), (o, s)| (sum + (o - s).powi(2), n + 1));
    if n == 0 {
        return f64::NAN;
    }
    (sum / n as f64).sqrt()
}

/// Nash-Sutcliffe Efficiency. Range: (-inf, 1], 1 = perfect.
///
/// NaN when no valid pair exists or the observations have zero variance.
pub fn nse(observed: &[f64], simulated: &[f64]) -> f64 {
    let (sum_obs, n) = valid_pairs(observed, simulated)
        .fold((0.0, 0usize), |(sum, n), (o, _)| (sum + o, n + 1));
    if n == 0 {
        return f64::NAN;
    }
    let mean_obs = sum_obs / n as f64;

    let (numerator, denominator) = valid_pairs(observed, simulated).fold(
        (0.0, 0.0),
        |(num, den), (o, s)| (num + (o - s).powi(2), den + (o - mean_obs).powi(2)),
    );
    if denominator == 0.0 {
        return f64::NAN;
    }
    1.0 - numerator / denominator
}

/// Calibration objective, a closed set mapped to metric functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Objective {
    Rmse,
    Nse,
}

impl Objective {
    pub fn name(self) -> &'static str {
        match self {
            Objective::Rmse => "RMSE",
            Objective::Nse => "NSE",
        }
    }

    /// The metric function for this objective.
    pub fn function(self) -> fn(&[f64], &[f64]) -> f64 {
        match self {
            Objective::Rmse => rmse,
            Objective::Nse => nse,
        }
    }

    pub fn evaluate(self, observed: &[f64], simulated: &[f64]) -> f64 {
        (self.function())(observed, simulated)
    }

    /// The direction in which this metric improves.
    pub fn natural_direction(self) -> Direction {
        match self {
            Objective::Rmse => Direction::Minimize,
            Objective::Nse => Direction::Maximize,
        }
    }
}

impl std::str::FromStr for Objective {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RMSE" => Ok(Objective::Rmse),
            "NSE" => Ok(Objective::Nse),
            other => Err(format!("unknown objective '{other}', expected RMSE or NSE")),
        }
    }
}

/// Whether the calibrator should minimize or maximize the objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Minimize,
    Maximize,
}

impl Direction {
    /// Map a score into the minimization space the optimizer works in.
    pub fn to_minimized(self, score: f64) -> f64 {
        match self {
            Direction::Minimize => score,
            Direction::Maximize => -score,
        }
    }
}

/// Slice paired series to the scoring window `[warm_up, end)`.
///
/// `end` is clamped to the series length; an empty window yields empty
/// slices, which every metric scores as NaN.
pub fn score_window<'a>(
    observed: &'a [f64],
    simulated: &'a [f64],
    warm_up: usize,
    end: Option<usize>,
) -> (&'a [f64], &'a [f64]) {
    let len = observed.len().min(simulated.len());
    let end = end.unwrap_or(len).min(len);
    let start = warm_up.min(end);
    (&observed[start..end], &simulated[start..end])
}
