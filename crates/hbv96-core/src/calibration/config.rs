use serde::{Deserialize, Serialize};

use crate::error::{Hbv96Error, Result};
use crate::hbv96::constants::N_PARAMS;
use crate::metrics::{Direction, Objective};

/// What a trial whose simulation diverges contributes to the search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergencePolicy {
    /// Score the trial as +inf and keep searching.
    #[default]
    Penalize,
    /// Abort calibration with the divergence error.
    FailFast,
}

/// Calibration run options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Leading records excluded from scoring.
    pub warm_up: usize,
    /// Exclusive end of the scoring window; `None` scores to the last record.
    pub end: Option<usize>,
    pub objective: Objective,
    pub direction: Direction,
    /// Optimizer convergence threshold.
    pub tolerance: f64,
    /// Start point in canonical order; a random point in the bounds if absent.
    pub initial_guess: Option<Vec<f64>>,
    /// Log every trial at info level.
    pub verbose: bool,
    pub max_iterations: usize,
    pub max_evaluations: Option<usize>,
    pub time_limit_secs: Option<f64>,
    /// Seed for the random start point.
    pub seed: Option<u64>,
    pub divergence_policy: DivergencePolicy,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            warm_up: 0,
            end: None,
            objective: Objective::Rmse,
            direction: Direction::Minimize,
            tolerance: 1e-8,
            initial_guess: None,
            verbose: false,
            max_iterations: 200,
            max_evaluations: None,
            time_limit_secs: None,
            seed: None,
            divergence_policy: DivergencePolicy::Penalize,
        }
    }
}

impl CalibrationConfig {
    /// Check the options against a series of `n_records` records.
    pub fn validate(&self, n_records: usize) -> Result<()> {
        let end = self.end.unwrap_or(n_records);
        if end > n_records {
            return Err(Hbv96Error::config(format!(
                "end = {end} is past the last record ({n_records} records)"
            )));
        }
        if self.warm_up >= end {
            return Err(Hbv96Error::config(format!(
                "warm_up = {} leaves an empty scoring window [{}, {end})",
                self.warm_up, self.warm_up
            )));
        }
        if !(self.tolerance >= 0.0) {
            return Err(Hbv96Error::config(format!(
                "tolerance = {} must be non-negative",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(Hbv96Error::config("max_iterations must be >= 1"));
        }
        if self.max_evaluations == Some(0) {
            return Err(Hbv96Error::config("max_evaluations must be >= 1"));
        }
        if let Some(limit) = self.time_limit_secs {
            if !(limit > 0.0) || !limit.is_finite() {
                return Err(Hbv96Error::config(format!(
                    "time_limit_secs = {limit} must be positive and finite"
                )));
            }
        }
        if let Some(guess) = &self.initial_guess {
            if guess.len() != N_PARAMS {
                return Err(Hbv96Error::config(format!(
                    "initial_guess has {} values, expected {N_PARAMS}",
                    guess.len()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_json() {
        let cfg: CalibrationConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, CalibrationConfig::default());
        assert_eq!(cfg.divergence_policy, DivergencePolicy::Penalize);
    }

    #[test]
    fn parses_full_document() {
        let cfg: CalibrationConfig = serde_json::from_str(
            r#"{
                "warm_up": 10,
                "end": 200,
                "objective": "NSE",
                "direction": "maximize",
                "max_evaluations": 500,
                "seed": 7,
                "divergence_policy": "fail_fast"
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.warm_up, 10);
        assert_eq!(cfg.end, Some(200));
        assert_eq!(cfg.objective, Objective::Nse);
        assert_eq!(cfg.direction, Direction::Maximize);
        assert_eq!(cfg.max_evaluations, Some(500));
        assert_eq!(cfg.divergence_policy, DivergencePolicy::FailFast);
        assert!(cfg.validate(365).is_ok());
    }

    #[test]
    fn empty_window_rejected() {
        let cfg = CalibrationConfig {
            warm_up: 50,
            ..CalibrationConfig::default()
        };
        assert!(cfg.validate(50).is_err());
        assert!(cfg.validate(51).is_ok());

        let cfg = CalibrationConfig {
            warm_up: 5,
            end: Some(5),
            ..CalibrationConfig::default()
        };
        assert!(cfg.validate(100).is_err());
    }

    #[test]
    fn end_past_series_rejected() {
        let cfg = CalibrationConfig {
            end: Some(101),
            ..CalibrationConfig::default()
        };
        assert!(cfg.validate(100).is_err());
    }

    #[test]
    fn wrong_guess_length_rejected() {
        let cfg = CalibrationConfig {
            initial_guess: Some(vec![0.0; 3]),
            ..CalibrationConfig::default()
        };
        assert!(cfg.validate(100).is_err());
    }

    #[test]
    fn zero_budgets_rejected() {
        let cfg = CalibrationConfig {
            max_evaluations: Some(0),
            ..CalibrationConfig::default()
        };
        assert!(cfg.validate(100).is_err());
        let cfg = CalibrationConfig {
            time_limit_secs: Some(0.0),
            ..CalibrationConfig::default()
        };
        assert!(cfg.validate(100).is_err());
    }
}
