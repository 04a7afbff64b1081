//! Error types for simulation and calibration.

use thiserror::Error;

/// Errors raised by the HBV-96 core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Hbv96Error {
    /// Simulated discharge left the numerically stable range.
    #[error("Simulation diverged at step {step}: q_sim = {discharge} exceeds threshold {threshold}")]
    Divergence {
        step: usize,
        discharge: f64,
        threshold: f64,
    },

    #[error("Invalid input: {what}")]
    InvalidInput { what: String },

    #[error("Invalid parameter: {what}")]
    InvalidParameter { what: String },

    #[error("Configuration error: {what}")]
    Config { what: String },

    #[error("Optimizer error: {what}")]
    Optimizer { what: String },

    /// Raised from inside an objective to stop the optimizer early.
    #[error("Evaluation budget exhausted after {evaluations} evaluations")]
    BudgetExhausted { evaluations: usize },
}

impl Hbv96Error {
    pub fn invalid_input(what: impl Into<String>) -> Self {
        Self::InvalidInput { what: what.into() }
    }

    pub fn invalid_parameter(what: impl Into<String>) -> Self {
        Self::InvalidParameter { what: what.into() }
    }

    pub fn config(what: impl Into<String>) -> Self {
        Self::Config { what: what.into() }
    }

    pub fn optimizer(what: impl Into<String>) -> Self {
        Self::Optimizer { what: what.into() }
    }

    /// True for the divergence kind, which calibration may penalize.
    pub fn is_divergence(&self) -> bool {
        matches!(self, Self::Divergence { .. })
    }
}

pub type Result<T> = std::result::Result<T, Hbv96Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divergence_message_names_step_and_threshold() {
        let err = Hbv96Error::Divergence {
            step: 12,
            discharge: 2.5e4,
            threshold: 1e4,
        };
        let msg = err.to_string();
        assert!(msg.contains("step 12"));
        assert!(msg.contains("10000"));
        assert!(err.is_divergence());
    }

    #[test]
    fn constructors_fill_what() {
        assert_eq!(
            Hbv96Error::config("maxbas must be >= 1").to_string(),
            "Configuration error: maxbas must be >= 1"
        );
        assert!(!Hbv96Error::invalid_input("empty").is_divergence());
    }
}
