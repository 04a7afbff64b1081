use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::config::{CalibrationConfig, DivergencePolicy};
use super::optimizer::{BoundedOptimizer, OptimizerOptions};
use crate::error::{Hbv96Error, Result};
use crate::hbv96::model::Hbv96Model;
use crate::hbv96::outputs::Simulation;
use crate::hbv96::params::{ParameterBounds, Parameters};
use crate::metrics::{self, Direction, Objective};
use crate::traits::ModelParams;

/// Why a calibration run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Converged,
    IterationLimit,
    /// The optimizer gave up before its iteration cap without converging.
    Stalled,
    BudgetExhausted,
    /// Every trial diverged, including all restarts.
    Diverged,
}

/// Fresh random starts tried after a search that found no finite trial.
const MAX_RESTARTS: usize = 10;

/// Best parameters found and the run that produced them.
#[derive(Debug, Clone, Serialize)]
pub struct CalibrationResult {
    pub parameters: Parameters,
    pub objective: Objective,
    pub direction: Direction,
    /// Score at `parameters`, in the objective's own sign.
    pub objective_value: f64,
    pub evaluations: usize,
    pub diverged_trials: usize,
    pub termination: Termination,
    /// Optimizer iterations; unknown when a budget cut the search short.
    pub iterations: Option<usize>,
    /// Run at `parameters`; absent when every trial diverged.
    pub simulation: Option<Simulation>,
}

/// Bookkeeping shared across trials of one run.
struct TrialLog {
    evaluations: usize,
    diverged: usize,
    started: Instant,
    time_limit: Option<Duration>,
    /// Best vector and its minimized score.
    best: Option<(Vec<f64>, f64)>,
}

impl TrialLog {
    fn new(time_limit_secs: Option<f64>) -> Self {
        Self {
            evaluations: 0,
            diverged: 0,
            started: Instant::now(),
            time_limit: time_limit_secs.map(Duration::from_secs_f64),
            best: None,
        }
    }

    fn check_budget(&self, max_evaluations: Option<usize>) -> Result<()> {
        let out_of_evaluations = max_evaluations.is_some_and(|max| self.evaluations >= max);
        let out_of_time = self.evaluations > 0
            && self
                .time_limit
                .is_some_and(|limit| self.started.elapsed() >= limit);
        if out_of_evaluations || out_of_time {
            return Err(Hbv96Error::BudgetExhausted {
                evaluations: self.evaluations,
            });
        }
        Ok(())
    }

    fn offer(&mut self, values: &[f64], minimized: f64) {
        let improves = match &self.best {
            Some((_, best)) => minimized < *best,
            None => true,
        };
        if improves {
            self.best = Some((values.to_vec(), minimized));
        }
    }
}

/// Searches the bounded parameter space of one model.
#[derive(Debug)]
pub struct Calibrator<'m> {
    model: &'m Hbv96Model,
    bounds: ParameterBounds,
    config: CalibrationConfig,
}

impl<'m> Calibrator<'m> {
    pub fn new(
        model: &'m Hbv96Model,
        bounds: ParameterBounds,
        config: CalibrationConfig,
    ) -> Result<Self> {
        config.validate(model.forcing().len())?;
        if let Some(guess) = &config.initial_guess {
            bounds.validate(&Parameters::from_slice(guess)?)?;
        }
        Ok(Self {
            model,
            bounds,
            config,
        })
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    pub fn bounds(&self) -> &ParameterBounds {
        &self.bounds
    }

    /// Score a finished simulation over the configured window.
    pub fn evaluate(&self, simulation: &Simulation) -> f64 {
        let q_rec = simulation.q_rec();
        let q_sim = simulation.q_sim();
        let (obs, sim) =
            metrics::score_window(&q_rec, &q_sim, self.config.warm_up, self.config.end);
        self.config.objective.evaluate(obs, sim)
    }

    /// Simulate `params` and score the run. Divergence is returned as an
    /// error, not penalized.
    pub fn score(&self, params: &Parameters) -> Result<f64> {
        let simulation = self.model.simulate(params)?;
        Ok(self.evaluate(&simulation))
    }

    fn rng(&self) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    fn start_from(&self, rng: &mut StdRng) -> Vec<f64> {
        match &self.config.initial_guess {
            Some(guess) => guess.clone(),
            None => self.bounds.sample_uniform(rng).to_vec(),
        }
    }

    /// The configured guess, or a uniform draw from the bounds.
    pub fn initial_point(&self) -> Vec<f64> {
        self.start_from(&mut self.rng())
    }

    /// One trial in the optimizer's minimization space.
    fn trial(&self, x: &[f64], log: &mut TrialLog) -> Result<f64> {
        log.check_budget(self.config.max_evaluations)?;
        log.evaluations += 1;

        let mut values = x.to_vec();
        self.bounds.project(&mut values);
        let params = Parameters::from_slice(&values)?;

        let (score, minimized) = match self.score(&params) {
            Ok(score) => {
                let minimized = self.config.direction.to_minimized(score);
                (score, if minimized.is_nan() { f64::INFINITY } else { minimized })
            }
            Err(err) if err.is_divergence() => match self.config.divergence_policy {
                DivergencePolicy::Penalize => {
                    log.diverged += 1;
                    warn!(trial = log.evaluations, error = %err, "penalizing divergent trial");
                    (f64::NAN, f64::INFINITY)
                }
                DivergencePolicy::FailFast => return Err(err),
            },
            Err(err) => return Err(err),
        };

        if self.config.verbose {
            info!(
                trial = log.evaluations,
                objective = self.config.objective.name(),
                score,
                "trial"
            );
        } else {
            debug!(trial = log.evaluations, score, "trial");
        }

        log.offer(&values, minimized);
        Ok(minimized)
    }

    /// Run the optimizer from the initial point and re-simulate the best
    /// trial.
    ///
    /// When no trial of a search produced a finite score, the search is
    /// repeated from fresh uniform draws, up to `MAX_RESTARTS` times. If all
    /// of them diverge the result carries `Termination::Diverged`.
    pub fn calibrate(&self, optimizer: &mut dyn BoundedOptimizer) -> Result<CalibrationResult> {
        let mut rng = self.rng();
        let mut x0 = self.start_from(&mut rng);
        let pairs = self.bounds.as_pairs();
        let options = OptimizerOptions {
            tolerance: self.config.tolerance,
            max_iterations: self.config.max_iterations,
        };

        info!(
            objective = self.config.objective.name(),
            direction = ?self.config.direction,
            warm_up = self.config.warm_up,
            records = self.model.forcing().len(),
            "starting calibration"
        );

        let mut log = TrialLog::new(self.config.time_limit_secs);
        let mut restarts = 0;
        let outcome = loop {
            let outcome = {
                let mut objective = |x: &[f64]| self.trial(x, &mut log);
                optimizer.minimize(&mut objective, &x0, &pairs, &options)
            };
            let found_finite = log.best.as_ref().is_some_and(|(_, v)| v.is_finite());
            if outcome.is_err() || found_finite || restarts == MAX_RESTARTS {
                break outcome;
            }
            restarts += 1;
            x0 = self.bounds.sample_uniform(&mut rng).to_vec();
            warn!(restarts, "no finite trial, restarting from a random point");
        };

        let (termination, iterations) = match outcome {
            Ok(optimum) => {
                let termination = if optimum.converged {
                    Termination::Converged
                } else if optimum.iterations >= options.max_iterations {
                    Termination::IterationLimit
                } else {
                    Termination::Stalled
                };
                debug!(message = %optimum.message, "optimizer finished");
                (termination, Some(optimum.iterations))
            }
            Err(Hbv96Error::BudgetExhausted { evaluations }) => {
                warn!(evaluations, "budget exhausted, keeping best trial");
                (Termination::BudgetExhausted, None)
            }
            Err(err) => return Err(err),
        };

        let Some((best, best_value)) = log.best else {
            return Err(Hbv96Error::optimizer("no trial was evaluated"));
        };
        let parameters = Parameters::from_slice(&best)?;
        let (termination, simulation, objective_value) = if best_value.is_finite() {
            let simulation = self.model.simulate(&parameters)?;
            let value = self.evaluate(&simulation);
            (termination, Some(simulation), value)
        } else {
            warn!(
                evaluations = log.evaluations,
                restarts, "every trial diverged"
            );
            (Termination::Diverged, None, f64::NAN)
        };

        info!(
            objective = self.config.objective.name(),
            value = objective_value,
            evaluations = log.evaluations,
            diverged = log.diverged,
            termination = ?termination,
            "calibration finished"
        );

        Ok(CalibrationResult {
            parameters,
            objective: self.config.objective,
            direction: self.config.direction,
            objective_value,
            evaluations: log.evaluations,
            diverged_trials: log.diverged,
            termination,
            iterations,
            simulation,
        })
    }
}
