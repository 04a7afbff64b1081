//! Bounded minimizers.
//!
//! The calibrator only talks to `BoundedOptimizer`; `ProjectedLbfgs` is the
//! implementation shipped with the crate. It works in the unit cube spanned
//! by the bounds so that parameters whose ranges differ by orders of
//! magnitude (`k1` vs `fc`) share one step scale.
use std::collections::VecDeque;

use crate::error::{Hbv96Error, Result};

/// Objective handed to an optimizer. Errors abort the search and are
/// returned from `minimize` unchanged.
pub type Objective<'a> = dyn FnMut(&[f64]) -> Result<f64> + 'a;

/// Stopping controls shared by every optimizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizerOptions {
    /// Relative objective reduction below which the search has converged.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 200,
        }
    }
}

/// Outcome of a completed search.
#[derive(Debug, Clone, PartialEq)]
pub struct Optimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub evaluations: usize,
    /// False when the iteration cap or a failed line search ended the run.
    pub converged: bool,
    pub message: String,
}

/// A minimizer over a box.
pub trait BoundedOptimizer {
    /// Minimize `objective` from `x0`, keeping every probe inside `bounds`.
    fn minimize(
        &mut self,
        objective: &mut Objective<'_>,
        x0: &[f64],
        bounds: &[(f64, f64)],
        options: &OptimizerOptions,
    ) -> Result<Optimum>;
}

/// Projected limited-memory BFGS with finite-difference gradients.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedLbfgs {
    /// Number of correction pairs kept.
    pub memory: usize,
    /// Finite-difference step in unit-cube coordinates.
    pub fd_step: f64,
    /// Projected-gradient infinity norm treated as stationary.
    pub pg_tolerance: f64,
    pub max_line_search: usize,
    /// Sufficient-decrease constant of the Armijo test.
    pub armijo: f64,
}

impl Default for ProjectedLbfgs {
    fn default() -> Self {
        Self {
            memory: 10,
            fd_step: 1e-6,
            pg_tolerance: 1e-8,
            max_line_search: 30,
            armijo: 1e-4,
        }
    }
}

/// Affine map between the bounds box and the unit cube.
struct UnitBox {
    lower: Vec<f64>,
    width: Vec<f64>,
}

impl UnitBox {
    fn new(bounds: &[(f64, f64)]) -> Result<Self> {
        let mut lower = Vec::with_capacity(bounds.len());
        let mut width = Vec::with_capacity(bounds.len());
        for (i, &(lo, hi)) in bounds.iter().enumerate() {
            if !lo.is_finite() || !hi.is_finite() || lo > hi {
                return Err(Hbv96Error::optimizer(format!(
                    "bound {i} = [{lo}, {hi}] is not a finite interval"
                )));
            }
            lower.push(lo);
            width.push(hi - lo);
        }
        Ok(Self { lower, width })
    }

    fn fixed(&self, i: usize) -> bool {
        self.width[i] == 0.0
    }

    fn to_unit(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .enumerate()
            .map(|(i, &v)| {
                if self.fixed(i) {
                    0.0
                } else {
                    ((v - self.lower[i]) / self.width[i]).clamp(0.0, 1.0)
                }
            })
            .collect()
    }

    fn from_unit(&self, z: &[f64]) -> Vec<f64> {
        z.iter()
            .enumerate()
            .map(|(i, &u)| self.lower[i] + u.clamp(0.0, 1.0) * self.width[i])
            .collect()
    }
}

/// Objective wrapper: maps out of the unit cube, counts calls, and sends
/// NaN to +inf.
struct Counted<'o, 'a> {
    objective: &'o mut Objective<'a>,
    space: UnitBox,
    evaluations: usize,
}

impl Counted<'_, '_> {
    fn eval(&mut self, z: &[f64]) -> Result<f64> {
        self.evaluations += 1;
        let x = self.space.from_unit(z);
        let value = (self.objective)(&x)?;
        Ok(if value.is_nan() { f64::INFINITY } else { value })
    }

    /// Forward differences, backward at the upper face. A non-finite probe
    /// falls back to the opposite side, then to a zero component.
    fn gradient(&mut self, z: &[f64], fz: f64, h: f64) -> Result<Vec<f64>> {
        let mut grad = vec![0.0; z.len()];
        let mut probe = z.to_vec();
        for i in 0..z.len() {
            if self.space.fixed(i) {
                continue;
            }
            let first = if z[i] + h <= 1.0 { h } else { -h };
            for step in [first, -first] {
                let target = z[i] + step;
                if !(0.0..=1.0).contains(&target) {
                    continue;
                }
                probe[i] = target;
                let f = self.eval(&probe)?;
                probe[i] = z[i];
                if f.is_finite() {
                    grad[i] = (f - fz) / step;
                    break;
                }
            }
        }
        Ok(grad)
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn inf_norm(a: &[f64]) -> f64 {
    a.iter().fold(0.0, |m, v| m.max(v.abs()))
}

/// Gradient with components that would push through an active face removed.
fn projected_gradient(z: &[f64], g: &[f64]) -> Vec<f64> {
    z.iter()
        .zip(g)
        .map(|(&zi, &gi)| {
            if (zi <= 0.0 && gi > 0.0) || (zi >= 1.0 && gi < 0.0) {
                0.0
            } else {
                gi
            }
        })
        .collect()
}

struct Correction {
    s: Vec<f64>,
    y: Vec<f64>,
    rho: f64,
}

/// L-BFGS two-loop recursion: returns the descent direction `-H g`.
fn two_loop(history: &VecDeque<Correction>, g: &[f64]) -> Vec<f64> {
    let mut q = g.to_vec();
    let mut alphas = Vec::with_capacity(history.len());
    for c in history.iter().rev() {
        let a = c.rho * dot(&c.s, &q);
        for (qi, yi) in q.iter_mut().zip(&c.y) {
            *qi -= a * yi;
        }
        alphas.push(a);
    }

    let gamma = history
        .back()
        .map(|c| dot(&c.s, &c.y) / dot(&c.y, &c.y))
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(1.0);
    for qi in &mut q {
        *qi *= gamma;
    }

    for (c, a) in history.iter().zip(alphas.iter().rev()) {
        let b = c.rho * dot(&c.y, &q);
        for (qi, si) in q.iter_mut().zip(&c.s) {
            *qi += si * (a - b);
        }
    }
    q.iter().map(|v| -v).collect()
}

impl BoundedOptimizer for ProjectedLbfgs {
    fn minimize(
        &mut self,
        objective: &mut Objective<'_>,
        x0: &[f64],
        bounds: &[(f64, f64)],
        options: &OptimizerOptions,
    ) -> Result<Optimum> {
        if x0.len() != bounds.len() {
            return Err(Hbv96Error::optimizer(format!(
                "start point has {} entries but {} bounds were given",
                x0.len(),
                bounds.len()
            )));
        }
        let space = UnitBox::new(bounds)?;
        let mut z = space.to_unit(x0);
        let mut fun = Counted {
            objective,
            space,
            evaluations: 0,
        };

        let mut f = fun.eval(&z)?;
        if !f.is_finite() {
            return Ok(Optimum {
                x: fun.space.from_unit(&z),
                value: f,
                iterations: 0,
                evaluations: fun.evaluations,
                converged: false,
                message: "objective is not finite at the start point".into(),
            });
        }
        let mut g = fun.gradient(&z, f, self.fd_step)?;
        let mut history: VecDeque<Correction> = VecDeque::with_capacity(self.memory);

        let mut iterations = 0;
        let mut converged = false;
        let mut message = String::from("iteration limit reached");

        while iterations < options.max_iterations {
            iterations += 1;

            let pg = projected_gradient(&z, &g);
            if inf_norm(&pg) <= self.pg_tolerance {
                converged = true;
                message = "projected gradient below tolerance".into();
                break;
            }

            let mut d = two_loop(&history, &pg);
            for (di, &zi) in d.iter_mut().zip(&z) {
                if (zi <= 0.0 && *di < 0.0) || (zi >= 1.0 && *di > 0.0) {
                    *di = 0.0;
                }
            }
            if dot(&g, &d) >= 0.0 {
                history.clear();
                d = pg.iter().map(|v| -v).collect();
            }

            let mut alpha = if history.is_empty() {
                (0.1 / inf_norm(&d)).min(1.0)
            } else {
                1.0
            };

            let mut accepted = None;
            for _ in 0..self.max_line_search {
                let trial: Vec<f64> = z
                    .iter()
                    .zip(&d)
                    .map(|(zi, di)| (zi + alpha * di).clamp(0.0, 1.0))
                    .collect();
                let step: Vec<f64> = trial.iter().zip(&z).map(|(a, b)| a - b).collect();
                if inf_norm(&step) == 0.0 {
                    break;
                }
                let f_trial = fun.eval(&trial)?;
                let decrease = self.armijo * dot(&g, &step).min(0.0);
                if f_trial.is_finite() && f_trial <= f + decrease {
                    accepted = Some((trial, step, f_trial));
                    break;
                }
                alpha *= 0.5;
            }

            let Some((z_new, s, f_new)) = accepted else {
                if history.is_empty() {
                    message = "line search found no decrease".into();
                    break;
                }
                history.clear();
                continue;
            };

            let g_new = fun.gradient(&z_new, f_new, self.fd_step)?;
            let y: Vec<f64> = g_new.iter().zip(&g).map(|(a, b)| a - b).collect();
            let sy = dot(&s, &y);
            if sy > 1e-12 {
                if history.len() == self.memory {
                    history.pop_front();
                }
                history.push_back(Correction { s, y, rho: 1.0 / sy });
            }

            let reduction = (f - f_new) / f.abs().max(f_new.abs()).max(1.0);
            z = z_new;
            f = f_new;
            g = g_new;

            tracing::debug!(iteration = iterations, value = f, "lbfgs step");

            if reduction <= options.tolerance {
                converged = true;
                message = "relative reduction below tolerance".into();
                break;
            }
        }

        Ok(Optimum {
            x: fun.space.from_unit(&z),
            value: f,
            iterations,
            evaluations: fun.evaluations,
            converged,
            message,
        })
    }
}
