//! Deterministic synthetic forcing.
//!
//! Produces plausible precipitation, temperature and evapotranspiration
//! series from a seed, so runs can be reproduced without input files.
use std::f64::consts::TAU;

use chrono::{NaiveDate, NaiveDateTime};
use hbv96_core::forcing::{Forcing, Resolution};
use hbv96_core::hbv96::model::{Hbv96Model, SimulationConfig};
use hbv96_core::hbv96::params::{Parameters, ProblemConstants};
use hbv96_core::{Hbv96Error, Result};

/// Linear congruential generator; not for anything but test data.
#[derive(Debug, Clone)]
pub struct Lcg {
    state: u64,
}

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Uniform draw in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.state >> 33) as f64 / (1u64 << 31) as f64
    }
}

fn start_date() -> Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(2000, 10, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| Hbv96Error::invalid_input("invalid synthetic start date"))
}

/// `steps` records of forcing starting on 2000-10-01, with no observations.
///
/// Temperature follows an annual and (hourly data only) a diurnal cycle
/// plus noise. Precipitation falls on about one step in six.
pub fn forcing(steps: usize, seed: u64, resolution: Resolution) -> Result<Forcing> {
    let mut rng = Lcg::new(seed);
    let start = start_date()?;
    let tfac = resolution.tfac();

    let mut dates = Vec::with_capacity(steps);
    let mut prec = Vec::with_capacity(steps);
    let mut temp = Vec::with_capacity(steps);
    let mut ep = Vec::with_capacity(steps);

    for i in 0..steps {
        let hours = i as f64 * tfac;
        let day = hours / 24.0;
        let annual = -10.0 * (TAU * day / 365.0).cos();
        let diurnal = if resolution == Resolution::Hourly {
            -3.0 * (TAU * (hours % 24.0) / 24.0).cos()
        } else {
            0.0
        };
        let t = 4.0 + annual + diurnal + 2.0 * (rng.next_f64() - 0.5);

        let wet = rng.next_f64() < 1.0 / 6.0;
        let p = if wet {
            // heavier totals per step at coarser resolution
            -rng.next_f64().max(1e-12).ln() * 1.5 * tfac.sqrt()
        } else {
            0.0
        };

        dates.push(start + resolution.step() * i as i32);
        prec.push(p);
        temp.push(t);
        ep.push((0.01 * (t + 5.0)).max(0.0) * tfac);
    }

    let q_rec = vec![f64::NAN; steps];
    Forcing::from_columns(&dates, &prec, &temp, &ep, &q_rec, None)
}

/// Build a model whose observed discharge is its own output at `truth`.
pub fn observed_model(
    forcing: Forcing,
    constants: ProblemConstants,
    config: SimulationConfig,
    truth: &Parameters,
) -> Result<Hbv96Model> {
    let probe = Hbv96Model::new(forcing, constants, config)?;
    let q = probe.simulate(truth)?.q_sim();
    let forcing = probe.forcing().clone().with_observed(&q)?;
    Hbv96Model::new(forcing, constants, probe.config().clone())
}
