/// Core benchmarks for HBV-96 simulation and calibration.
///
/// Uses std::time::Instant for timing, a deterministic LCG PRNG for data generation,
/// and std::hint::black_box to prevent dead-code elimination.
use std::hint::black_box;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use hbv96_core::calibration::{CalibrationConfig, Calibrator, ProjectedLbfgs};
use hbv96_core::forcing::Forcing;
use hbv96_core::hbv96::model::{Hbv96Model, SimulationConfig};
use hbv96_core::hbv96::params::{ParameterBounds, Parameters, ProblemConstants};

const REPEATS: usize = 7;

/// Seeded synthetic hourly forcing with no observations.
fn make_forcing(n: usize, seed: u64) -> Result<Forcing, Box<dyn std::error::Error>> {
    let mut state = seed;
    let mut next_f64 = || -> f64 {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 33) as f64 / (1u64 << 31) as f64
    };

    let start = NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or("invalid start date")?;
    let dates: Vec<_> = (0..n)
        .map(|i| start + chrono::Duration::hours(i as i64))
        .collect();
    let prec: Vec<f64> = (0..n)
        .map(|_| {
            let p = next_f64();
            if p > 0.8 {
                (p - 0.8) * 20.0
            } else {
                0.0
            }
        })
        .collect();
    let temp: Vec<f64> = (0..n).map(|_| -10.0 + next_f64() * 30.0).collect();
    let ep: Vec<f64> = (0..n).map(|_| next_f64() * 0.3).collect();
    let q_rec = vec![f64::NAN; n];
    Ok(Forcing::from_columns(&dates, &prec, &temp, &ep, &q_rec, None)?)
}

/// Run a closure `REPEATS` times, return the median duration.
fn median_time<F: FnMut()>(mut f: F) -> Duration {
    let mut times: Vec<Duration> = (0..REPEATS)
        .map(|_| {
            let start = Instant::now();
            f();
            start.elapsed()
        })
        .collect();
    times.sort();
    times[REPEATS / 2]
}

fn model(n: usize, maxbas: usize) -> Result<Hbv96Model, Box<dyn std::error::Error>> {
    let config = SimulationConfig {
        maxbas,
        ..SimulationConfig::default()
    };
    let constants = ProblemConstants::new(1.0, 150.0)?;
    Ok(Hbv96Model::new(make_forcing(n, 42)?, constants, config)?)
}

fn bench_simulate(
    sizes: &[usize],
    maxbas: usize,
) -> Result<Vec<(String, usize, Duration)>, Box<dyn std::error::Error>> {
    let params = Parameters::default();
    let mut results = Vec::new();

    for &n in sizes {
        let model = model(n, maxbas)?;

        // Warmup
        black_box(model.simulate(&params)?);

        let dur = median_time(|| {
            let _ = black_box(model.simulate(&params));
        });
        results.push((format!("simulate/maxbas={maxbas}"), n, dur));
    }
    Ok(results)
}

fn bench_calibrate(
    sizes: &[usize],
) -> Result<Vec<(String, usize, Duration)>, Box<dyn std::error::Error>> {
    let mut results = Vec::new();

    for &n in sizes {
        let base = model(n, 3)?;
        let observed = base.simulate(&Parameters::default())?.q_sim();
        let forcing = base.forcing().clone().with_observed(&observed)?;
        let model = Hbv96Model::new(forcing, *base.constants(), base.config().clone())?;
        let config = CalibrationConfig {
            seed: Some(1),
            max_evaluations: Some(500),
            ..CalibrationConfig::default()
        };
        let calibrator = Calibrator::new(&model, ParameterBounds::default(), config)?;

        let dur = median_time(|| {
            let _ = black_box(calibrator.calibrate(&mut ProjectedLbfgs::default()));
        });
        results.push(("calibrate/500 evals".to_string(), n, dur));
    }
    Ok(results)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("HBV-96 Core Benchmarks");
    println!("============================================================");
    println!("{:<22} {:>6}   {:>12}", "Case", "N", "Median (ms)");
    println!("--------------------------------------------");

    let mut all_results: Vec<(String, usize, Duration)> = Vec::new();

    all_results.extend(bench_simulate(&[8760, 87600], 1)?);
    all_results.extend(bench_simulate(&[8760, 87600], 5)?);
    all_results.extend(bench_calibrate(&[720])?);

    for (case, n, dur) in &all_results {
        let ms = dur.as_secs_f64() * 1000.0;
        println!("{:<22} {:>6}      {:>8.2}", case, n, ms);
    }

    println!("============================================================");
    Ok(())
}
