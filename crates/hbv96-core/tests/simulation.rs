use approx::assert_relative_eq;
use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;

use hbv96_core::forcing::Forcing;
use hbv96_core::hbv96::constants::{LOWER_BOUNDS, N_PARAMS, UPPER_BOUNDS};
use hbv96_core::hbv96::model::{Hbv96Model, SimulationConfig};
use hbv96_core::hbv96::params::{Parameters, ProblemConstants};
use hbv96_core::hbv96::processes::partition_precipitation;
use hbv96_core::hbv96::routing::TriangularKernel;
use hbv96_core::hbv96::run::run_unrouted;
use hbv96_core::hbv96::state::State;

fn hourly(n: usize) -> Vec<NaiveDateTime> {
    let start = NaiveDate::from_ymd_opt(2019, 7, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (0..n).map(|i| start + chrono::Duration::hours(i as i64)).collect()
}

fn forcing(prec: &[f64], temp: &[f64], ep: &[f64]) -> Forcing {
    let n = prec.len();
    Forcing::from_columns(&hourly(n), prec, temp, ep, &vec![f64::NAN; n], None).unwrap()
}

#[test]
fn warm_dry_steps_keep_snowpack_empty() {
    let f = forcing(&[0.0; 20], &[20.0; 20], &[0.0; 20]);
    let model = Hbv96Model::new(
        f,
        ProblemConstants::new(1.0, 100.0).unwrap(),
        SimulationConfig::default(),
    )
    .unwrap();
    let sim = model.simulate(&Parameters::default()).unwrap();
    assert_eq!(sim.len(), 20);
    for r in &sim.records {
        assert_eq!(r.sp, 0.0);
        assert_eq!(r.wc, 0.0);
    }
}

#[test]
fn snow_accumulates_then_melts() {
    let mut temp = vec![-8.0; 24];
    temp.extend(vec![12.0; 24]);
    let f = forcing(&[2.0; 48], &temp, &[0.0; 48]);
    let model = Hbv96Model::new(
        f,
        ProblemConstants::new(1.0, 100.0).unwrap(),
        SimulationConfig::default(),
    )
    .unwrap();
    let sim = model.simulate(&Parameters::default()).unwrap();
    let peak = sim.records[24].sp;
    assert!(peak > 40.0);
    assert!(sim.records[47].sp < peak);
    assert!(sim.intermediates.melt[24..40].iter().all(|&m| m > 0.0));
}

#[test]
fn disabled_snow_never_stores_snow() {
    let f = forcing(&[5.0; 30], &[-15.0; 30], &[0.1; 30]);
    let config = SimulationConfig {
        disable_snow: true,
        ..SimulationConfig::default()
    };
    let model = Hbv96Model::new(f, ProblemConstants::new(24.0, 50.0).unwrap(), config).unwrap();
    let sim = model.simulate(&Parameters::default()).unwrap();
    assert!(sim.records.iter().skip(1).all(|r| r.sp == 0.0 && r.wc == 0.0));
    assert!(sim.intermediates.sf.iter().all(|&v| v == 0.0));
}

#[test]
fn pathological_parameters_raise_divergence() {
    let f = forcing(&[10.0; 12], &[5.0; 12], &[0.5; 12]);
    let config = SimulationConfig {
        maxbas: 3,
        ..SimulationConfig::default()
    };
    let model = Hbv96Model::new(f, ProblemConstants::new(1.0, 500.0).unwrap(), config).unwrap();
    let p = Parameters {
        k: 5.0,
        alpha: 1.0,
        ..Parameters::default()
    };
    let err = model.simulate(&p).unwrap_err();
    assert!(err.is_divergence());
    assert!(err.to_string().contains("diverged"));
}

#[test]
fn lowered_threshold_flags_ordinary_run() {
    let f = forcing(&[10.0; 12], &[5.0; 12], &[0.5; 12]);
    let config = SimulationConfig {
        divergence_threshold: 1e-3,
        ..SimulationConfig::default()
    };
    let model = Hbv96Model::new(f, ProblemConstants::new(1.0, 500.0).unwrap(), config).unwrap();
    assert!(model.simulate(&Parameters::default()).unwrap_err().is_divergence());
}

#[test]
fn simulation_serializes_with_intermediate_columns() {
    let f = forcing(&[1.0; 5], &[3.0; 5], &[0.2; 5]);
    let model = Hbv96Model::new(
        f,
        ProblemConstants::new(1.0, 10.0).unwrap(),
        SimulationConfig::default(),
    )
    .unwrap();
    let sim = model.simulate(&Parameters::default()).unwrap();
    let json = serde_json::to_value(&sim).unwrap();
    assert_eq!(json["records"].as_array().unwrap().len(), 5);
    assert_eq!(json["intermediates"]["gw"].as_array().unwrap().len(), 4);
    assert_relative_eq!(json["records"][0]["q_sim"].as_f64().unwrap(), 0.183);
}

fn params_in_bounds() -> impl Strategy<Value = Parameters> {
    prop::collection::vec(0.0f64..=1.0, N_PARAMS).prop_map(|u| {
        let values: Vec<f64> = u
            .iter()
            .enumerate()
            .map(|(i, t)| LOWER_BOUNDS[i] + t * (UPPER_BOUNDS[i] - LOWER_BOUNDS[i]))
            .collect();
        Parameters::from_array(&values).unwrap()
    })
}

fn forcing_columns() -> impl Strategy<Value = (Vec<f64>, Vec<f64>, Vec<f64>)> {
    (2usize..60).prop_flat_map(|n| {
        (
            prop::collection::vec(0.0f64..30.0, n),
            prop::collection::vec(-25.0f64..25.0, n),
            prop::collection::vec(0.0f64..2.0, n),
        )
    })
}

proptest! {
    #[test]
    fn storages_stay_non_negative(
        params in params_in_bounds(),
        (prec, temp, ep) in forcing_columns(),
        disable_snow in any::<bool>(),
    ) {
        let f = forcing(&prec, &temp, &ep);
        let c = ProblemConstants::new(1.0, 100.0).unwrap();
        let sim = run_unrouted(&params, &c, &f, &State::default(), 0.183, disable_snow);
        for r in &sim.records {
            prop_assert!(r.state().is_non_negative(), "negative state {:?}", r.state());
            prop_assert!(r.q_sim >= 0.0);
        }
    }

    #[test]
    fn split_conserves_mass_without_correction(
        prec in 0.0f64..100.0,
        temp in -30.0f64..30.0,
        ltt in -1.5f64..2.5,
        width in 0.001f64..3.0,
    ) {
        let (rf, sf) = partition_precipitation(prec, temp, ltt, ltt + width, 1.0, 1.0);
        prop_assert!(rf >= 0.0 && sf >= 0.0);
        prop_assert!((rf + sf - prec).abs() <= 1e-9 * prec.max(1.0));
    }

    #[test]
    fn kernel_weights_are_normalized(maxbas in 1usize..64) {
        let k = TriangularKernel::new(maxbas).unwrap();
        let total: f64 = k.weights().iter().sum();
        prop_assert!((total - 1.0).abs() < 1e-12);
        prop_assert!(k.weights().iter().all(|&w| w > 0.0));
    }
}
