/// HBV-96 triangular-weighting routing.
///
/// The groundwater response of each step is spread over the next MAXBAS
/// steps with a symmetric triangular kernel, then combined with same-step
/// direct runoff and converted to discharge.
use smallvec::SmallVec;

use super::outputs::{IntermediatesSeries, Record};
use super::params::ProblemConstants;
use crate::error::{Hbv96Error, Result};

/// Normalised triangular weights of width MAXBAS.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangularKernel {
    weights: SmallVec<[f64; 8]>,
}

impl TriangularKernel {
    /// Build the kernel for an integer MAXBAS >= 1.
    pub fn new(maxbas: usize) -> Result<Self> {
        if maxbas == 0 {
            return Err(Hbv96Error::config("maxbas must be >= 1"));
        }
        if maxbas == 1 {
            return Ok(Self {
                weights: smallvec::smallvec![1.0],
            });
        }

        let half = maxbas as f64 / 2.0;
        let h: SmallVec<[f64; 9]> = (0..=maxbas).map(|i| triangle(i, maxbas, half)).collect();

        let mut weights: SmallVec<[f64; 8]> =
            (1..=maxbas).map(|i| (h[i] + h[i - 1]) / 2.0).collect();
        let total: f64 = weights.iter().sum();
        for w in &mut weights {
            *w /= total;
        }

        Ok(Self { weights })
    }

    /// Kernel width.
    pub fn maxbas(&self) -> usize {
        self.weights.len()
    }

    /// `weights()[k]` applies to the response `k` steps back.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

/// Ordinate of the unit-apex triangle on [0, maxbas] at integer `i`.
fn triangle(i: usize, maxbas: usize, half: f64) -> f64 {
    let x = i as f64;
    if 2 * i == maxbas {
        1.0
    } else if x < half {
        x / half
    } else {
        (maxbas as f64 - x) / half
    }
}

/// Route the groundwater response and write final `q_sim`.
///
/// Record `t >= maxbas` gets the convolution of `gw` over the previous
/// `maxbas` steps plus its own direct runoff. Earlier records keep the
/// discharge they already carry. `intermediates[i]` belongs to record `i + 1`.
pub fn route(
    records: &mut [Record],
    intermediates: &IntermediatesSeries,
    kernel: &TriangularKernel,
    constants: &ProblemConstants,
) {
    let maxbas = kernel.maxbas();
    if maxbas == 1 {
        return;
    }
    debug_assert_eq!(records.len(), intermediates.len() + 1);

    let gw = &intermediates.gw;
    let qdr = &intermediates.qdr;
    for (t, record) in records.iter_mut().enumerate().skip(maxbas) {
        let routed: f64 = kernel
            .weights()
            .iter()
            .enumerate()
            .map(|(k, c)| gw[t - k - 1] * c)
            .sum();
        record.q_sim = constants.to_discharge(routed + qdr[t - 1]);
    }
}

/// Fail on the first record whose discharge exceeds `threshold` or is not
/// finite.
pub fn check_divergence(records: &[Record], threshold: f64) -> Result<()> {
    match records
        .iter()
        .position(|r| !r.q_sim.is_finite() || r.q_sim > threshold)
    {
        Some(step) => Err(Hbv96Error::Divergence {
            step,
            discharge: records[step].q_sim,
            threshold,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hbv96::outputs::Intermediates;
    use crate::hbv96::state::State;
    use crate::forcing::TimestepInput;
    use approx::assert_relative_eq;
    use chrono::NaiveDateTime;

    fn blank_records(n: usize) -> Vec<Record> {
        let input = TimestepInput {
            date: NaiveDateTime::default(),
            prec: 0.0,
            temp: 0.0,
            tm: 0.0,
            ep: 0.0,
            q_rec: f64::NAN,
        };
        (0..n)
            .map(|_| Record::new(&input, &State::default(), -1.0))
            .collect()
    }

    fn table(gw: &[f64]) -> IntermediatesSeries {
        let mut ts = IntermediatesSeries::with_capacity(gw.len());
        for &g in gw {
            ts.push(&Intermediates {
                gw: g,
                ..Intermediates::default()
            });
        }
        ts
    }

    // -- Kernel --

    #[test]
    fn weights_sum_to_one() {
        for maxbas in 1..=12 {
            let k = TriangularKernel::new(maxbas).unwrap();
            let total: f64 = k.weights().iter().sum();
            assert_relative_eq!(total, 1.0, epsilon = 1e-12);
            assert_eq!(k.maxbas(), maxbas);
        }
    }

    #[test]
    fn kernel_is_symmetric() {
        for maxbas in [3, 4, 5, 8] {
            let w = TriangularKernel::new(maxbas).unwrap();
            let w = w.weights();
            for i in 0..maxbas {
                assert_relative_eq!(w[i], w[maxbas - 1 - i], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn even_kernel_known_values() {
        // h = [0, 0.5, 1, 0.5, 0] -> c = [0.25, 0.75, 0.75, 0.25] / 2
        let k = TriangularKernel::new(4).unwrap();
        let expected = [0.125, 0.375, 0.375, 0.125];
        for (w, e) in k.weights().iter().zip(expected) {
            assert_relative_eq!(*w, e, epsilon = 1e-12);
        }
    }

    #[test]
    fn odd_kernel_known_values() {
        // half = 1.5: h = [0, 2/3, 2/3, 0] -> c = [1/3, 2/3, 1/3] / (4/3)
        let k = TriangularKernel::new(3).unwrap();
        let expected = [0.25, 0.5, 0.25];
        for (w, e) in k.weights().iter().zip(expected) {
            assert_relative_eq!(*w, e, epsilon = 1e-12);
        }
    }

    #[test]
    fn zero_maxbas_rejected() {
        assert!(TriangularKernel::new(0).is_err());
    }

    // -- Routing --

    #[test]
    fn maxbas_one_is_noop() {
        let mut records = blank_records(4);
        let kernel = TriangularKernel::new(1).unwrap();
        let c = ProblemConstants::new(1.0, 3.6).unwrap();
        route(&mut records, &table(&[1.0, 2.0, 3.0]), &kernel, &c);
        assert!(records.iter().all(|r| r.q_sim == -1.0));
    }

    #[test]
    fn impulse_is_spread_over_kernel() {
        // area / (3.6 * tfac) = 1, so q_sim equals routed depth
        let c = ProblemConstants::new(1.0, 3.6).unwrap();
        let kernel = TriangularKernel::new(3).unwrap();
        let mut records = blank_records(8);
        // impulse in record 3 (intermediates index 2)
        route(&mut records, &table(&[0.0, 0.0, 4.0, 0.0, 0.0, 0.0, 0.0]), &kernel, &c);

        assert_eq!(records[0].q_sim, -1.0);
        assert_eq!(records[2].q_sim, -1.0);
        assert_relative_eq!(records[3].q_sim, 1.0, epsilon = 1e-12);
        assert_relative_eq!(records[4].q_sim, 2.0, epsilon = 1e-12);
        assert_relative_eq!(records[5].q_sim, 1.0, epsilon = 1e-12);
        assert_relative_eq!(records[6].q_sim, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn constant_response_routes_to_itself() {
        let c = ProblemConstants::new(1.0, 3.6).unwrap();
        let kernel = TriangularKernel::new(5).unwrap();
        let mut records = blank_records(12);
        route(&mut records, &table(&[2.0; 11]), &kernel, &c);
        for r in &records[5..] {
            assert_relative_eq!(r.q_sim, 2.0, epsilon = 1e-12);
        }
    }

    // -- Divergence --

    #[test]
    fn divergence_reports_first_offender() {
        let mut records = blank_records(5);
        for r in &mut records {
            r.q_sim = 1.0;
        }
        records[2].q_sim = 2e4;
        records[4].q_sim = 3e4;
        let err = check_divergence(&records, 1e4).unwrap_err();
        assert_eq!(
            err,
            Hbv96Error::Divergence {
                step: 2,
                discharge: 2e4,
                threshold: 1e4
            }
        );
    }

    #[test]
    fn non_finite_discharge_is_divergence() {
        let mut records = blank_records(3);
        for r in &mut records {
            r.q_sim = 1.0;
        }
        records[1].q_sim = f64::NAN;
        assert!(check_divergence(&records, 1e4).unwrap_err().is_divergence());
    }

    #[test]
    fn stable_series_passes() {
        let mut records = blank_records(3);
        for r in &mut records {
            r.q_sim = 1e4;
        }
        assert!(check_divergence(&records, 1e4).is_ok());
    }
}
