/// HBV-96 model orchestration functions.
///
/// - `step()`: advance one record's state into the next
/// - `run()`: step over a forcing sequence, route, and check for divergence
use super::outputs::{Intermediates, IntermediatesSeries, Record, Simulation};
use super::params::{Parameters, ProblemConstants};
use super::processes;
use super::routing::{self, TriangularKernel};
use super::state::State;
use crate::forcing::{Forcing, TimestepInput};

/// Execute one timestep of HBV-96.
///
/// Uses the forcing and state of record `t` to produce the state of record
/// `t + 1`. Returns (new_state, intermediates).
pub fn step(
    state: &State,
    params: &Parameters,
    constants: &ProblemConstants,
    input: &TimestepInput,
    disable_snow: bool,
) -> (State, Intermediates) {
    // 1. Precipitation
    let (rf, sf) = if disable_snow {
        processes::partition_rain_only(input.prec, params.rfcf)
    } else {
        processes::partition_precipitation(
            input.prec,
            input.temp,
            params.ltt,
            params.utt,
            params.rfcf,
            params.sfcf,
        )
    };

    // 2. Snow
    let snow = if disable_snow {
        processes::snow_bypass(rf)
    } else {
        processes::snow(
            state.sp,
            state.wc,
            rf,
            sf,
            input.temp,
            params.ttm,
            params.cfmax,
            params.cfr,
            params.cwh,
        )
    };

    // 3. Soil
    let soil = processes::soil(
        state.sm,
        state.uz,
        snow.inf,
        input.temp,
        input.tm,
        input.ep,
        params.fc,
        params.beta,
        params.etf,
        params.e_corr,
        params.lp,
        params.c_flux,
    );

    // 4. Response
    let resp = processes::response(
        soil.uz,
        state.lz,
        params.perc,
        params.k,
        params.k1,
        params.alpha,
    );

    let gw = resp.q0 + resp.q1;

    let new_state = State {
        sp: snow.sp,
        sm: soil.sm,
        uz: resp.uz,
        lz: resp.lz,
        wc: snow.wc,
    };

    let intermediates = Intermediates {
        rf,
        sf,
        melt: snow.melt,
        refr: snow.refr,
        inf: snow.inf,
        qdr: soil.qdr,
        act_inf: soil.act_inf,
        r: soil.r,
        ep_int: soil.ep_int,
        ea: soil.ea,
        cf: soil.cf,
        q0: resp.q0,
        q1: resp.q1,
        gw,
        q_unrouted: constants.to_discharge(gw + soil.qdr),
    };

    (new_state, intermediates)
}

/// Step over the whole sequence without routing.
///
/// Record 0 carries `initial_state` and `initial_discharge`; every later
/// record carries its state and unrouted discharge.
pub fn run_unrouted(
    params: &Parameters,
    constants: &ProblemConstants,
    forcing: &Forcing,
    initial_state: &State,
    initial_discharge: f64,
    disable_snow: bool,
) -> Simulation {
    let inputs = forcing.records();
    let n_steps = inputs.len().saturating_sub(1);

    let mut records = Vec::with_capacity(inputs.len());
    let mut intermediates = IntermediatesSeries::with_capacity(n_steps);

    let mut state = *initial_state;
    records.push(Record::new(&inputs[0], &state, initial_discharge));

    for t in 0..n_steps {
        let (new_state, inter) = step(&state, params, constants, &inputs[t], disable_snow);
        records.push(Record::new(&inputs[t + 1], &new_state, inter.q_unrouted));
        intermediates.push(&inter);
        state = new_state;
    }

    Simulation {
        records,
        intermediates,
    }
}

/// Run HBV-96 over a forcing sequence: step, route, then check divergence.
///
/// Fails with `Hbv96Error::Divergence` on the first record whose discharge
/// exceeds `divergence_threshold`.
#[allow(clippy::too_many_arguments)]
pub fn run(
    params: &Parameters,
    constants: &ProblemConstants,
    forcing: &Forcing,
    kernel: &TriangularKernel,
    initial_state: &State,
    initial_discharge: f64,
    disable_snow: bool,
    divergence_threshold: f64,
) -> crate::error::Result<Simulation> {
    let mut sim = run_unrouted(
        params,
        constants,
        forcing,
        initial_state,
        initial_discharge,
        disable_snow,
    );
    routing::route(&mut sim.records, &sim.intermediates, kernel, constants);
    routing::check_divergence(&sim.records, divergence_threshold)?;
    Ok(sim)
}
