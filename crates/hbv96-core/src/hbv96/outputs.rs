//! HBV-96 simulation outputs.
//!
//! `Intermediates` holds one step's routine by-products (returned by `step()`).
//! `IntermediatesSeries` is its column table, generated by `#[derive(Series)]`.
//! `Record` is one timestep of inputs plus states; `Simulation` is the run.
use chrono::NaiveDateTime;
use hbv96_macros::Series;
use serde::{Deserialize, Serialize};

use super::state::State;
use crate::forcing::TimestepInput;

/// Routine-internal quantities of a single step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, Series)]
#[series(derive(Serialize, Deserialize))]
pub struct Intermediates {
    /// Rainfall after correction [mm].
    pub rf: f64,
    /// Snowfall after correction [mm].
    pub sf: f64,
    pub melt: f64,
    pub refr: f64,
    /// Water released from the snow pack into the soil [mm].
    pub inf: f64,
    /// Direct runoff [mm].
    pub qdr: f64,
    pub act_inf: f64,
    /// Recharge to the upper zone [mm].
    pub r: f64,
    /// Temperature-corrected potential evapotranspiration [mm].
    pub ep_int: f64,
    /// Actual evapotranspiration [mm].
    pub ea: f64,
    /// Capillary flux [mm].
    pub cf: f64,
    /// Upper zone outflow [mm].
    pub q0: f64,
    /// Lower zone outflow [mm].
    pub q1: f64,
    /// Groundwater response before routing, `q0 + q1` [mm].
    pub gw: f64,
    /// Discharge without routing [m3/s].
    pub q_unrouted: f64,
}

/// One timestep of inputs, states and simulated discharge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub date: NaiveDateTime,
    pub prec: f64,
    pub temp: f64,
    pub tm: f64,
    pub ep: f64,
    pub q_rec: f64,
    pub sp: f64,
    pub sm: f64,
    pub uz: f64,
    pub lz: f64,
    pub wc: f64,
    pub q_sim: f64,
}

impl Record {
    pub fn new(input: &TimestepInput, state: &State, q_sim: f64) -> Self {
        Self {
            date: input.date,
            prec: input.prec,
            temp: input.temp,
            tm: input.tm,
            ep: input.ep,
            q_rec: input.q_rec,
            sp: state.sp,
            sm: state.sm,
            uz: state.uz,
            lz: state.lz,
            wc: state.wc,
            q_sim,
        }
    }

    pub fn state(&self) -> State {
        State {
            sp: self.sp,
            sm: self.sm,
            uz: self.uz,
            lz: self.lz,
            wc: self.wc,
        }
    }

    pub fn input(&self) -> TimestepInput {
        TimestepInput {
            date: self.date,
            prec: self.prec,
            temp: self.temp,
            tm: self.tm,
            ep: self.ep,
            q_rec: self.q_rec,
        }
    }
}

/// A complete run: N+1 records and the N step tables that produced
/// records 1..=N. `intermediates` index `i` belongs to record `i + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    pub records: Vec<Record>,
    pub intermediates: IntermediatesSeries,
}

impl Simulation {
    /// Simulated discharge column.
    pub fn q_sim(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.q_sim).collect()
    }

    /// Observed discharge column.
    pub fn q_rec(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.q_rec).collect()
    }

    /// Step table that produced record `t`, none for the seeded record 0.
    pub fn intermediates_for(&self, t: usize) -> Option<Intermediates> {
        t.checked_sub(1).and_then(|i| self.intermediates.get(i))
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
