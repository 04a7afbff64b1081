use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Hbv96Error, Result};

/// Temporal resolution of forcing data.
///
/// Ordered from finest to coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resolution {
    Hourly,
    Daily,
}

impl Resolution {
    /// Hours per timestep, the `tfac` problem constant.
    pub fn tfac(self) -> f64 {
        match self {
            Resolution::Hourly => 1.0,
            Resolution::Daily => 24.0,
        }
    }

    pub fn step(self) -> Duration {
        match self {
            Resolution::Hourly => Duration::hours(1),
            Resolution::Daily => Duration::days(1),
        }
    }
}

/// One timestep of model input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimestepInput {
    pub date: NaiveDateTime,
    /// Precipitation [mm].
    pub prec: f64,
    /// Air temperature [C].
    pub temp: f64,
    /// Long-term average temperature [C].
    pub tm: f64,
    /// Potential evapotranspiration [mm].
    pub ep: f64,
    /// Observed discharge [m3/s], NaN when missing.
    pub q_rec: f64,
}

/// Validated, ordered forcing sequence.
///
/// Driving columns must be finite (precipitation and evapotranspiration
/// also non-negative) and dates strictly increasing. Observed discharge
/// may contain NaN gaps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forcing {
    records: Vec<TimestepInput>,
}

impl Forcing {
    /// Validate and wrap a record sequence.
    pub fn new(records: Vec<TimestepInput>) -> Result<Self> {
        if records.len() < 2 {
            return Err(Hbv96Error::invalid_input(format!(
                "forcing needs at least 2 records, got {}",
                records.len()
            )));
        }
        for (i, r) in records.iter().enumerate() {
            for (name, v) in [("prec", r.prec), ("temp", r.temp), ("tm", r.tm), ("ep", r.ep)] {
                if !v.is_finite() {
                    return Err(Hbv96Error::invalid_input(format!(
                        "record {i}: {name} = {v} is not finite"
                    )));
                }
            }
            if r.prec < 0.0 {
                return Err(Hbv96Error::invalid_input(format!(
                    "record {i}: negative precipitation {}",
                    r.prec
                )));
            }
            if r.ep < 0.0 {
                return Err(Hbv96Error::invalid_input(format!(
                    "record {i}: negative evapotranspiration {}",
                    r.ep
                )));
            }
            if r.q_rec.is_infinite() {
                return Err(Hbv96Error::invalid_input(format!(
                    "record {i}: q_rec is infinite"
                )));
            }
        }
        if let Some(i) = records.windows(2).position(|w| w[1].date <= w[0].date) {
            return Err(Hbv96Error::invalid_input(format!(
                "record {}: date {} does not follow {}",
                i + 1,
                records[i + 1].date,
                records[i].date
            )));
        }
        Ok(Self { records })
    }

    /// Build from column slices.
    ///
    /// When `tm` is `None` the long-term average temperature is taken as
    /// the mean of `temp` over the whole series.
    pub fn from_columns(
        dates: &[NaiveDateTime],
        prec: &[f64],
        temp: &[f64],
        ep: &[f64],
        q_rec: &[f64],
        tm: Option<&[f64]>,
    ) -> Result<Self> {
        let n = dates.len();
        for (name, len) in [
            ("prec", prec.len()),
            ("temp", temp.len()),
            ("ep", ep.len()),
            ("q_rec", q_rec.len()),
        ] {
            if len != n {
                return Err(Hbv96Error::invalid_input(format!(
                    "{name} length {len} does not match dates length {n}"
                )));
            }
        }
        if let Some(col) = tm {
            if col.len() != n {
                return Err(Hbv96Error::invalid_input(format!(
                    "tm length {} does not match dates length {n}",
                    col.len()
                )));
            }
        }
        let mean_temp = if n == 0 {
            0.0
        } else {
            temp.iter().sum::<f64>() / n as f64
        };
        let tm_at = |i: usize| -> f64 {
            match tm {
                Some(col) => col[i],
                None => mean_temp,
            }
        };

        let records = (0..n)
            .map(|i| TimestepInput {
                date: dates[i],
                prec: prec[i],
                temp: temp[i],
                tm: tm_at(i),
                ep: ep[i],
                q_rec: q_rec[i],
            })
            .collect();
        Self::new(records)
    }

    pub fn records(&self) -> &[TimestepInput] {
        &self.records
    }

    /// Observed discharge column.
    pub fn q_rec(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.q_rec).collect()
    }

    /// Replace the observed discharge column, e.g. with a synthetic series.
    pub fn with_observed(mut self, q_rec: &[f64]) -> Result<Self> {
        if q_rec.len() != self.records.len() {
            return Err(Hbv96Error::invalid_input(format!(
                "q_rec length {} does not match forcing length {}",
                q_rec.len(),
                self.records.len()
            )));
        }
        for (r, &q) in self.records.iter_mut().zip(q_rec) {
            r.q_rec = q;
        }
        Self::new(self.records)
    }

    /// Number of timesteps.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if there are no timesteps.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
