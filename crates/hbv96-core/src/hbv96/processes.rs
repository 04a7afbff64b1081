//! HBV-96 instantaneous-response routines.
//!
//! Pure functions for the precipitation split, snow, soil moisture and
//! response routines. Every storage they return is clamped to be
//! non-negative.

/// Result of the snow routine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnowUpdate {
    pub sp: f64,
    pub wc: f64,
    pub melt: f64,
    pub refr: f64,
    /// Excess liquid water released to the soil.
    pub inf: f64,
}

/// Result of the soil routine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoilUpdate {
    pub sm: f64,
    pub uz: f64,
    pub qdr: f64,
    pub act_inf: f64,
    pub r: f64,
    pub ep_int: f64,
    pub ea: f64,
    pub cf: f64,
}

/// Result of the response routine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseUpdate {
    pub uz: f64,
    pub lz: f64,
    pub q0: f64,
    pub q1: f64,
}

/// Split precipitation into corrected rainfall and snowfall.
///
/// Below `ltt` everything is snow, above `utt` everything is rain, and in
/// between the split is linear in temperature. Returns (rf, sf).
pub fn partition_precipitation(
    prec: f64,
    temp: f64,
    ltt: f64,
    utt: f64,
    rfcf: f64,
    sfcf: f64,
) -> (f64, f64) {
    if temp <= ltt {
        (0.0, prec * sfcf)
    } else if temp >= utt {
        (prec * rfcf, 0.0)
    } else {
        let frac = (temp - ltt) / (utt - ltt);
        (frac * prec * rfcf, (1.0 - frac) * prec * sfcf)
    }
}

/// All precipitation as corrected rainfall, for snow-free basins.
pub fn partition_rain_only(prec: f64, rfcf: f64) -> (f64, f64) {
    (prec * rfcf, 0.0)
}

/// Degree-day melt or refreezing, then the water holding cap.
///
/// Melt is limited by the snow available this step; refreezing is limited
/// by the liquid water carried in from the previous step.
#[allow(clippy::too_many_arguments)]
pub fn snow(
    sp: f64,
    wc: f64,
    rf: f64,
    sf: f64,
    temp: f64,
    ttm: f64,
    cfmax: f64,
    cfr: f64,
    cwh: f64,
) -> SnowUpdate {
    let (mut new_sp, mut new_wc, melt, refr) = if temp > ttm {
        let melt = (cfmax * (temp - ttm)).min(sp + sf);
        (sp + sf - melt, wc + melt + rf, melt, 0.0)
    } else {
        let refr = (cfr * cfmax * (ttm - temp)).min(wc);
        (sp + sf + refr, wc - refr + rf, 0.0, refr)
    };

    new_sp = new_sp.max(0.0);
    new_wc = new_wc.max(0.0);

    let wc_max = cwh * new_sp;
    let inf = if new_wc > wc_max {
        let excess = new_wc - wc_max;
        new_wc = wc_max;
        excess
    } else {
        0.0
    };

    SnowUpdate {
        sp: new_sp,
        wc: new_wc,
        melt,
        refr,
        inf,
    }
}

/// Snow routine bypass: no pack is kept and rainfall infiltrates directly.
pub fn snow_bypass(rf: f64) -> SnowUpdate {
    SnowUpdate {
        sp: 0.0,
        wc: 0.0,
        melt: 0.0,
        refr: 0.0,
        inf: rf,
    }
}

/// Temperature-corrected potential evapotranspiration.
#[inline]
pub fn corrected_pet(ep: f64, temp: f64, tm: f64, etf: f64, e_corr: f64) -> f64 {
    (1.0 + etf * (temp - tm)) * e_corr * ep
}

/// Actual evapotranspiration.
///
/// Takes the larger of the corrected demand and its soil-moisture-scaled
/// value, as the HBV-96 formulation used here states it.
#[inline]
pub fn actual_et(ep_int: f64, sm: f64, fc: f64, lp: f64) -> f64 {
    ep_int.max((sm / (lp * fc)) * ep_int)
}

/// Soil moisture accounting.
#[allow(clippy::too_many_arguments)]
pub fn soil(
    sm: f64,
    uz: f64,
    inf: f64,
    temp: f64,
    tm: f64,
    ep: f64,
    fc: f64,
    beta: f64,
    etf: f64,
    e_corr: f64,
    lp: f64,
    c_flux: f64,
) -> SoilUpdate {
    let qdr = (sm + inf - fc).max(0.0);
    let act_inf = (inf - qdr).max(0.0);
    let r = (sm / fc).powf(beta) * act_inf;
    let ep_int = corrected_pet(ep, temp, tm, etf, e_corr);
    let ea = actual_et(ep_int, sm, fc, lp);
    let cf = c_flux * (fc - sm) / fc;

    SoilUpdate {
        sm: (sm + act_inf - r + cf - ea).max(0.0),
        uz: (uz + r - cf).max(0.0),
        qdr,
        act_inf,
        r,
        ep_int,
        ea,
        cf,
    }
}

/// Percolation to the lower zone, then nonlinear upper and linear lower
/// zone outflows.
pub fn response(uz: f64, lz: f64, perc: f64, k: f64, k1: f64, alpha: f64) -> ResponseUpdate {
    let lz = (lz + perc.min(uz)).max(0.0);
    let uz = (uz - perc).max(0.0);

    let q0 = k * uz.powf(1.0 + alpha);
    let q1 = k1 * lz;

    ResponseUpdate {
        uz: (uz - q0).max(0.0),
        lz: (lz - q1).max(0.0),
        q0,
        q1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // -- Precipitation split --

    #[test]
    fn all_snow_at_lower_threshold() {
        let (rf, sf) = partition_precipitation(10.0, -1.0, -1.0, 1.0, 1.1, 0.8);
        assert_eq!(rf, 0.0);
        assert_relative_eq!(sf, 8.0);
    }

    #[test]
    fn all_rain_at_upper_threshold() {
        let (rf, sf) = partition_precipitation(10.0, 1.0, -1.0, 1.0, 1.1, 0.8);
        assert_relative_eq!(rf, 11.0);
        assert_eq!(sf, 0.0);
    }

    #[test]
    fn linear_mix_between_thresholds() {
        let (rf, sf) = partition_precipitation(10.0, 0.5, -1.0, 1.0, 1.0, 1.0);
        assert_relative_eq!(rf, 7.5, epsilon = 1e-12);
        assert_relative_eq!(sf, 2.5, epsilon = 1e-12);
    }

    #[test]
    fn rain_only_bypass() {
        assert_eq!(partition_rain_only(4.0, 1.5), (6.0, 0.0));
    }

    // -- Snow --

    #[test]
    fn melt_limited_by_available_snow() {
        let s = snow(2.0, 0.0, 0.0, 1.0, 10.0, 0.0, 0.4, 0.05, 0.1);
        assert_relative_eq!(s.melt, 3.0);
        assert_eq!(s.sp, 0.0);
        assert_eq!(s.refr, 0.0);
        // All melt leaves as infiltration once the pack is gone.
        assert_relative_eq!(s.inf, 3.0);
        assert_eq!(s.wc, 0.0);
    }

    #[test]
    fn melt_retained_up_to_holding_capacity() {
        let s = snow(100.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.4, 0.05, 0.1);
        assert_relative_eq!(s.melt, 0.8, epsilon = 1e-12);
        assert_relative_eq!(s.sp, 99.2, epsilon = 1e-12);
        assert_relative_eq!(s.wc, 0.8, epsilon = 1e-12);
        assert_eq!(s.inf, 0.0);
    }

    #[test]
    fn refreeze_limited_by_previous_water_content() {
        let s = snow(10.0, 0.5, 3.0, 0.0, -20.0, 0.0, 0.4, 1.0, 0.1);
        assert_relative_eq!(s.refr, 0.5);
        assert_relative_eq!(s.sp, 10.5);
        // wc = 0.5 - 0.5 + 3.0 = 3.0, capped at 0.1 * 10.5
        assert_relative_eq!(s.wc, 1.05, epsilon = 1e-12);
        assert_relative_eq!(s.inf, 1.95, epsilon = 1e-12);
    }

    #[test]
    fn bypass_sends_rain_to_soil() {
        let s = snow_bypass(7.0);
        assert_eq!((s.sp, s.wc, s.inf), (0.0, 0.0, 7.0));
    }

    // -- Soil --

    #[test]
    fn direct_runoff_above_field_capacity() {
        let s = soil(190.0, 10.0, 20.0, 10.0, 10.0, 0.0, 200.0, 2.0, 0.1, 1.0, 0.35, 0.0);
        assert_relative_eq!(s.qdr, 10.0);
        assert_relative_eq!(s.act_inf, 10.0);
        assert_relative_eq!(s.r, (190.0_f64 / 200.0).powi(2) * 10.0, epsilon = 1e-12);
    }

    #[test]
    fn et_takes_larger_of_demand_and_scaled_demand() {
        // sm above lp*fc: scaled demand is larger
        assert_relative_eq!(actual_et(2.0, 140.0, 200.0, 0.35), 4.0, epsilon = 1e-12);
        // sm below lp*fc: raw demand stands
        assert_relative_eq!(actual_et(2.0, 35.0, 200.0, 0.35), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn corrected_pet_scales_with_temperature_anomaly() {
        assert_relative_eq!(corrected_pet(2.0, 12.0, 10.0, 0.5, 1.0), 4.0);
        assert_relative_eq!(corrected_pet(2.0, 10.0, 10.0, 0.5, 0.8), 1.6);
    }

    #[test]
    fn soil_moisture_clamped_non_negative() {
        let s = soil(1.0, 0.0, 0.0, 10.0, 10.0, 50.0, 200.0, 2.0, 0.1, 1.0, 0.35, 0.0);
        assert_eq!(s.sm, 0.0);
    }

    #[test]
    fn capillary_flux_cannot_drain_upper_zone_below_zero() {
        let s = soil(0.0, 0.01, 0.0, 0.0, 0.0, 0.0, 200.0, 2.0, 0.1, 1.0, 0.35, 0.08);
        assert_relative_eq!(s.cf, 0.08);
        assert_eq!(s.uz, 0.0);
    }

    // -- Response --

    #[test]
    fn percolation_moves_water_to_lower_zone() {
        let r = response(10.0, 5.0, 1.0, 0.0, 0.0, 0.5);
        assert_relative_eq!(r.uz, 9.0);
        assert_relative_eq!(r.lz, 6.0);
    }

    #[test]
    fn percolation_limited_by_upper_zone() {
        let r = response(0.5, 5.0, 1.0, 0.0, 0.0, 0.5);
        assert_eq!(r.uz, 0.0);
        assert_relative_eq!(r.lz, 5.5);
    }

    #[test]
    fn outflows_follow_recession_laws() {
        let r = response(10.0, 20.0, 1.0, 0.01, 0.001, 1.0);
        assert_relative_eq!(r.q0, 0.01 * 81.0, epsilon = 1e-12);
        assert_relative_eq!(r.q1, 0.021, epsilon = 1e-12);
        assert_relative_eq!(r.uz, 9.0 - 0.81, epsilon = 1e-12);
        assert_relative_eq!(r.lz, 21.0 - 0.021, epsilon = 1e-12);
    }

    #[test]
    fn outflow_larger_than_storage_clamps() {
        let r = response(30.0, 30.0, 0.0, 10.0, 2.0, 1.0);
        assert_eq!(r.uz, 0.0);
        assert_eq!(r.lz, 0.0);
    }
}
