//! HBV-96 numerical constants and default parameter bounds.
//!
//! Centralises all fixed values used throughout the HBV-96 model.

// -- Model contract constants --

/// Calibratable parameter names in canonical order.
pub const PARAM_NAMES: &[&str] = &[
    "ltt", "utt", "ttm", "cfmax", "fc", "e_corr", "etf", "lp", "k", "k1", "alpha", "beta", "cwh",
    "cfr", "c_flux", "perc", "rfcf", "sfcf",
];

/// Number of calibratable parameters.
pub const N_PARAMS: usize = 18;

/// State variable names in record order.
pub const STATE_NAMES: &[&str] = &["sp", "sm", "uz", "lz", "wc"];

// -- Initial conditions --

/// Default snow pack [mm].
pub const DEFAULT_SP: f64 = 0.0;
/// Default soil moisture [mm].
pub const DEFAULT_SM: f64 = 30.0;
/// Default upper zone storage [mm].
pub const DEFAULT_UZ: f64 = 30.0;
/// Default lower zone storage [mm].
pub const DEFAULT_LZ: f64 = 30.0;
/// Default liquid water content in snow [mm].
pub const DEFAULT_WC: f64 = 0.0;

/// Discharge assigned to record 0 before any stepping [m3/s].
pub const DEFAULT_Q0: f64 = 0.183;

/// Discharge above which a run is considered numerically unstable [m3/s].
pub const DIVERGENCE_THRESHOLD: f64 = 1e4;

/// Unit conversion: mm * km2 / h -> m3/s is area * q / (3.6 * tfac).
pub const UNIT_CONVERSION: f64 = 3.6;

// -- Parameter bounds --

/// Default lower bounds, in `PARAM_NAMES` order.
pub const LOWER_BOUNDS: [f64; N_PARAMS] = [
    -1.5,      // ltt [C]
    0.001,     // utt [C]
    0.001,     // ttm [C]
    0.04,      // cfmax [mm C^-1 h^-1]
    50.0,      // fc [mm]
    0.6,       // e_corr
    0.001,     // etf
    0.2,       // lp
    0.00042,   // k [h^-1]
    0.0000042, // k1 [h^-1]
    0.001,     // alpha
    1.0,       // beta
    0.001,     // cwh
    0.01,      // cfr
    0.0,       // c_flux [mm h^-1]
    0.001,     // perc [mm h^-1]
    0.6,       // rfcf
    0.4,       // sfcf
];

/// Default upper bounds, in `PARAM_NAMES` order.
pub const UPPER_BOUNDS: [f64; N_PARAMS] = [
    2.5,     // ltt
    3.0,     // utt
    2.0,     // ttm
    0.4,     // cfmax
    500.0,   // fc
    1.4,     // e_corr
    5.0,     // etf
    0.5,     // lp
    0.0167,  // k
    0.00062, // k1
    1.0,     // alpha
    6.0,     // beta
    0.1,     // cwh
    1.0,     // cfr
    0.08,    // c_flux, 2 mm/day
    0.125,   // perc
    1.4,     // rfcf
    1.4,     // sfcf
];
