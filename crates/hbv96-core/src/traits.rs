use crate::error::Result;

/// Contract for a calibratable parameter vector.
///
/// Lets the calibrator move between the optimizer's flat `&[f64]` view and
/// the model's named parameter struct without knowing the field layout.
pub trait ModelParams: Sized + Copy {
    const N_PARAMS: usize;
    const PARAM_NAMES: &'static [&'static str];

    /// Build from a flat slice in canonical order. Checks length and
    /// finiteness only; bounds are checked by `ParameterBounds`.
    fn from_slice(values: &[f64]) -> Result<Self>;

    /// Flatten into canonical order.
    fn to_vec(&self) -> Vec<f64>;
}
