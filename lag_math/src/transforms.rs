//! Series transforms used before modeling or plotting

use crate::{MathError, Result};

/// First difference of natural logs: `ln(v[i]) - ln(v[i-1])`.
///
/// The output is one element shorter than the input. Non-positive inputs
/// produce non-finite entries; callers are expected to filter them.
pub fn log_difference(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| w[1].ln() - w[0].ln())
        .collect()
}

/// Scale values to `[0, 1]` using the finite minimum and maximum.
///
/// Non-finite entries are carried through unchanged. A constant series maps
/// to all zeros.
pub fn min_max_normalize(values: &[f64]) -> Result<Vec<f64>> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return Err(MathError::InsufficientData(
            "Need at least one finite value to normalize".to_string(),
        ));
    }

    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    Ok(values
        .iter()
        .map(|&v| {
            if !v.is_finite() {
                v
            } else if range == 0.0 {
                0.0
            } else {
                (v - min) / range
            }
        })
        .collect())
}
