//! Error metrics for comparing predictions with observed values
//!
//! All functions reject empty input and mismatched lengths instead of
//! returning `NaN`, so a caller can never report a score over zero rows.

use crate::{MathError, Result};

fn check_pair(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot score an empty set of values".to_string(),
        ));
    }
    if actual.len() != predicted.len() {
        return Err(MathError::InvalidInput(format!(
            "Actual length ({}) doesn't match predicted length ({})",
            actual.len(),
            predicted.len()
        )));
    }
    Ok(())
}

/// Arithmetic mean of a slice
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot take the mean of an empty slice".to_string(),
        ));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Mean squared error
pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_pair(actual, predicted)?;
    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    Ok(sum / actual.len() as f64)
}

/// Root mean squared error
pub fn root_mean_squared_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    Ok(mean_squared_error(actual, predicted)?.sqrt())
}
