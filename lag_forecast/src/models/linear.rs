//! Ordinary least squares regression with an intercept

use crate::error::{ForecastError, Result};
use crate::features::{FeatureMatrix, FeatureSchema};
use crate::models::{check_training_data, FittedRegressor, Regressor};
use lag_math::linalg::least_squares;
use ndarray::{s, Array1, Array2};

/// Linear regression model
#[derive(Debug, Clone)]
pub struct LinearRegression {
    name: String,
}

/// Fitted linear regression model
#[derive(Debug, Clone)]
pub struct FittedLinearRegression {
    name: String,
    schema: FeatureSchema,
    intercept: f64,
    /// One coefficient per feature, in schema order
    weights: Array1<f64>,
}

impl LinearRegression {
    /// Create a new linear regression model
    pub fn new() -> Self {
        Self {
            name: "Linear Regression".to_string(),
        }
    }
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl FittedLinearRegression {
    /// Intercept term
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Coefficients paired with feature names
    pub fn coefficients(&self) -> Vec<(String, f64)> {
        self.schema
            .names()
            .iter()
            .cloned()
            .zip(self.weights.iter().copied())
            .collect()
    }
}

/// Features with a leading constant column for the intercept
fn design_matrix(features: &Array2<f64>) -> Array2<f64> {
    let mut design = Array2::ones((features.nrows(), features.ncols() + 1));
    design.slice_mut(s![.., 1..]).assign(features);
    design
}

impl Regressor for LinearRegression {
    type Fitted = FittedLinearRegression;

    fn fit(&self, features: &FeatureMatrix, target: &[f64]) -> Result<Self::Fitted> {
        check_training_data(features, target)?;
        let design = design_matrix(features.values());
        let y = Array1::from(target.to_vec());
        let coefficients = least_squares(&design, &y).map_err(|e| {
            ForecastError::ModelError(format!("{} fit failed: {}", self.name, e))
        })?;

        Ok(FittedLinearRegression {
            name: self.name.clone(),
            schema: features.schema().clone(),
            intercept: coefficients[0],
            weights: coefficients.slice(s![1..]).to_owned(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl FittedRegressor for FittedLinearRegression {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        self.schema.ensure_matches(features.schema())?;
        let predicted = features.values().dot(&self.weights) + self.intercept;
        Ok(predicted.to_vec())
    }

    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_fit_recovers_coefficients() {
        let schema = FeatureSchema::new(vec!["a".to_string(), "b".to_string()]);
        let rows: Vec<Vec<f64>> = (0..12)
            .map(|i| vec![i as f64, ((i * 7) % 5) as f64])
            .collect();
        let target: Vec<f64> = rows.iter().map(|r| 3.0 + 2.0 * r[0] - 0.5 * r[1]).collect();
        let features = FeatureMatrix::from_rows(schema, &rows).unwrap();

        let fitted = LinearRegression::new().fit(&features, &target).unwrap();
        assert_relative_eq!(fitted.intercept(), 3.0, epsilon = 1e-8);
        let coefs = fitted.coefficients();
        assert_eq!(coefs[0].0, "a");
        assert_relative_eq!(coefs[0].1, 2.0, epsilon = 1e-8);
        assert_relative_eq!(coefs[1].1, -0.5, epsilon = 1e-8);

        let predicted = fitted.predict(&features).unwrap();
        for (p, t) in predicted.iter().zip(&target) {
            assert_relative_eq!(*p, *t, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_collinear_features_fail() {
        let schema = FeatureSchema::new(vec!["a".to_string(), "b".to_string()]);
        let values = Array2::from_shape_fn((6, 2), |(i, j)| (j + 1) as f64 * i as f64);
        let features = FeatureMatrix::new(schema, values).unwrap();
        let result = LinearRegression::new().fit(&features, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!(matches!(result, Err(ForecastError::ModelError(_))));
    }
}
