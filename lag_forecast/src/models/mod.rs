//! Regression models over lagged feature matrices
//!
//! Models follow a two-stage shape: a [`Regressor`] holds hyperparameters and
//! produces a [`FittedRegressor`], which remembers the [`FeatureSchema`] it was
//! trained on and refuses inputs built under a different one.

use crate::error::{ForecastError, Result};
use crate::features::{FeatureMatrix, FeatureSchema};
use std::fmt::Debug;

pub mod baseline;
pub mod linear;
pub mod random_forest;

pub use baseline::{FittedMeanBaseline, MeanBaseline};
pub use linear::{FittedLinearRegression, LinearRegression};
pub use random_forest::{FittedRandomForest, MaxFeatures, RandomForestRegressor};

/// Regression model fitted to a feature matrix
pub trait FittedRegressor: Debug {
    /// Predict one value per input row
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>>;

    /// Schema the model was trained on
    fn schema(&self) -> &FeatureSchema;

    /// Name of the model
    fn name(&self) -> &str;

    /// Per-feature importance scores, if the model provides them
    fn feature_importances(&self) -> Option<Vec<(String, f64)>> {
        None
    }
}

/// Regression model that can be fitted to a feature matrix
pub trait Regressor: Debug + Clone {
    /// The type of fitted model produced
    type Fitted: FittedRegressor;

    /// Fit the model to `features` and one target per row
    fn fit(&self, features: &FeatureMatrix, target: &[f64]) -> Result<Self::Fitted>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

/// Shared precondition for every `fit` implementation
pub(crate) fn check_training_data(features: &FeatureMatrix, target: &[f64]) -> Result<()> {
    if features.is_empty() {
        return Err(ForecastError::insufficient("model fit", 1, 0));
    }
    if features.len() != target.len() {
        return Err(ForecastError::ValidationError(format!(
            "Feature rows ({}) don't match target length ({})",
            features.len(),
            target.len()
        )));
    }
    if target.iter().any(|v| !v.is_finite())
        || features.values().iter().any(|v| !v.is_finite())
    {
        return Err(ForecastError::ModelError(
            "Training data contains non-finite values".to_string(),
        ));
    }
    Ok(())
}
