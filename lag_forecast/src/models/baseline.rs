//! Naive mean baseline

use crate::error::Result;
use crate::features::{FeatureMatrix, FeatureSchema};
use crate::models::{check_training_data, FittedRegressor, Regressor};

/// Predicts the training-target mean for every row
#[derive(Debug, Clone)]
pub struct MeanBaseline {
    name: String,
}

/// Fitted mean baseline
#[derive(Debug, Clone)]
pub struct FittedMeanBaseline {
    name: String,
    schema: FeatureSchema,
    mean: f64,
}

impl MeanBaseline {
    /// Create a new mean baseline
    pub fn new() -> Self {
        Self {
            name: "Mean Baseline".to_string(),
        }
    }
}

impl Default for MeanBaseline {
    fn default() -> Self {
        Self::new()
    }
}

impl FittedMeanBaseline {
    /// Training-target mean
    pub fn mean(&self) -> f64 {
        self.mean
    }
}

impl Regressor for MeanBaseline {
    type Fitted = FittedMeanBaseline;

    fn fit(&self, features: &FeatureMatrix, target: &[f64]) -> Result<Self::Fitted> {
        check_training_data(features, target)?;
        Ok(FittedMeanBaseline {
            name: self.name.clone(),
            schema: features.schema().clone(),
            mean: lag_math::mean(target)?,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl FittedRegressor for FittedMeanBaseline {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        self.schema.ensure_matches(features.schema())?;
        Ok(vec![self.mean; features.len()])
    }

    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn name(&self) -> &str {
        &self.name
    }
}
