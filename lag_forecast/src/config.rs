//! Pipeline configuration
//!
//! Every section has defaults, so a config file only needs the fields it
//! changes. Command-line flags are applied on top of the loaded values.

use crate::causality::GrangerConfig;
use crate::cleaning::MissingPolicy;
use crate::data::LoadOptions;
use crate::error::{ForecastError, Result};
use crate::evaluation::EvaluationConfig;
use crate::models::{MaxFeatures, RandomForestRegressor};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Input table and column selection for the modeling pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Month/Year headers and date policy
    #[serde(flatten)]
    pub load: LoadOptions,
    /// Series to predict
    pub target: String,
    /// Predictor series; empty means every non-target value column
    pub predictors: Vec<String>,
    /// Resolution of unparsable cells
    pub missing_policy: MissingPolicy,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            load: LoadOptions::default(),
            target: "Estimated_Violence_Fatalities".to_string(),
            predictors: Vec::new(),
            missing_policy: MissingPolicy::DropOnInvalid,
        }
    }
}

/// Random forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl ForestConfig {
    /// Build the configured regressor
    pub fn regressor(&self) -> Result<RandomForestRegressor> {
        if self.min_samples_split < 2 || self.min_samples_leaf == 0 {
            return Err(ForecastError::InvalidParameter(format!(
                "min_samples_split must be >= 2 and min_samples_leaf >= 1, got {} and {}",
                self.min_samples_split, self.min_samples_leaf
            )));
        }
        if let MaxFeatures::Fraction(f) = self.max_features {
            if !(f > 0.0 && f <= 1.0) {
                return Err(ForecastError::InvalidParameter(format!(
                    "max_features fraction must be in (0, 1], got {}",
                    f
                )));
            }
        }
        Ok(RandomForestRegressor::new(self.n_estimators)?
            .with_max_depth(self.max_depth)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_max_features(self.max_features)
            .with_bootstrap(self.bootstrap)
            .with_seed(self.seed))
    }
}

/// Granger causality settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CausalityConfig {
    /// Columns to test; `None` takes the first three value columns
    pub columns: Option<Vec<String>>,
    /// Resolution of unparsable cells
    pub missing_policy: MissingPolicy,
    #[serde(flatten)]
    pub granger: GrangerConfig,
}

impl Default for CausalityConfig {
    fn default() -> Self {
        Self {
            columns: None,
            missing_policy: MissingPolicy::ZeroOnInvalid,
            granger: GrangerConfig::default(),
        }
    }
}

/// Full configuration for both pipelines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data: DataConfig,
    /// Lag horizon in months
    pub lag: usize,
    pub evaluation: EvaluationConfig,
    pub forest: ForestConfig,
    pub causality: CausalityConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            lag: 4,
            evaluation: EvaluationConfig::default(),
            forest: ForestConfig::default(),
            causality: CausalityConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate a JSON config file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every section
    pub fn validate(&self) -> Result<()> {
        if self.data.target.trim().is_empty() {
            return Err(ForecastError::ConfigError(
                "data.target must name a column".to_string(),
            ));
        }
        if self.data.predictors.iter().any(|p| p == &self.data.target) {
            return Err(ForecastError::ConfigError(format!(
                "target '{}' is also listed as a predictor",
                self.data.target
            )));
        }
        self.evaluation
            .validate()
            .map_err(|e| ForecastError::ConfigError(format!("evaluation: {}", e)))?;
        self.forest
            .regressor()
            .map_err(|e| ForecastError::ConfigError(format!("forest: {}", e)))?;
        if let Some(columns) = &self.causality.columns {
            if columns.len() < 2 {
                return Err(ForecastError::ConfigError(
                    "causality.columns needs at least two columns".to_string(),
                ));
            }
        }
        crate::causality::GrangerTest::new(self.causality.granger.clone())
            .map_err(|e| ForecastError::ConfigError(format!("causality: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::DatePolicy;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.lag, 4);
        assert_eq!(config.evaluation.train_fraction, 0.8);
        assert_eq!(config.forest.n_estimators, 100);
        assert_eq!(config.forest.seed, 42);
        assert_eq!(config.causality.granger.max_lag, 4);
        assert_eq!(config.causality.granger.fallback_lag, Some(2));
        assert_eq!(config.data.missing_policy, MissingPolicy::DropOnInvalid);
        assert_eq!(config.causality.missing_policy, MissingPolicy::ZeroOnInvalid);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "data": {{ "target": "conflict", "date_policy": "halt" }},
                "lag": 2,
                "forest": {{ "n_estimators": 10, "max_features": "sqrt" }},
                "causality": {{ "max_lag": 3, "fallback_lag": null }}
            }}"#
        )
        .unwrap();

        let config = PipelineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.data.target, "conflict");
        assert_eq!(config.data.load.date_policy, DatePolicy::Halt);
        assert_eq!(config.data.load.month_column, "Month");
        assert_eq!(config.lag, 2);
        assert_eq!(config.forest.n_estimators, 10);
        assert_eq!(config.forest.max_features, MaxFeatures::Sqrt);
        assert_eq!(config.forest.min_samples_split, 2);
        assert_eq!(config.causality.granger.max_lag, 3);
        assert_eq!(config.causality.granger.fallback_lag, None);
        assert_eq!(config.evaluation, EvaluationConfig::default());
    }

    #[test]
    fn test_json_round_trip() {
        let config = PipelineConfig::default();
        let parsed: PipelineConfig = serde_json::from_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "evaluation": {{ "train_fraction": 1.5 }} }}"#).unwrap();
        assert!(matches!(
            PipelineConfig::from_json_file(file.path()),
            Err(ForecastError::ConfigError(_))
        ));

        let mut config = PipelineConfig::default();
        config.data.predictors = vec![config.data.target.clone()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            PipelineConfig::from_json_file(file.path()),
            Err(ForecastError::ConfigError(_))
        ));
    }
}
