//! End-to-end modeling and causality runs
//!
//! Both pipelines start from a loaded [`MonthlyData`] table and choose their
//! own missing-value policy from the configuration: the modeling run drops
//! unparsable cells, the causality run zeroes them so that the log-difference
//! step removes the affected months.

use crate::causality::{log_difference_frame, GrangerResult, GrangerTest};
use crate::config::PipelineConfig;
use crate::data::{DataLoader, MonthlyData, SeriesSet};
use crate::error::{ForecastError, Result};
use crate::evaluation::{EvaluationReport, WalkForwardEvaluator};
use crate::features::LagFeatureBuilder;
use crate::forecast::{forecast_next, PointForecast};
use crate::models::{FittedRegressor, RandomForestRegressor, Regressor};
use std::path::Path;
use tracing::info;

/// Result of a modeling run
#[derive(Debug, Clone)]
pub struct ModelingOutcome {
    /// Target series name
    pub target: String,
    /// Lag horizon
    pub lag: usize,
    /// Rows in the lagged dataset
    pub dataset_rows: usize,
    /// Walk-forward report
    pub report: EvaluationReport,
    /// Importances of the model refitted on every row, when available
    pub importances: Option<Vec<(String, f64)>>,
    /// Prediction `lag` months past the last observation
    pub forecast: PointForecast,
}

/// Clean, lag, evaluate and forecast one target
#[derive(Debug, Clone)]
pub struct ModelingPipeline<R: Regressor> {
    config: PipelineConfig,
    model: R,
}

impl ModelingPipeline<RandomForestRegressor> {
    /// Pipeline using the configured random forest
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let model = config.forest.regressor()?;
        Self::with_model(config, model)
    }
}

impl<R: Regressor> ModelingPipeline<R> {
    /// Pipeline using any regressor
    pub fn with_model(config: PipelineConfig, model: R) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, model })
    }

    /// Pipeline configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load a CSV file and run
    pub fn run_csv<P: AsRef<Path>>(&self, path: P) -> Result<ModelingOutcome> {
        let data = DataLoader::from_csv(path, &self.config.data.load)?;
        self.run_data(&data)
    }

    /// Select and clean the configured columns, then run
    pub fn run_data(&self, data: &MonthlyData) -> Result<ModelingOutcome> {
        let target = &self.config.data.target;
        if !data.columns().iter().any(|c| c == target) {
            return Err(ForecastError::MissingColumn(target.clone()));
        }

        let mut columns = vec![target.clone()];
        if self.config.data.predictors.is_empty() {
            columns.extend(data.columns().iter().filter(|c| *c != target).cloned());
        } else {
            columns.extend(self.config.data.predictors.iter().cloned());
        }
        if columns.len() < 2 {
            return Err(ForecastError::DataError(format!(
                "no predictor columns besides '{}'",
                target
            )));
        }

        let set = data.series_set(&columns, self.config.data.missing_policy)?;
        self.run_series(&set)
    }

    /// Run on already-cleaned series
    pub fn run_series(&self, set: &SeriesSet) -> Result<ModelingOutcome> {
        let target = self.config.data.target.as_str();
        let builder = LagFeatureBuilder::new(self.config.lag);
        let dataset = builder.build(set, target)?;
        info!(target, lag = self.config.lag, rows = dataset.len(), "lagged dataset");

        let evaluator = WalkForwardEvaluator::new(self.config.evaluation.clone())?;
        let report = evaluator.evaluate(&dataset, &self.model)?;

        let all = 0..dataset.len();
        let final_model = self
            .model
            .fit(&dataset.features(all.clone()), &dataset.targets(all))?;
        let forecast = forecast_next(&final_model, set, &builder, target)?;

        Ok(ModelingOutcome {
            target: target.to_string(),
            lag: self.config.lag,
            dataset_rows: dataset.len(),
            report,
            importances: final_model.feature_importances(),
            forecast,
        })
    }
}

/// Result of a causality run
#[derive(Debug, Clone)]
pub struct CausalityOutcome {
    /// Columns tested
    pub columns: Vec<String>,
    /// Log-difference rows used
    pub frame_rows: usize,
    /// Log-difference rows removed as non-finite
    pub dropped_rows: usize,
    /// One result per ordered column pair
    pub results: Vec<GrangerResult>,
}

/// Pairwise Granger causality on log-differenced columns
#[derive(Debug, Clone)]
pub struct CausalityPipeline {
    config: PipelineConfig,
}

impl CausalityPipeline {
    /// Create a pipeline from a validated configuration
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Load a CSV file and run
    pub fn run_csv<P: AsRef<Path>>(&self, path: P) -> Result<CausalityOutcome> {
        let data = DataLoader::from_csv(path, &self.config.data.load)?;
        self.run_data(&data)
    }

    /// Columns to test: configured names, or the first three value columns
    pub fn columns(&self, data: &MonthlyData) -> Result<Vec<String>> {
        match &self.config.causality.columns {
            Some(columns) => Ok(columns.clone()),
            None => (0..3)
                .map(|pos| data.column_at(pos).map(str::to_string))
                .collect(),
        }
    }

    /// Clean, difference and test every ordered pair
    pub fn run_data(&self, data: &MonthlyData) -> Result<CausalityOutcome> {
        let columns = self.columns(data)?;
        let set = data.series_set(&columns, self.config.causality.missing_policy)?;
        self.run_series(&set)
    }

    /// Run on already-cleaned series
    pub fn run_series(&self, set: &SeriesSet) -> Result<CausalityOutcome> {
        let frame = log_difference_frame(set)?;
        let dropped_rows = set.len().saturating_sub(1) - frame.len();

        let test = GrangerTest::new(self.config.causality.granger.clone())?;
        let results = test.test_all_pairs(&frame)?;
        info!(
            columns = ?frame.names(),
            rows = frame.len(),
            dropped_rows,
            tests = results.len(),
            "causality run complete"
        );

        Ok(CausalityOutcome {
            columns: frame.names().to_vec(),
            frame_rows: frame.len(),
            dropped_rows,
            results,
        })
    }
}
