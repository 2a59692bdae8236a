//! # Lag Forecast
//!
//! Lagged-feature modeling and causality testing for monthly series, built
//! around commodity-import, commodity-price and conflict-fatality tables.
//!
//! ## Features
//!
//! - Monthly table loading with free-text month normalization
//! - Numeric cleaning under an explicit missing-value policy
//! - Lag-`k` feature datasets with a shared feature schema
//! - Chronological walk-forward evaluation with overfitting ratio and learning curve
//! - Random forest, linear and mean-baseline regressors
//! - VAR Granger causality with AIC lag selection and a logged fallback order
//! - Point forecasts `k` months ahead
//!
//! ## Quick Start
//!
//! ```rust
//! use lag_forecast::models::LinearRegression;
//! use lag_forecast::synthetic::{lagged_linear, TARGET};
//! use lag_forecast::{EvaluationConfig, LagFeatureBuilder, WalkForwardEvaluator};
//!
//! # fn main() -> lag_forecast::Result<()> {
//! // Two years of months where the target follows the predictor four months later
//! let set = lagged_linear(24, 4, 2.0, 1.0, 42)?;
//! let dataset = LagFeatureBuilder::new(4).build(&set, TARGET)?;
//!
//! let evaluator = WalkForwardEvaluator::new(EvaluationConfig::default())?;
//! let report = evaluator.evaluate(&dataset, &LinearRegression::new())?;
//! assert!(report.test_rmse < report.baseline_test_rmse);
//! # Ok(())
//! # }
//! ```

pub mod causality;
pub mod cleaning;
pub mod config;
pub mod data;
pub mod dates;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod forecast;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod synthetic;

// Re-export commonly used types
pub use crate::causality::{GrangerConfig, GrangerResult, GrangerTest, StationaryFrame};
pub use crate::cleaning::MissingPolicy;
pub use crate::config::PipelineConfig;
pub use crate::data::{DataLoader, LoadOptions, MonthlyData, Series, SeriesSet};
pub use crate::dates::DatePolicy;
pub use crate::error::{ForecastError, Result};
pub use crate::evaluation::{EvaluationConfig, EvaluationReport, Verdict, WalkForwardEvaluator};
pub use crate::features::{Dataset, FeatureSchema, LagFeatureBuilder};
pub use crate::forecast::{forecast_for, forecast_next, PointForecast};
pub use crate::models::{FittedRegressor, Regressor};
pub use crate::pipeline::{CausalityPipeline, ModelingPipeline};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
