//! Single-step point forecasts from a fitted lag model
//!
//! The feature row is produced by [`LagFeatureBuilder::feature_vector`], the
//! same routine that names training features, and is checked against the
//! model's schema before prediction.

use crate::data::SeriesSet;
use crate::dates::{add_months, month_label, sub_months};
use crate::error::{ForecastError, Result};
use crate::features::LagFeatureBuilder;
use crate::models::FittedRegressor;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// A predicted target value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointForecast {
    /// Target series name
    pub target: String,
    /// Month the predictors were observed, when dated
    pub source_date: Option<NaiveDate>,
    /// Month being predicted, when dated
    pub date: Option<NaiveDate>,
    /// Row index of the predictors in the series set
    pub source_index: usize,
    /// Lag horizon
    pub lag: usize,
    /// Predicted value
    pub value: f64,
}

impl fmt::Display for PointForecast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.date, self.source_date) {
            (Some(date), Some(source)) => write!(
                f,
                "{} for {}: {:.4} (from {} predictors, lag {})",
                self.target,
                month_label(date),
                self.value,
                month_label(source),
                self.lag
            ),
            _ => write!(
                f,
                "{} at row {} + {}: {:.4}",
                self.target, self.source_index, self.lag, self.value
            ),
        }
    }
}

fn predict_from<M: FittedRegressor + ?Sized>(
    model: &M,
    set: &SeriesSet,
    builder: &LagFeatureBuilder,
    target: &str,
    source_index: usize,
) -> Result<PointForecast> {
    let vector = builder.feature_vector(set, target, source_index)?;
    model.schema().ensure_matches(vector.schema())?;

    let predictions = model.predict(&vector.into_matrix())?;
    let value = predictions.first().copied().ok_or_else(|| {
        ForecastError::ModelError(format!("{} returned no prediction", model.name()))
    })?;

    let source_date = set.date(source_index);
    let forecast = PointForecast {
        target: target.to_string(),
        source_date,
        date: source_date.and_then(|d| add_months(d, builder.lag())),
        source_index,
        lag: builder.lag(),
        value,
    };
    info!(model = model.name(), %forecast, "point forecast");
    Ok(forecast)
}

/// Predict the target `lag` months after the most recent observation
pub fn forecast_next<M: FittedRegressor + ?Sized>(
    model: &M,
    set: &SeriesSet,
    builder: &LagFeatureBuilder,
    target: &str,
) -> Result<PointForecast> {
    if set.is_empty() {
        return Err(ForecastError::insufficient("forecast source row", 1, 0));
    }
    predict_from(model, set, builder, target, set.len() - 1)
}

/// Predict the target for `date` from the observation exactly `lag` months earlier
pub fn forecast_for<M: FittedRegressor + ?Sized>(
    model: &M,
    set: &SeriesSet,
    builder: &LagFeatureBuilder,
    target: &str,
    date: NaiveDate,
) -> Result<PointForecast> {
    let dates = set.dates().ok_or_else(|| {
        ForecastError::DataError("Series set has no dates to forecast against".to_string())
    })?;
    let source_date = sub_months(date, builder.lag()).ok_or_else(|| {
        ForecastError::InvalidParameter(format!("{} is out of calendar range", date))
    })?;
    let source_index = dates
        .binary_search(&source_date)
        .map_err(|_| {
            ForecastError::insufficient(
                format!("observation for {}", month_label(source_date)),
                1,
                0,
            )
        })?;
    predict_from(model, set, builder, target, source_index)
}
