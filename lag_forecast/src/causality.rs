//! Granger causality on log-differenced monthly series
//!
//! Series are made stationary by log-differencing; rows where any column is
//! missing or non-finite (a zero or negative level) are removed before any
//! model sees them. A vector autoregression picks its lag order by AIC; when
//! that search is ill-conditioned the caller-supplied fallback order is used
//! and the substitution is logged.

use crate::data::SeriesSet;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use lag_math::linalg::{determinant, least_squares};
use lag_math::log_difference;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};
use std::fmt;
use tracing::{debug, info, warn};

/// Finite, equal-length columns ready for autoregression
#[derive(Debug, Clone, PartialEq)]
pub struct StationaryFrame {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
    dates: Option<Vec<NaiveDate>>,
}

impl StationaryFrame {
    /// Build a frame from already-transformed columns.
    ///
    /// Any non-finite value is rejected with `NonFiniteSeriesValue`.
    pub fn new(names: Vec<String>, columns: Vec<Vec<f64>>) -> Result<Self> {
        if names.len() != columns.len() {
            return Err(ForecastError::ValidationError(format!(
                "{} names for {} columns",
                names.len(),
                columns.len()
            )));
        }
        if let Some(first) = columns.first() {
            if columns.iter().any(|c| c.len() != first.len()) {
                return Err(ForecastError::ValidationError(
                    "Frame columns must have equal length".to_string(),
                ));
            }
        }
        for (name, column) in names.iter().zip(&columns) {
            if let Some(index) = column.iter().position(|v| !v.is_finite()) {
                return Err(ForecastError::NonFiniteSeriesValue {
                    series: name.clone(),
                    index,
                });
            }
        }
        Ok(Self {
            names,
            columns,
            dates: None,
        })
    }

    /// Column names
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Column values
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.position(name).map(|idx| self.columns[idx].as_slice())
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }

    /// Whether there are no rows
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Month of each row, when the source was dated
    pub fn dates(&self) -> Option<&[NaiveDate]> {
        self.dates.as_deref()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.position(name)
            .ok_or_else(|| ForecastError::MissingColumn(name.to_string()))
    }

    fn width(&self) -> usize {
        self.columns.len()
    }
}

/// Log-difference every series and keep only rows that are finite everywhere
pub fn log_difference_frame(set: &SeriesSet) -> Result<StationaryFrame> {
    if set.series().is_empty() {
        return Err(ForecastError::ValidationError(
            "No series to difference".to_string(),
        ));
    }

    let diffs: Vec<Vec<f64>> = set
        .series()
        .iter()
        .map(|s| log_difference(&s.values_or_nan()))
        .collect();
    let n = diffs[0].len();

    let keep: Vec<usize> = (0..n)
        .filter(|&r| diffs.iter().all(|col| col[r].is_finite()))
        .collect();
    let dropped = n - keep.len();
    if dropped > 0 {
        warn!(dropped, kept = keep.len(), "removed non-finite log-difference rows");
    }

    let columns: Vec<Vec<f64>> = diffs
        .iter()
        .map(|col| keep.iter().map(|&r| col[r]).collect())
        .collect();
    let names = set.names().into_iter().map(str::to_string).collect();

    let mut frame = StationaryFrame::new(names, columns)?;
    frame.dates = set
        .dates()
        .map(|d| keep.iter().map(|&r| d[r + 1]).collect());
    debug!(rows = frame.len(), "log-difference frame ready");
    Ok(frame)
}

/// Lagged design over times `start..len`: a constant column, then lags
/// `1..=lag` of each included column
fn design_matrix(
    frame: &StationaryFrame,
    include: &[usize],
    lag: usize,
    start: usize,
) -> Array2<f64> {
    let width = 1 + include.len() * lag;
    Array2::from_shape_fn((frame.len() - start, width), |(r, c)| {
        if c == 0 {
            1.0
        } else {
            let l = (c - 1) / include.len() + 1;
            let col = include[(c - 1) % include.len()];
            frame.columns[col][start + r - l]
        }
    })
}

/// OLS residuals of `target` on lagged `include` columns over times `start..len`
fn residuals(
    frame: &StationaryFrame,
    target: usize,
    include: &[usize],
    lag: usize,
    start: usize,
) -> Result<Array1<f64>> {
    let design = design_matrix(frame, include, lag, start);
    let y = Array1::from(frame.columns[target][start..].to_vec());
    let beta = least_squares(&design, &y)?;
    Ok(y - design.dot(&beta))
}

/// Information criterion value for one candidate order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderCriterion {
    /// Candidate lag order
    pub lag: usize,
    /// Akaike information criterion
    pub aic: f64,
}

/// AIC of every order in `1..=max_lag` for the full VAR, on a common sample
pub fn order_criteria(frame: &StationaryFrame, max_lag: usize) -> Result<Vec<OrderCriterion>> {
    if max_lag == 0 {
        return Err(ForecastError::InvalidParameter(
            "max_lag must be at least 1".to_string(),
        ));
    }
    let k = frame.width();
    let n = frame.len();
    let params = 1 + k * max_lag;
    if n <= max_lag || n - max_lag <= params {
        return Err(ForecastError::LagOrderSelectionFailure(format!(
            "{} rows cannot support a {}-variable VAR of order {}",
            n, k, max_lag
        )));
    }

    let t_eff = (n - max_lag) as f64;
    let all: Vec<usize> = (0..k).collect();

    (1..=max_lag)
        .map(|lag| {
            let equations: Vec<Array1<f64>> = (0..k)
                .map(|eq| residuals(frame, eq, &all, lag, max_lag))
                .collect::<Result<_>>()
                .map_err(|e| {
                    ForecastError::LagOrderSelectionFailure(format!("order {}: {}", lag, e))
                })?;

            // One residual column per equation
            let resid = Array2::from_shape_fn((n - max_lag, k), |(t, eq)| equations[eq][t]);
            let sigma = resid.t().dot(&resid) / t_eff;
            let det = determinant(&sigma)?;
            if !(det.is_finite() && det > 0.0) {
                return Err(ForecastError::LagOrderSelectionFailure(format!(
                    "order {}: residual covariance is singular",
                    lag
                )));
            }

            let aic = det.ln() + 2.0 * (lag * k * k + k) as f64 / t_eff;
            Ok(OrderCriterion { lag, aic })
        })
        .collect()
}

/// Lag order with minimum AIC
pub fn select_lag_order(frame: &StationaryFrame, max_lag: usize) -> Result<usize> {
    order_criteria(frame, max_lag)?
        .into_iter()
        .min_by(|a, b| a.aic.total_cmp(&b.aic))
        .map(|c| c.lag)
        .ok_or_else(|| ForecastError::LagOrderSelectionFailure("no candidate orders".to_string()))
}

/// Settings for the Granger test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrangerConfig {
    /// Largest order searched by AIC
    pub max_lag: usize,
    /// Order used when the search fails; `None` makes the failure fatal
    pub fallback_lag: Option<usize>,
    /// Significance level used when summarising results
    pub significance: f64,
}

impl Default for GrangerConfig {
    fn default() -> Self {
        Self {
            max_lag: 4,
            fallback_lag: Some(2),
            significance: 0.05,
        }
    }
}

/// How the lag order of a test was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LagSource {
    /// Minimum-AIC search
    Selected,
    /// Caller fallback after a failed search
    Fallback,
}

impl fmt::Display for LagSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LagSource::Selected => write!(f, "selected by AIC"),
            LagSource::Fallback => write!(f, "fallback"),
        }
    }
}

/// Result of testing "cause does not Granger-cause effect"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrangerResult {
    /// Candidate cause
    pub cause: String,
    /// Series being predicted
    pub effect: String,
    /// VAR lag order
    pub lag_order: usize,
    /// Where the lag order came from
    pub lag_source: LagSource,
    /// F statistic of the exclusion restriction
    pub f_statistic: f64,
    /// Numerator degrees of freedom
    pub df_num: usize,
    /// Denominator degrees of freedom
    pub df_denom: usize,
    /// p-value of the null hypothesis
    pub p_value: f64,
    /// Rows used in the regression
    pub observations: usize,
}

impl GrangerResult {
    /// Whether the null is rejected at `alpha`
    pub fn rejects_null(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

impl fmt::Display for GrangerResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}: F({}, {}) = {:.4}, p = {:.4} (lag {}, {}, n = {})",
            self.cause,
            self.effect,
            self.df_num,
            self.df_denom,
            self.f_statistic,
            self.p_value,
            self.lag_order,
            self.lag_source,
            self.observations
        )
    }
}

/// VAR-based Granger causality test
#[derive(Debug, Clone)]
pub struct GrangerTest {
    config: GrangerConfig,
}

impl GrangerTest {
    /// Create a test, validating the configuration
    pub fn new(config: GrangerConfig) -> Result<Self> {
        if config.max_lag == 0 {
            return Err(ForecastError::InvalidParameter(
                "max_lag must be at least 1".to_string(),
            ));
        }
        if config.fallback_lag == Some(0) {
            return Err(ForecastError::InvalidParameter(
                "fallback_lag must be at least 1".to_string(),
            ));
        }
        if !(config.significance > 0.0 && config.significance < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "significance must be between 0 and 1, got {}",
                config.significance
            )));
        }
        Ok(Self { config })
    }

    /// Test configuration
    pub fn config(&self) -> &GrangerConfig {
        &self.config
    }

    /// Lag order by AIC, or the configured fallback when the search fails
    pub fn lag_order(&self, frame: &StationaryFrame) -> Result<(usize, LagSource)> {
        match select_lag_order(frame, self.config.max_lag) {
            Ok(lag) => {
                info!(lag, max_lag = self.config.max_lag, "selected VAR lag order");
                Ok((lag, LagSource::Selected))
            }
            Err(ForecastError::LagOrderSelectionFailure(reason)) => match self.config.fallback_lag {
                Some(lag) => {
                    warn!(%reason, fallback = lag, "lag order selection failed, using fallback");
                    Ok((lag, LagSource::Fallback))
                }
                None => Err(ForecastError::LagOrderSelectionFailure(reason)),
            },
            Err(other) => Err(other),
        }
    }

    /// Test whether `cause` Granger-causes `effect` with the selected order
    pub fn test(&self, frame: &StationaryFrame, cause: &str, effect: &str) -> Result<GrangerResult> {
        let (lag, source) = self.lag_order(frame)?;
        self.test_with_lag(frame, cause, effect, lag, source)
    }

    /// Test every ordered pair of columns with one shared lag order
    pub fn test_all_pairs(&self, frame: &StationaryFrame) -> Result<Vec<GrangerResult>> {
        let (lag, source) = self.lag_order(frame)?;
        let mut results = Vec::new();
        for effect in frame.names() {
            for cause in frame.names() {
                if cause != effect {
                    results.push(self.test_with_lag(frame, cause, effect, lag, source)?);
                }
            }
        }
        Ok(results)
    }

    /// F-test of dropping the cause's lags from the effect equation
    pub fn test_with_lag(
        &self,
        frame: &StationaryFrame,
        cause: &str,
        effect: &str,
        lag: usize,
        source: LagSource,
    ) -> Result<GrangerResult> {
        if lag == 0 {
            return Err(ForecastError::InvalidParameter(
                "lag order must be at least 1".to_string(),
            ));
        }
        let cause_idx = frame.require(cause)?;
        let effect_idx = frame.require(effect)?;
        if cause_idx == effect_idx {
            return Err(ForecastError::InvalidParameter(format!(
                "cause and effect are both '{}'",
                cause
            )));
        }

        let k = frame.width();
        let n = frame.len();
        let params = 1 + k * lag;
        if n <= lag || n - lag <= params {
            return Err(ForecastError::insufficient(
                format!("Granger test at lag {}", lag),
                lag + params + 1,
                n,
            ));
        }
        let observations = n - lag;
        let df_num = lag;
        let df_denom = observations - params;

        let all: Vec<usize> = (0..k).collect();
        let restricted: Vec<usize> = all.iter().copied().filter(|&c| c != cause_idx).collect();
        let rss = |include: &[usize]| -> Result<f64> {
            let resid = residuals(frame, effect_idx, include, lag, lag)?;
            Ok(resid.dot(&resid))
        };
        let rss_full = rss(&all)?;
        let rss_restricted = rss(&restricted)?;

        let (f_statistic, p_value) = if rss_full <= f64::EPSILON {
            if rss_restricted > rss_full {
                (f64::INFINITY, 0.0)
            } else {
                (0.0, 1.0)
            }
        } else {
            let f_stat = ((rss_restricted - rss_full).max(0.0) / df_num as f64)
                / (rss_full / df_denom as f64);
            let dist = FisherSnedecor::new(df_num as f64, df_denom as f64)
                .map_err(|e| ForecastError::ModelError(format!("F distribution: {}", e)))?;
            (f_stat, (1.0 - dist.cdf(f_stat)).clamp(0.0, 1.0))
        };

        let result = GrangerResult {
            cause: cause.to_string(),
            effect: effect.to_string(),
            lag_order: lag,
            lag_source: source,
            f_statistic,
            df_num,
            df_denom,
            p_value,
            observations,
        };
        debug!(%result, "granger test");
        Ok(result)
    }
}
