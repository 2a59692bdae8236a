//! Walk-forward evaluation of lagged regression models
//!
//! The dataset is split once, chronologically: a training prefix and a
//! held-out suffix of later months. Rows are never shuffled, so no future
//! observation can leak into training. The learning curve grows the training
//! subset while scoring every fit against the same held-out suffix.

use crate::error::{ForecastError, Result};
use crate::features::Dataset;
use crate::models::{FittedRegressor, MeanBaseline, Regressor};
use lag_math::root_mean_squared_error;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Settings for a walk-forward run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Share of rows in the training prefix, strictly between 0 and 1
    pub train_fraction: f64,
    /// Smallest training set a fit may use
    pub min_train_size: usize,
    /// Growth of the training subset between learning-curve points
    pub step: usize,
    /// Overfitting ratio above which the run is flagged
    pub overfit_threshold: f64,
    /// Whether to compute the learning curve
    pub learning_curve: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            train_fraction: 0.8,
            min_train_size: 5,
            step: 1,
            overfit_threshold: 2.0,
            learning_curve: false,
        }
    }
}

impl EvaluationConfig {
    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "train_fraction must be between 0 and 1, got {}",
                self.train_fraction
            )));
        }
        if self.min_train_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "min_train_size must be at least 1".to_string(),
            ));
        }
        if self.step == 0 {
            return Err(ForecastError::InvalidParameter(
                "step must be at least 1".to_string(),
            ));
        }
        if !(self.overfit_threshold.is_finite() && self.overfit_threshold > 0.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "overfit_threshold must be positive, got {}",
                self.overfit_threshold
            )));
        }
        Ok(())
    }
}

/// Chronological train/test boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split {
    /// Rows `[0, split_index)` train, `[split_index, len)` are held out
    pub split_index: usize,
    /// Total rows
    pub len: usize,
}

impl Split {
    /// `floor(train_fraction * len)`
    pub fn new(len: usize, train_fraction: f64) -> Self {
        Self {
            split_index: (train_fraction * len as f64).floor() as usize,
            len,
        }
    }

    /// Training prefix row range
    pub fn train(&self) -> std::ops::Range<usize> {
        0..self.split_index
    }

    /// Held-out suffix row range
    pub fn test(&self) -> std::ops::Range<usize> {
        self.split_index..self.len
    }

    /// Training row count
    pub fn train_len(&self) -> usize {
        self.split_index
    }

    /// Held-out row count
    pub fn test_len(&self) -> usize {
        self.len - self.split_index
    }
}

/// Training-subset sizes `min, min+step, ...` not exceeding `train_len`
pub fn learning_curve_sizes(min_train_size: usize, step: usize, train_len: usize) -> Vec<usize> {
    if step == 0 || min_train_size == 0 {
        return Vec::new();
    }
    (min_train_size..=train_len).step_by(step).collect()
}

/// Advisory reading of the overfitting ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Ratio above the threshold
    HighOverfitting,
    /// Ratio at or below the threshold
    GeneralizesAcceptably,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::HighOverfitting => write!(f, "high overfitting"),
            Verdict::GeneralizesAcceptably => write!(f, "generalizes acceptably"),
        }
    }
}

/// One learning-curve measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearningCurvePoint {
    /// Training subset size
    pub train_size: usize,
    /// RMSE on that subset
    pub train_rmse: f64,
    /// RMSE on the fixed held-out suffix
    pub test_rmse: f64,
}

/// Outcome of a walk-forward run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Name of the evaluated model
    pub model_name: String,
    /// Rows in the training prefix
    pub train_rows: usize,
    /// Rows in the held-out suffix
    pub test_rows: usize,
    /// RMSE of the prefix fit on the prefix
    pub train_rmse: f64,
    /// RMSE of the prefix fit on the suffix
    pub test_rmse: f64,
    /// Held-out RMSE of predicting the training mean
    pub baseline_test_rmse: f64,
    /// `test_rmse / train_rmse`
    pub overfitting_ratio: f64,
    /// Threshold the ratio was compared with
    pub overfit_threshold: f64,
    /// Ratio reading
    pub verdict: Verdict,
    /// Learning curve, ascending by training size
    pub learning_curve: Option<Vec<LearningCurvePoint>>,
}

/// `test / train`; 1.0 when both are zero, infinite when only training error is zero
pub fn overfitting_ratio(train_rmse: f64, test_rmse: f64) -> f64 {
    if train_rmse > 0.0 {
        test_rmse / train_rmse
    } else if test_rmse > 0.0 {
        f64::INFINITY
    } else {
        1.0
    }
}

/// Chronological train/test evaluator
#[derive(Debug, Clone)]
pub struct WalkForwardEvaluator {
    config: EvaluationConfig,
}

impl WalkForwardEvaluator {
    /// Create an evaluator, validating the configuration
    pub fn new(config: EvaluationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Evaluator configuration
    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Split `dataset`, failing before any fit if either side is too small
    pub fn split(&self, dataset: &Dataset) -> Result<Split> {
        let len = dataset.len();
        let min = self.config.min_train_size;
        if len < min {
            return Err(ForecastError::insufficient("walk-forward evaluation", min, len));
        }

        let split = Split::new(len, self.config.train_fraction);
        if split.train_len() < min {
            return Err(ForecastError::insufficient(
                "walk-forward training prefix",
                min,
                split.train_len(),
            ));
        }
        if split.test_len() == 0 {
            return Err(ForecastError::insufficient("walk-forward held-out suffix", 1, 0));
        }
        Ok(split)
    }

    /// Fit on `train_range` and score on it and on the held-out rows
    fn fit_and_score<R: Regressor>(
        model: &R,
        dataset: &Dataset,
        train_range: std::ops::Range<usize>,
        test_range: std::ops::Range<usize>,
    ) -> Result<(R::Fitted, f64, f64)> {
        let train_x = dataset.features(train_range.clone());
        let train_y = dataset.targets(train_range);
        let fitted = model.fit(&train_x, &train_y)?;

        let train_rmse = root_mean_squared_error(&train_y, &fitted.predict(&train_x)?)?;
        let test_x = dataset.features(test_range.clone());
        let test_y = dataset.targets(test_range);
        let test_rmse = root_mean_squared_error(&test_y, &fitted.predict(&test_x)?)?;
        Ok((fitted, train_rmse, test_rmse))
    }

    /// Run the evaluation, returning the report and the model fitted on the prefix
    pub fn evaluate_with_model<R: Regressor>(
        &self,
        dataset: &Dataset,
        model: &R,
    ) -> Result<(EvaluationReport, R::Fitted)> {
        let split = self.split(dataset)?;
        info!(
            model = model.name(),
            rows = dataset.len(),
            train = split.train_len(),
            test = split.test_len(),
            "walk-forward split"
        );

        let (fitted, train_rmse, test_rmse) =
            Self::fit_and_score(model, dataset, split.train(), split.test())?;
        let (_, _, baseline_test_rmse) =
            Self::fit_and_score(&MeanBaseline::new(), dataset, split.train(), split.test())?;

        let ratio = overfitting_ratio(train_rmse, test_rmse);
        let verdict = if ratio > self.config.overfit_threshold {
            Verdict::HighOverfitting
        } else {
            Verdict::GeneralizesAcceptably
        };

        let learning_curve = if self.config.learning_curve {
            Some(self.learning_curve(dataset, model)?)
        } else {
            None
        };

        let report = EvaluationReport {
            model_name: model.name().to_string(),
            train_rows: split.train_len(),
            test_rows: split.test_len(),
            train_rmse,
            test_rmse,
            baseline_test_rmse,
            overfitting_ratio: ratio,
            overfit_threshold: self.config.overfit_threshold,
            verdict,
            learning_curve,
        };
        info!(
            train_rmse,
            test_rmse,
            ratio,
            verdict = %verdict,
            "walk-forward evaluation complete"
        );
        Ok((report, fitted))
    }

    /// Run the evaluation and return only the report
    pub fn evaluate<R: Regressor>(&self, dataset: &Dataset, model: &R) -> Result<EvaluationReport> {
        self.evaluate_with_model(dataset, model).map(|(report, _)| report)
    }

    /// Fit on growing prefixes of the training rows, scoring each on the fixed suffix
    pub fn learning_curve<R: Regressor>(
        &self,
        dataset: &Dataset,
        model: &R,
    ) -> Result<Vec<LearningCurvePoint>> {
        let split = self.split(dataset)?;
        learning_curve_sizes(self.config.min_train_size, self.config.step, split.train_len())
            .into_iter()
            .map(|size| -> Result<LearningCurvePoint> {
                let (_, train_rmse, test_rmse) =
                    Self::fit_and_score(model, dataset, 0..size, split.test())?;
                debug!(size, train_rmse, test_rmse, "learning curve point");
                Ok(LearningCurvePoint {
                    train_size: size,
                    train_rmse,
                    test_rmse,
                })
            })
            .collect()
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Walk-Forward Evaluation ({}):", self.model_name)?;
        writeln!(f, "  Training rows:     {}", self.train_rows)?;
        writeln!(f, "  Held-out rows:     {}", self.test_rows)?;
        writeln!(f, "  Train RMSE:        {:.4}", self.train_rmse)?;
        writeln!(f, "  Held-out RMSE:     {:.4}", self.test_rmse)?;
        writeln!(f, "  Mean-baseline RMSE:{:>9.4}", self.baseline_test_rmse)?;
        writeln!(
            f,
            "  Overfitting ratio: {:.2} ({}, threshold {:.2})",
            self.overfitting_ratio, self.verdict, self.overfit_threshold
        )?;
        // Points are rendered by `report::learning_curve_table`
        if let Some(curve) = &self.learning_curve {
            writeln!(f, "  Learning curve:    {} points", curve.len())?;
        }
        Ok(())
    }
}
