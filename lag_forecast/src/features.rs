//! Lagged feature construction
//!
//! A lag-`k` dataset pairs each target value with the predictor values
//! observed `k` months earlier. Rows without a full lag history, or with a
//! missing target or predictor, are dropped; nothing is imputed across the
//! lag boundary. The same [`FeatureSchema`] travels with the dataset, the
//! fitted model and any forecast input, so feature names cannot drift apart
//! between training and prediction.

use crate::data::{Series, SeriesSet};
use crate::dates::sub_months;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Name of the lag-`lag` feature derived from `series`
pub fn lagged_name(series: &str, lag: usize) -> String {
    if lag == 0 {
        series.to_string()
    } else {
        format!("{}_lag{}", series, lag)
    }
}

/// Ordered feature names shared by datasets, models and forecast inputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    /// Create a schema from feature names
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Feature names in column order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of features
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the schema has no features
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Fail unless `other` names the same features in the same order
    pub fn ensure_matches(&self, other: &FeatureSchema) -> Result<()> {
        if self == other {
            Ok(())
        } else {
            Err(ForecastError::ValidationError(format!(
                "Feature schema mismatch: model expects {:?}, input has {:?}",
                self.names, other.names
            )))
        }
    }
}

/// Feature values under one schema, one row per observation
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    schema: FeatureSchema,
    values: Array2<f64>,
}

impl FeatureMatrix {
    /// Wrap a matrix, checking its width against the schema
    pub fn new(schema: FeatureSchema, values: Array2<f64>) -> Result<Self> {
        if values.ncols() != schema.len() {
            return Err(ForecastError::ValidationError(format!(
                "Matrix has {} columns but schema has {} features",
                values.ncols(),
                schema.len()
            )));
        }
        Ok(Self { schema, values })
    }

    /// Build a matrix from row vectors, checking every row against the schema width
    pub fn from_rows(schema: FeatureSchema, rows: &[Vec<f64>]) -> Result<Self> {
        if let Some(bad) = rows.iter().find(|r| r.len() != schema.len()) {
            return Err(ForecastError::ValidationError(format!(
                "Row has {} values but schema has {} features",
                bad.len(),
                schema.len()
            )));
        }
        let values = Array2::from_shape_fn((rows.len(), schema.len()), |(i, j)| rows[i][j]);
        Ok(Self { schema, values })
    }

    /// Schema of every row
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Feature values, rows by schema columns
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    /// Whether there are no rows
    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }
}

/// Feature values for a single point, tagged with their schema
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    schema: FeatureSchema,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Schema of the values
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Values in schema order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value of a named feature
    pub fn get(&self, name: &str) -> Option<f64> {
        self.schema
            .names()
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values[idx])
    }

    /// Single-row matrix for a model's predict call
    pub fn into_matrix(self) -> FeatureMatrix {
        let values = Array2::from_shape_fn((1, self.values.len()), |(_, j)| self.values[j]);
        FeatureMatrix {
            schema: self.schema,
            values,
        }
    }
}

/// One modeling row: the target at `index` and lagged predictor values
#[derive(Debug, Clone, PartialEq)]
pub struct LaggedRow {
    /// Row index in the source series set
    pub index: usize,
    /// Month of the target value, when the source was dated
    pub date: Option<NaiveDate>,
    /// Unshifted target value
    pub target: f64,
    /// Lagged predictor values in schema order
    pub features: Vec<f64>,
}

/// Chronologically ordered lagged rows
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    schema: FeatureSchema,
    target_name: String,
    lag: usize,
    rows: Vec<LaggedRow>,
}

impl Dataset {
    /// Feature schema
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Target series name
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Lag horizon used to build the dataset
    pub fn lag(&self) -> usize {
        self.lag
    }

    /// Rows in chronological order
    pub fn rows(&self) -> &[LaggedRow] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Feature matrix for a contiguous row range
    pub fn features(&self, range: std::ops::Range<usize>) -> FeatureMatrix {
        let rows = &self.rows[range];
        FeatureMatrix {
            schema: self.schema.clone(),
            values: Array2::from_shape_fn((rows.len(), self.schema.len()), |(i, j)| {
                rows[i].features[j]
            }),
        }
    }

    /// Target values for a contiguous row range
    pub fn targets(&self, range: std::ops::Range<usize>) -> Vec<f64> {
        self.rows[range].iter().map(|r| r.target).collect()
    }

    /// Turn the rows back into series: the target plus one series per feature.
    ///
    /// A lag-0 dataset built from the result has the same targets, features
    /// and dates as this one. Row indices refer to the new set.
    pub fn to_series_set(&self) -> Result<SeriesSet> {
        let mut series = vec![Series::from_values(
            self.target_name.clone(),
            self.rows.iter().map(|r| r.target).collect(),
        )];
        for (col, name) in self.schema.names().iter().enumerate() {
            series.push(Series::from_values(
                name.clone(),
                self.rows.iter().map(|r| r.features[col]).collect(),
            ));
        }

        let set = SeriesSet::new(series)?;
        let dates: Option<Vec<NaiveDate>> = self.rows.iter().map(|r| r.date).collect();
        match dates {
            Some(dates) if !dates.is_empty() => set.with_dates(dates),
            _ => Ok(set),
        }
    }
}

/// Builds lag-`k` datasets and single forecast rows from a series set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LagFeatureBuilder {
    lag: usize,
}

impl LagFeatureBuilder {
    /// Builder for lag horizon `lag`
    pub fn new(lag: usize) -> Self {
        Self { lag }
    }

    /// Lag horizon
    pub fn lag(&self) -> usize {
        self.lag
    }

    /// Predictor series: every series except the target, in set order
    fn predictors<'a>(&self, set: &'a SeriesSet, target: &str) -> Result<Vec<&'a Series>> {
        set.require(target)?;
        Ok(set.series().iter().filter(|s| s.name() != target).collect())
    }

    /// Schema of the datasets this builder produces for `target`
    pub fn schema(&self, set: &SeriesSet, target: &str) -> Result<FeatureSchema> {
        Ok(FeatureSchema::new(
            self.predictors(set, target)?
                .iter()
                .map(|s| lagged_name(s.name(), self.lag))
                .collect(),
        ))
    }

    /// Predictor values observed at `source_index`, or `None` if any is missing
    fn features_at(predictors: &[&Series], source_index: usize) -> Option<Vec<f64>> {
        predictors.iter().map(|s| s.get(source_index)).collect()
    }

    /// Whether row `i - lag` is exactly `lag` calendar months before row `i`.
    ///
    /// Undated sets are taken to be consecutive months.
    fn spans_lag(&self, set: &SeriesSet, i: usize) -> bool {
        match (set.date(i), set.date(i - self.lag)) {
            (Some(date), Some(source)) => sub_months(date, self.lag) == Some(source),
            _ => true,
        }
    }

    /// Build the lagged dataset for `target`.
    ///
    /// Row `i` holds target `i` and predictor values from row `i - lag`.
    /// On a dated set, row `i - lag` must fall exactly `lag` months before
    /// row `i`; rows whose window crosses a missing month are dropped.
    /// A lag at or beyond the series length yields an empty dataset.
    pub fn build(&self, set: &SeriesSet, target: &str) -> Result<Dataset> {
        let schema = self.schema(set, target)?;
        let predictors = self.predictors(set, target)?;
        let target_series = set.require(target)?;

        let gap_rows = (self.lag..set.len())
            .filter(|&i| !self.spans_lag(set, i))
            .count();
        if gap_rows > 0 {
            warn!(
                target,
                lag = self.lag,
                gap_rows,
                "dropped rows whose lag window crosses a missing month"
            );
        }

        let rows: Vec<LaggedRow> = (self.lag..set.len())
            .filter(|&i| self.spans_lag(set, i))
            .filter_map(|i| {
                let target_value = target_series.get(i)?;
                let features = Self::features_at(&predictors, i - self.lag)?;
                Some(LaggedRow {
                    index: i,
                    date: set.date(i),
                    target: target_value,
                    features,
                })
            })
            .collect();

        debug!(
            target,
            lag = self.lag,
            input_rows = set.len(),
            output_rows = rows.len(),
            "built lagged dataset"
        );

        Ok(Dataset {
            schema,
            target_name: target.to_string(),
            lag: self.lag,
            rows,
        })
    }

    /// Feature vector for forecasting the target `lag` rows after `source_index`.
    ///
    /// Uses the same predictor order and names as [`LagFeatureBuilder::build`].
    pub fn feature_vector(
        &self,
        set: &SeriesSet,
        target: &str,
        source_index: usize,
    ) -> Result<FeatureVector> {
        let schema = self.schema(set, target)?;
        let predictors = self.predictors(set, target)?;

        if source_index >= set.len() {
            return Err(ForecastError::insufficient(
                "forecast source row",
                source_index + 1,
                set.len(),
            ));
        }

        let values = Self::features_at(&predictors, source_index).ok_or_else(|| {
            ForecastError::insufficient(
                format!("complete predictors at row {}", source_index),
                predictors.len(),
                predictors
                    .iter()
                    .filter(|s| s.get(source_index).is_some())
                    .count(),
            )
        })?;

        Ok(FeatureVector { schema, values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_set() -> SeriesSet {
        SeriesSet::new(vec![
            Series::from_values("target", (0..10).map(|i| i as f64 * 10.0).collect()),
            Series::from_values("oil", (0..10).map(|i| 100.0 + i as f64).collect()),
            Series::new(
                "gold",
                (0..10)
                    .map(|i| if i == 3 { None } else { Some(i as f64) })
                    .collect(),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_lag_values_come_from_k_rows_earlier() {
        let set = sample_set();
        let dataset = LagFeatureBuilder::new(4).build(&set, "target").unwrap();

        assert_eq!(
            dataset.schema().names(),
            &["oil_lag4".to_string(), "gold_lag4".to_string()]
        );
        // First 4 rows lack history; row 7 would use gold[3], which is missing
        assert_eq!(dataset.len(), 10 - 4 - 1);
        for row in dataset.rows() {
            assert_eq!(row.target, row.index as f64 * 10.0);
            assert_eq!(row.features[0], 100.0 + (row.index - 4) as f64);
            assert_eq!(row.features[1], (row.index - 4) as f64);
        }
        assert!(dataset.rows().iter().all(|r| r.index != 7));
        assert!(dataset.rows().windows(2).all(|w| w[0].index < w[1].index));
    }

    fn month(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, m, 1).unwrap()
    }

    #[test]
    fn test_lag_window_must_not_cross_missing_month() {
        // March is absent from the table
        let months = vec![month(1), month(2), month(4), month(5), month(6), month(7)];
        let set = SeriesSet::new(vec![
            Series::from_values("y", vec![10.0, 20.0, 40.0, 50.0, 60.0, 70.0]),
            Series::from_values("x", vec![1.0, 2.0, 4.0, 5.0, 6.0, 7.0]),
        ])
        .unwrap()
        .with_dates(months)
        .unwrap();

        let dataset = LagFeatureBuilder::new(2).build(&set, "y").unwrap();
        let dates: Vec<Option<NaiveDate>> = dataset.rows().iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![Some(month(6)), Some(month(7))]);
        // x_lag2 holds the value from exactly two months earlier
        for row in dataset.rows() {
            assert_eq!(row.features, vec![row.target / 10.0 - 2.0]);
        }

        // Lag 1 only loses the April row, whose previous row is February
        let dataset = LagFeatureBuilder::new(1).build(&set, "y").unwrap();
        let dates: Vec<Option<NaiveDate>> = dataset.rows().iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![Some(month(2)), Some(month(5)), Some(month(6)), Some(month(7))]
        );
    }

    #[test]
    fn test_feature_matrix_checks_width() {
        let schema = FeatureSchema::new(vec!["a".to_string(), "b".to_string()]);
        assert!(FeatureMatrix::new(schema.clone(), Array2::zeros((3, 1))).is_err());
        assert!(FeatureMatrix::from_rows(schema.clone(), &[vec![1.0, 2.0], vec![3.0]]).is_err());

        let matrix = FeatureMatrix::from_rows(schema, &[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix.values()[[1, 0]], 3.0);
    }

    #[test]
    fn test_missing_target_rows_dropped() {
        let set = SeriesSet::new(vec![
            Series::new("y", vec![Some(1.0), None, Some(3.0), Some(4.0)]),
            Series::from_values("x", vec![1.0, 2.0, 3.0, 4.0]),
        ])
        .unwrap();
        let dataset = LagFeatureBuilder::new(1).build(&set, "y").unwrap();
        let indices: Vec<usize> = dataset.rows().iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![2, 3]);
    }

    #[test]
    fn test_lag_beyond_length_is_empty() {
        let set = sample_set();
        for lag in [10, 11, 50] {
            let dataset = LagFeatureBuilder::new(lag).build(&set, "target").unwrap();
            assert!(dataset.is_empty());
        }
    }

    #[test]
    fn test_unknown_target() {
        let set = sample_set();
        assert!(matches!(
            LagFeatureBuilder::new(1).build(&set, "rubber"),
            Err(ForecastError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_zero_lag_rebuild_is_identity() {
        let set = sample_set();
        let dataset = LagFeatureBuilder::new(4).build(&set, "target").unwrap();
        let rebuilt = LagFeatureBuilder::new(0)
            .build(&dataset.to_series_set().unwrap(), "target")
            .unwrap();

        assert_eq!(rebuilt.schema(), dataset.schema());
        assert_eq!(rebuilt.len(), dataset.len());
        for (i, (a, b)) in rebuilt.rows().iter().zip(dataset.rows()).enumerate() {
            assert_eq!(a.target, b.target);
            assert_eq!(a.features, b.features);
            assert_eq!(a.date, b.date);
            // Indices are positions in the rebuilt set, not the source set
            assert_eq!(a.index, i);
        }
    }

    #[test]
    fn test_feature_vector_matches_training_schema() {
        let set = sample_set();
        let builder = LagFeatureBuilder::new(4);
        let dataset = builder.build(&set, "target").unwrap();
        let vector = builder.feature_vector(&set, "target", 9).unwrap();

        assert_eq!(vector.schema(), dataset.schema());
        assert_eq!(vector.get("oil_lag4"), Some(109.0));
        assert_eq!(vector.get("gold_lag4"), Some(9.0));

        assert!(matches!(
            builder.feature_vector(&set, "target", 3),
            Err(ForecastError::InsufficientData { .. })
        ));
        assert!(builder.feature_vector(&set, "target", 10).is_err());
    }

    #[test]
    fn test_schema_mismatch_detected() {
        let a = FeatureSchema::new(vec!["x_lag4".to_string()]);
        let b = FeatureSchema::new(vec!["x_lag3".to_string()]);
        assert!(a.ensure_matches(&a.clone()).is_ok());
        assert!(matches!(
            a.ensure_matches(&b),
            Err(ForecastError::ValidationError(_))
        ));
    }
}
