//! Monthly observation tables and the numeric series derived from them

use crate::cleaning::{clean, parse_number, MissingPolicy};
use crate::dates::{month_label, normalize_month, DatePolicy};
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// One calendar-month record with its raw cell text
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    date: NaiveDate,
    values: BTreeMap<String, String>,
}

impl Observation {
    /// Create an observation with no values yet
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            values: BTreeMap::new(),
        }
    }

    /// Attach the raw text of one column
    pub fn with_value(mut self, column: impl Into<String>, raw: impl Into<String>) -> Self {
        self.values.insert(column.into(), raw.into());
        self
    }

    /// First day of the observation's month
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Raw cell text for a column
    pub fn raw(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }
}

/// Observations sorted ascending by month, at most one per month
#[derive(Debug, Clone)]
pub struct MonthlyData {
    observations: Vec<Observation>,
    columns: Vec<String>,
}

impl MonthlyData {
    /// Sort observations chronologically and reject duplicate months.
    ///
    /// `columns` lists the value columns in source order; positional lookups
    /// use this order.
    pub fn new(mut observations: Vec<Observation>, columns: Vec<String>) -> Result<Self> {
        observations.sort_by_key(Observation::date);

        if let Some(pair) = observations.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(ForecastError::DataError(format!(
                "Duplicate observation for {}",
                month_label(pair[0].date)
            )));
        }

        Ok(Self {
            observations,
            columns,
        })
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether there are no observations
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Sorted observations
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Value column names in source order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Month keys in ascending order
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.observations.iter().map(Observation::date).collect()
    }

    /// Name of the value column at `position` (0-based, Month/Year excluded)
    pub fn column_at(&self, position: usize) -> Result<&str> {
        self.columns
            .get(position)
            .map(String::as_str)
            .ok_or_else(|| {
                ForecastError::MissingColumn(format!(
                    "no value column at position {} ({} available)",
                    position,
                    self.columns.len()
                ))
            })
    }

    /// Clean one column into a series aligned with the observations
    pub fn series(&self, column: &str, policy: MissingPolicy) -> Result<Series> {
        if !self.columns.iter().any(|c| c == column) {
            return Err(ForecastError::MissingColumn(column.to_string()));
        }

        let values: Vec<Option<f64>> = self
            .observations
            .iter()
            .map(|obs| obs.raw(column).and_then(|raw| clean(raw, policy)))
            .collect();

        let series = Series::new(column, values);
        debug!(
            column,
            ?policy,
            present = series.present_count(),
            total = series.len(),
            "cleaned series"
        );
        Ok(series)
    }

    /// Clean several columns into a dated series set
    pub fn series_set<S: AsRef<str>>(&self, columns: &[S], policy: MissingPolicy) -> Result<SeriesSet> {
        let series = columns
            .iter()
            .map(|c| self.series(c.as_ref(), policy))
            .collect::<Result<Vec<_>>>()?;
        SeriesSet::new(series)?.with_dates(self.dates())
    }
}

/// Column names and the date policy used while reading a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Header of the free-text month column
    pub month_column: String,
    /// Header of the year column
    pub year_column: String,
    /// Handling of rows whose month or year cannot be read
    pub date_policy: DatePolicy,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            month_column: "Month".to_string(),
            year_column: "Year".to_string(),
            date_policy: DatePolicy::DropRow,
        }
    }
}

/// Data loader for monthly tables
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a monthly table from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<MonthlyData> {
        let path = path.as_ref();
        let file = File::open(path)?;
        info!(path = %path.display(), "loading monthly table");
        Self::from_reader(file, options)
    }

    /// Load a monthly table from any CSV source with a header row
    pub fn from_reader<R: Read>(reader: R, options: &LoadOptions) -> Result<MonthlyData> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        let month_idx = Self::header_index(&headers, &options.month_column)?;
        let year_idx = Self::header_index(&headers, &options.year_column)?;

        let columns: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != month_idx && *idx != year_idx)
            .map(|(_, name)| name.clone())
            .collect();

        let mut observations = Vec::new();
        let mut dropped = 0usize;

        for (line, record) in csv_reader.records().enumerate() {
            let record = record?;
            let month = record.get(month_idx).unwrap_or_default();
            let year = record.get(year_idx).unwrap_or_default();

            let date = match Self::parse_year(year).and_then(|y| normalize_month(month, y)) {
                Ok(date) => date,
                Err(err) => match options.date_policy {
                    DatePolicy::Halt => return Err(err),
                    DatePolicy::DropRow => {
                        warn!(row = line + 1, error = %err, "dropping row with unreadable date");
                        dropped += 1;
                        continue;
                    }
                },
            };

            let mut obs = Observation::new(date);
            for (idx, name) in headers.iter().enumerate() {
                if idx == month_idx || idx == year_idx {
                    continue;
                }
                obs = obs.with_value(name.clone(), record.get(idx).unwrap_or_default());
            }
            observations.push(obs);
        }

        let data = MonthlyData::new(observations, columns)?;
        info!(rows = data.len(), dropped, "loaded monthly table");
        Ok(data)
    }

    fn header_index(headers: &[String], name: &str) -> Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ForecastError::MissingColumn(name.to_string()))
    }

    fn parse_year(raw: &str) -> Result<i32> {
        if let Ok(year) = raw.trim().parse::<i32>() {
            return Ok(year);
        }
        // Spreadsheet exports sometimes write years as "2021.0"
        let value = parse_number(raw)?;
        if value.fract() == 0.0 && value.abs() < i32::MAX as f64 {
            Ok(value as i32)
        } else {
            Err(ForecastError::DataError(format!("Unreadable year {:?}", raw)))
        }
    }
}

/// A named numeric series; `None` marks a missing value
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    name: String,
    values: Vec<Option<f64>>,
}

impl Series {
    /// Create a series from optional values
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Create a series with no missing values
    pub fn from_values(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::new(name, values.into_iter().map(Some).collect())
    }

    /// Series name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Values in chronological order
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Value at `index`, `None` when missing or out of range
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series has no rows
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of non-missing values
    pub fn present_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Copy shifted forward by `lag` rows: row `i` holds the value from `i - lag`
    pub fn shifted(&self, lag: usize) -> Series {
        let values = (0..self.values.len())
            .map(|i| i.checked_sub(lag).and_then(|src| self.get(src)))
            .collect();
        Series::new(self.name.clone(), values)
    }

    /// Values with missing entries as `NaN`
    pub fn values_or_nan(&self) -> Vec<f64> {
        self.values.iter().map(|v| v.unwrap_or(f64::NAN)).collect()
    }
}

/// Equal-length series sharing one chronological row index
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeriesSet {
    series: Vec<Series>,
    dates: Option<Vec<NaiveDate>>,
}

impl SeriesSet {
    /// Group series, checking lengths and name uniqueness
    pub fn new(series: Vec<Series>) -> Result<Self> {
        if let Some(first) = series.first() {
            if let Some(bad) = series.iter().find(|s| s.len() != first.len()) {
                return Err(ForecastError::ValidationError(format!(
                    "Series '{}' has {} rows but '{}' has {}",
                    bad.name(),
                    bad.len(),
                    first.name(),
                    first.len()
                )));
            }
        }

        let mut names = HashSet::new();
        for s in &series {
            if !names.insert(s.name()) {
                return Err(ForecastError::ValidationError(format!(
                    "Duplicate series name '{}'",
                    s.name()
                )));
            }
        }

        Ok(Self {
            series,
            dates: None,
        })
    }

    /// Attach the month key of every row
    pub fn with_dates(mut self, dates: Vec<NaiveDate>) -> Result<Self> {
        if dates.len() != self.len() {
            return Err(ForecastError::ValidationError(format!(
                "{} dates supplied for {} rows",
                dates.len(),
                self.len()
            )));
        }
        if dates.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ForecastError::ValidationError(
                "Dates must be strictly increasing".to_string(),
            ));
        }
        self.dates = Some(dates);
        Ok(self)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.series.first().map(Series::len).unwrap_or(0)
    }

    /// Whether there are no rows
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Series in insertion order
    pub fn series(&self) -> &[Series] {
        &self.series
    }

    /// Series names in insertion order
    pub fn names(&self) -> Vec<&str> {
        self.series.iter().map(Series::name).collect()
    }

    /// Look up a series by name
    pub fn get(&self, name: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.name() == name)
    }

    /// Look up a series by name, failing with `MissingColumn`
    pub fn require(&self, name: &str) -> Result<&Series> {
        self.get(name)
            .ok_or_else(|| ForecastError::MissingColumn(name.to_string()))
    }

    /// Row dates, if known
    pub fn dates(&self) -> Option<&[NaiveDate]> {
        self.dates.as_deref()
    }

    /// Date of one row, if known
    pub fn date(&self, index: usize) -> Option<NaiveDate> {
        self.dates.as_ref().and_then(|d| d.get(index).copied())
    }
}
