//! Month-name normalization
//!
//! Source tables label rows with a free-text month ("January", "jan", "Sept.")
//! and a separate year. Every row is keyed by the first day of its month.

use crate::error::{ForecastError, Result};
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// What to do with a row whose month or year cannot be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DatePolicy {
    /// Skip the row and keep loading
    #[default]
    DropRow,
    /// Abort loading with the date error
    Halt,
}

/// Month number (1-12) for a free-text month token.
///
/// Matching is case-insensitive on the first three characters after trimming.
pub fn month_number(token: &str) -> Result<u32> {
    let prefix: String = token.trim().chars().take(3).collect::<String>().to_lowercase();
    MONTH_ABBREVIATIONS
        .iter()
        .position(|abbr| *abbr == prefix)
        .map(|idx| idx as u32 + 1)
        .ok_or_else(|| ForecastError::UnrecognizedMonth(token.to_string()))
}

/// First day of the month named by `token` in `year`
pub fn normalize_month(token: &str, year: i32) -> Result<NaiveDate> {
    let month = month_number(token)?;
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        ForecastError::DataError(format!("Year {} is out of the supported date range", year))
    })
}

/// Date `months` calendar months after `date`
pub fn add_months(date: NaiveDate, months: usize) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(u32::try_from(months).ok()?))
}

/// Date `months` calendar months before `date`
pub fn sub_months(date: NaiveDate, months: usize) -> Option<NaiveDate> {
    date.checked_sub_months(Months::new(u32::try_from(months).ok()?))
}

/// Short `YYYY-MM` label used in reports
pub fn month_label(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_abbreviation_maps_to_its_month() {
        let mut seen = Vec::new();
        for (idx, abbr) in MONTH_ABBREVIATIONS.iter().enumerate() {
            let month = month_number(abbr).unwrap();
            assert_eq!(month, idx as u32 + 1);
            seen.push(month);
        }
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 12);
    }

    #[test]
    fn test_full_names_and_case() {
        assert_eq!(month_number("January").unwrap(), 1);
        assert_eq!(month_number("  SEPTEMBER ").unwrap(), 9);
        assert_eq!(month_number("Sept.").unwrap(), 9);
        assert_eq!(month_number("dEcEmBeR").unwrap(), 12);
    }

    #[test]
    fn test_unrecognized_month() {
        for token in ["", "ja", "Jnu", "13", "Month", "Sme"] {
            assert!(
                matches!(month_number(token), Err(ForecastError::UnrecognizedMonth(_))),
                "token {:?} should be rejected",
                token
            );
        }
    }

    #[test]
    fn test_normalize_month() {
        let date = normalize_month("Mar", 2021).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2021, 3, 1).unwrap());
        assert_eq!(month_label(date), "2021-03");
    }

    #[test]
    fn test_month_arithmetic() {
        let date = NaiveDate::from_ymd_opt(2022, 11, 1).unwrap();
        assert_eq!(add_months(date, 4), NaiveDate::from_ymd_opt(2023, 3, 1));
        assert_eq!(sub_months(date, 12), NaiveDate::from_ymd_opt(2021, 11, 1));
    }
}
