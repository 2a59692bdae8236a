//! Numeric cleaning for locale-formatted table cells
//!
//! Cells arrive as text such as `"1,234"`, `" 56.7 "`, `"N/A"` or an empty
//! string. Parsing failures are resolved by a [`MissingPolicy`] chosen by the
//! caller; nothing here decides on its own whether a bad cell means "missing"
//! or "zero".

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// How to resolve a cell that does not parse as a finite number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Mark the cell missing; the row is excluded later
    DropOnInvalid,
    /// Treat the cell as zero, keeping the series length intact
    ZeroOnInvalid,
}

/// Parse a numeric cell, stripping grouping commas and whitespace.
///
/// Empty text, non-numeric text and non-finite values (`NaN`, `inf`) all fail
/// with [`ForecastError::UnparsableNumber`].
pub fn parse_number(raw: &str) -> Result<f64> {
    let stripped: String = raw
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    stripped
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ForecastError::UnparsableNumber(raw.to_string()))
}

/// Clean a cell under `policy`; `None` is the missing marker
pub fn clean(raw: &str, policy: MissingPolicy) -> Option<f64> {
    match parse_number(raw) {
        Ok(value) => Some(value),
        Err(_) => match policy {
            MissingPolicy::DropOnInvalid => None,
            MissingPolicy::ZeroOnInvalid => Some(0.0),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1,234", 1234.0)]
    #[case("1,234,567.5", 1234567.5)]
    #[case("  42 ", 42.0)]
    #[case("-3.5", -3.5)]
    #[case("0", 0.0)]
    #[case("1e3", 1000.0)]
    fn test_parse_number(#[case] raw: &str, #[case] expected: f64) {
        assert_eq!(parse_number(raw).unwrap(), expected);
        assert_eq!(clean(raw, MissingPolicy::DropOnInvalid), Some(expected));
        assert_eq!(clean(raw, MissingPolicy::ZeroOnInvalid), Some(expected));
    }

    #[rstest]
    #[case("N/A")]
    #[case("")]
    #[case("   ")]
    #[case("NaN")]
    #[case("inf")]
    #[case("12abc")]
    fn test_invalid_cells_follow_policy(#[case] raw: &str) {
        assert!(matches!(
            parse_number(raw),
            Err(ForecastError::UnparsableNumber(_))
        ));
        assert_eq!(clean(raw, MissingPolicy::DropOnInvalid), None);
        assert_eq!(clean(raw, MissingPolicy::ZeroOnInvalid), Some(0.0));
    }
}
