//! Plain-text diagnostic charts

use crate::causality::GrangerResult;
use crate::data::SeriesSet;
use crate::dates::month_label;
use crate::error::Result;
use crate::evaluation::LearningCurvePoint;
use lag_math::min_max_normalize;

const DOT: char = '●';

/// Horizontal dot chart of feature importances, largest first.
///
/// Dot positions are scaled so the largest importance sits at `width`.
pub fn importance_chart(importances: &[(String, f64)], width: usize) -> String {
    let mut sorted: Vec<&(String, f64)> = importances.iter().collect();
    sorted.sort_by(|a, b| b.1.total_cmp(&a.1));

    let label_width = sorted.iter().map(|(n, _)| n.len()).max().unwrap_or(0);
    let max = sorted.first().map(|(_, v)| *v).unwrap_or(0.0);

    sorted
        .iter()
        .map(|(name, value)| {
            let position = if max > 0.0 {
                ((value / max) * width as f64).round() as usize
            } else {
                0
            };
            format!(
                "{:<label_width$} |{}{} {:.4}",
                name,
                "-".repeat(position),
                DOT,
                value,
                label_width = label_width
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Month-by-month table of min-max scaled series, for visual comparison.
///
/// Missing or non-finite values are shown as `-`.
pub fn overlay_table(set: &SeriesSet, names: &[&str]) -> Result<String> {
    let columns: Vec<Vec<f64>> = names
        .iter()
        .map(|name| -> Result<Vec<f64>> {
            Ok(min_max_normalize(&set.require(name)?.values_or_nan())?)
        })
        .collect::<Result<_>>()?;
    let widths: Vec<usize> = names.iter().map(|n| n.len().max(6)).collect();

    let mut lines = Vec::with_capacity(set.len() + 1);
    let mut header = format!("{:<8}", "month");
    for (name, w) in names.iter().zip(&widths) {
        header.push_str(&format!(" {:>w$}", name, w = w));
    }
    lines.push(header);

    for row in 0..set.len() {
        let label = set
            .date(row)
            .map(month_label)
            .unwrap_or_else(|| row.to_string());
        let mut line = format!("{:<8}", label);
        for (col, w) in columns.iter().zip(&widths) {
            let cell = if col[row].is_finite() {
                format!("{:.3}", col[row])
            } else {
                "-".to_string()
            };
            line.push_str(&format!(" {:>w$}", cell, w = w));
        }
        lines.push(line);
    }
    Ok(lines.join("\n"))
}

/// Table of learning-curve points in ascending size
pub fn learning_curve_table(points: &[LearningCurvePoint]) -> String {
    let mut lines = vec![format!("{:>6} {:>12} {:>12}", "size", "train_rmse", "test_rmse")];
    lines.extend(points.iter().map(|p| {
        format!("{:>6} {:>12.4} {:>12.4}", p.train_size, p.train_rmse, p.test_rmse)
    }));
    lines.join("\n")
}

/// One line per Granger test with a significance marker
pub fn granger_table(results: &[GrangerResult], alpha: f64) -> String {
    results
        .iter()
        .map(|r| {
            let marker = if r.rejects_null(alpha) { "*" } else { " " };
            format!("{} {}", marker, r)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Series;
    use crate::evaluation::{EvaluationReport, Verdict};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_importance_chart_orders_and_scales() {
        let chart = importance_chart(
            &[("oil_lag4".to_string(), 0.25), ("gold_lag4".to_string(), 0.75)],
            4,
        );
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("gold_lag4 |----●"));
        assert!(lines[1].starts_with("oil_lag4  |-●"));
    }

    #[test]
    fn test_overlay_table_scales_to_unit_range() {
        let set = SeriesSet::new(vec![
            Series::from_values("oil", vec![10.0, 20.0, 30.0]),
            Series::new("gold", vec![Some(5.0), None, Some(7.0)]),
        ])
        .unwrap()
        .with_dates(
            (1..=3)
                .map(|m| NaiveDate::from_ymd_opt(2022, m, 1).unwrap())
                .collect(),
        )
        .unwrap();

        let table = overlay_table(&set, &["oil", "gold"]).unwrap();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("2022-01"));
        assert!(lines[1].ends_with("0.000  0.000"));
        assert!(lines[2].contains("0.500"));
        assert!(lines[2].ends_with('-'));
        assert!(lines[3].ends_with("1.000  1.000"));
    }

    #[test]
    fn test_learning_curve_table() {
        let table = learning_curve_table(&[
            LearningCurvePoint {
                train_size: 5,
                train_rmse: 0.5,
                test_rmse: 1.0,
            },
            LearningCurvePoint {
                train_size: 6,
                train_rmse: 0.6,
                test_rmse: 0.9,
            },
        ]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].split_whitespace().collect::<Vec<_>>(), vec!["5", "0.5000", "1.0000"]);
    }

    #[test]
    fn test_report_and_table_list_each_point_once() {
        let curve = vec![
            LearningCurvePoint {
                train_size: 5,
                train_rmse: 0.5,
                test_rmse: 1.0,
            },
            LearningCurvePoint {
                train_size: 6,
                train_rmse: 0.6,
                test_rmse: 0.9,
            },
        ];
        let report = EvaluationReport {
            model_name: "Linear Regression".to_string(),
            train_rows: 6,
            test_rows: 2,
            train_rmse: 0.6,
            test_rmse: 0.9,
            baseline_test_rmse: 2.0,
            overfitting_ratio: 1.5,
            overfit_threshold: 2.0,
            verdict: Verdict::GeneralizesAcceptably,
            learning_curve: Some(curve.clone()),
        };

        let printed = format!("{}\n{}", report, learning_curve_table(&curve));
        for size in ["5", "6"] {
            let rows = printed
                .lines()
                .filter(|l| l.split_whitespace().next() == Some(size))
                .count();
            assert_eq!(rows, 1, "size {} in:\n{}", size, printed);
        }
    }
}
