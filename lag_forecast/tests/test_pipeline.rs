use lag_forecast::models::{LinearRegression, RandomForestRegressor};
use lag_forecast::pipeline::{CausalityPipeline, ModelingPipeline};
use lag_forecast::synthetic::{lagged_linear, DISTRACTOR, PREDICTOR, TARGET};
use lag_forecast::{
    EvaluationConfig, ForecastError, LagFeatureBuilder, PipelineConfig, SeriesSet, Verdict,
    WalkForwardEvaluator,
};
use chrono::{Datelike, NaiveDate};
use std::io::Write;
use tempfile::NamedTempFile;

const MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

// Write a series set as a Month/Year table with thousands separators
fn write_table(set: &SeriesSet) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Month,Year,{}", set.names().join(",")).unwrap();
    for row in 0..set.len() {
        let date = set.date(row).unwrap();
        let cells: Vec<String> = set
            .series()
            .iter()
            .map(|s| {
                let value = s.get(row).unwrap() * 100.0;
                let whole = value.round() as i64;
                format!("\"{},{:03}\"", whole / 1000, whole % 1000)
            })
            .collect();
        writeln!(
            file,
            "{},{},{}",
            MONTHS[date.month0() as usize],
            date.year(),
            cells.join(",")
        )
        .unwrap();
    }
    file
}

fn synthetic_config(lag: usize) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.data.target = TARGET.to_string();
    config.lag = lag;
    config
}

#[test]
fn test_synthetic_lag_four_beats_mean_baseline() {
    // 24 months, target = 2 * predictor four months earlier plus noise
    let set = lagged_linear(24, 4, 2.0, 1.0, 42).unwrap();
    let dataset = LagFeatureBuilder::new(4).build(&set, TARGET).unwrap();
    assert_eq!(dataset.len(), 20);

    let evaluator = WalkForwardEvaluator::new(EvaluationConfig::default()).unwrap();
    let forest = RandomForestRegressor::new(100).unwrap().with_seed(42);
    let report = evaluator.evaluate(&dataset, &forest).unwrap();

    assert_eq!(report.train_rows, 16);
    assert_eq!(report.test_rows, 4);
    assert!(
        report.test_rmse < report.baseline_test_rmse,
        "forest {} vs baseline {}",
        report.test_rmse,
        report.baseline_test_rmse
    );

    let linear = evaluator.evaluate(&dataset, &LinearRegression::new()).unwrap();
    assert!(linear.test_rmse < linear.baseline_test_rmse);
    assert_eq!(linear.verdict, Verdict::GeneralizesAcceptably);
}

#[test]
fn test_same_seed_same_report() {
    let set = lagged_linear(30, 2, 1.5, 2.0, 3).unwrap();
    let pipeline = ModelingPipeline::from_config(synthetic_config(2)).unwrap();

    let first = pipeline.run_series(&set).unwrap();
    let second = pipeline.run_series(&set).unwrap();
    assert_eq!(first.report, second.report);
    assert_eq!(first.forecast, second.forecast);
}

#[test]
fn test_modeling_pipeline_from_csv() {
    let set = lagged_linear(36, 3, 2.0, 0.5, 17).unwrap();
    let file = write_table(&set);

    let mut config = synthetic_config(3);
    config.evaluation.learning_curve = true;
    let outcome = ModelingPipeline::with_model(config, LinearRegression::new())
        .unwrap()
        .run_csv(file.path())
        .unwrap();

    assert_eq!(outcome.dataset_rows, 33);
    assert!(outcome.report.test_rmse < outcome.report.baseline_test_rmse);

    let curve = outcome.report.learning_curve.unwrap();
    let sizes: Vec<usize> = curve.iter().map(|p| p.train_size).collect();
    assert_eq!(sizes, (5..=26).collect::<Vec<_>>());

    assert_eq!(outcome.forecast.date, NaiveDate::from_ymd_opt(2023, 3, 1));
    let expected = 2.0 * set.get(PREDICTOR).unwrap().get(35).unwrap() * 100.0;
    assert!((outcome.forecast.value - expected).abs() < 1000.0);
}

#[test]
fn test_forest_importances_favor_predictor() {
    let set = lagged_linear(60, 1, 3.0, 0.5, 5).unwrap();
    let outcome = ModelingPipeline::from_config(synthetic_config(1))
        .unwrap()
        .run_series(&set)
        .unwrap();

    let importances = outcome.importances.unwrap();
    let weight = |name: &str| {
        importances
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
            .unwrap()
    };
    assert!(weight("predictor_lag1") > weight("distractor_lag1"));
    let total: f64 = importances.iter().map(|(_, v)| v).sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn test_too_few_rows_is_fatal() {
    let set = lagged_linear(8, 4, 2.0, 1.0, 1).unwrap();
    let result = ModelingPipeline::from_config(synthetic_config(4))
        .unwrap()
        .run_series(&set);
    assert!(matches!(result, Err(ForecastError::InsufficientData { .. })));
}

#[test]
fn test_causality_pipeline_from_csv() {
    let set = lagged_linear(80, 1, 2.0, 1.0, 23).unwrap();
    let file = write_table(&set);

    let mut config = PipelineConfig::default();
    config.causality.columns = Some(vec![PREDICTOR.to_string(), TARGET.to_string()]);
    let outcome = CausalityPipeline::new(config)
        .unwrap()
        .run_csv(file.path())
        .unwrap();

    assert_eq!(outcome.frame_rows, 79);
    assert_eq!(outcome.dropped_rows, 0);
    assert_eq!(outcome.results.len(), 2);

    let forward = outcome
        .results
        .iter()
        .find(|r| r.cause == PREDICTOR && r.effect == TARGET)
        .unwrap();
    assert!(forward.p_value < 0.01, "{}", forward);
}

#[test]
fn test_causality_defaults_to_first_three_columns() {
    let set = lagged_linear(40, 1, 2.0, 1.0, 2).unwrap();
    let file = write_table(&set);

    let outcome = CausalityPipeline::new(PipelineConfig::default())
        .unwrap()
        .run_csv(file.path())
        .unwrap();
    assert_eq!(outcome.columns, vec![TARGET, PREDICTOR, DISTRACTOR]);
    assert_eq!(outcome.results.len(), 6);
}
