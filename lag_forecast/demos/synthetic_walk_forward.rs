//! Walk-forward comparison of the forest and linear models on synthetic data,
//! followed by a Granger test on the same series.
//!
//! Run with `cargo run -p lag_forecast --example synthetic_walk_forward`.

use lag_forecast::causality::log_difference_frame;
use lag_forecast::models::{LinearRegression, RandomForestRegressor};
use lag_forecast::report::{importance_chart, learning_curve_table};
use lag_forecast::synthetic::{lagged_linear, PREDICTOR, TARGET};
use lag_forecast::{
    forecast_next, EvaluationConfig, FittedRegressor, GrangerConfig, GrangerTest, LagFeatureBuilder,
    SeriesSet, WalkForwardEvaluator,
};

fn main() -> lag_forecast::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lag_forecast=info".into()),
        )
        .init();

    let set = lagged_linear(48, 4, 2.0, 2.0, 7)?;
    let builder = LagFeatureBuilder::new(4);
    let dataset = builder.build(&set, TARGET)?;

    let evaluator = WalkForwardEvaluator::new(EvaluationConfig {
        learning_curve: true,
        ..EvaluationConfig::default()
    })?;

    let forest = RandomForestRegressor::new(50)?.with_seed(7);
    let (forest_report, fitted_forest) = evaluator.evaluate_with_model(&dataset, &forest)?;
    println!("{}", forest_report);
    if let Some(curve) = &forest_report.learning_curve {
        println!("{}\n", learning_curve_table(curve));
    }
    if let Some(importances) = fitted_forest.feature_importances() {
        println!("{}\n", importance_chart(&importances, 30));
    }

    let (linear_report, fitted_linear) =
        evaluator.evaluate_with_model(&dataset, &LinearRegression::new())?;
    println!("{}", linear_report);
    println!("Next value: {}\n", forecast_next(&fitted_linear, &set, &builder, TARGET)?);

    let pair = SeriesSet::new(vec![
        set.require(PREDICTOR)?.clone(),
        set.require(TARGET)?.clone(),
    ])?;
    let frame = log_difference_frame(&pair)?;
    let test = GrangerTest::new(GrangerConfig::default())?;
    println!("{}", test.test(&frame, PREDICTOR, TARGET)?);

    Ok(())
}
