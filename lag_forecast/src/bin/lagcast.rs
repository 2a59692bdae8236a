//! lagcast - command-line entry point
//!
//! Runs the modeling or causality pipeline on a monthly CSV table, or the
//! modeling pipeline on seeded synthetic data.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use lag_forecast::models::{LinearRegression, Regressor};
use lag_forecast::pipeline::{CausalityOutcome, ModelingOutcome};
use lag_forecast::report::{granger_table, importance_chart, learning_curve_table, overlay_table};
use lag_forecast::synthetic::{lagged_linear, PREDICTOR, TARGET};
use lag_forecast::{CausalityPipeline, ModelingPipeline, PipelineConfig, SeriesSet};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "lagcast")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Lagged forecasting and Granger causality for monthly series")]
struct Cli {
    /// JSON configuration file; flags override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModelChoice {
    Forest,
    Linear,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk-forward evaluation and next-step forecast on a CSV table
    Evaluate {
        /// Input CSV with Month and Year columns
        #[arg(short, long)]
        data: PathBuf,

        /// Target column name
        #[arg(short, long)]
        target: Option<String>,

        /// Predictor columns (comma separated); default is every other column
        #[arg(short, long, value_delimiter = ',')]
        predictors: Vec<String>,

        /// Lag horizon in months
        #[arg(short, long)]
        lag: Option<usize>,

        /// Share of rows used for training
        #[arg(long)]
        train_fraction: Option<f64>,

        /// Also compute the learning curve
        #[arg(long)]
        learning_curve: bool,

        /// Regression model
        #[arg(short, long, value_enum, default_value = "forest")]
        model: ModelChoice,

        /// Random forest seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Pairwise Granger causality on log-differenced columns
    Causality {
        /// Input CSV with Month and Year columns
        #[arg(short, long)]
        data: PathBuf,

        /// Columns to test (comma separated); default is the first three value columns
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,

        /// Largest VAR order searched
        #[arg(long)]
        max_lag: Option<usize>,

        /// Order used if the search fails
        #[arg(long)]
        fallback_lag: Option<usize>,
    },

    /// Run the modeling pipeline on seeded synthetic data
    Demo {
        /// Number of months
        #[arg(long, default_value = "24")]
        rows: usize,

        /// True lag of the synthetic relationship
        #[arg(short, long, default_value = "4")]
        lag: usize,

        /// Noise standard deviation
        #[arg(long, default_value = "1.0")]
        noise: f64,

        /// Data and forest seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Regression model
        #[arg(short, long, value_enum, default_value = "forest")]
        model: ModelChoice,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

enum Input<'a> {
    Csv(&'a Path),
    Series(&'a SeriesSet),
}

fn run_modeling<R: Regressor>(pipeline: ModelingPipeline<R>, input: Input<'_>) -> anyhow::Result<ModelingOutcome> {
    let outcome = match input {
        Input::Csv(path) => pipeline
            .run_csv(path)
            .with_context(|| format!("modeling {}", path.display()))?,
        Input::Series(set) => pipeline.run_series(set)?,
    };
    Ok(outcome)
}

fn modeling(config: PipelineConfig, model: ModelChoice, input: Input<'_>) -> anyhow::Result<()> {
    let outcome = match model {
        ModelChoice::Forest => run_modeling(ModelingPipeline::from_config(config)?, input)?,
        ModelChoice::Linear => {
            run_modeling(ModelingPipeline::with_model(config, LinearRegression::new())?, input)?
        }
    };
    print_modeling(&outcome);
    Ok(())
}

fn print_modeling(outcome: &ModelingOutcome) {
    println!("{}", outcome.report);
    if let Some(curve) = &outcome.report.learning_curve {
        println!("{}\n", learning_curve_table(curve));
    }
    if let Some(importances) = &outcome.importances {
        println!("Feature importances:");
        println!("{}\n", importance_chart(importances, 40));
    }
    println!("Forecast: {}", outcome.forecast);
}

fn print_causality(outcome: &CausalityOutcome, alpha: f64) {
    println!(
        "Granger causality on {} log-differenced months ({} removed):",
        outcome.frame_rows, outcome.dropped_rows
    );
    println!("{}", granger_table(&outcome.results, alpha));
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lag_forecast=info,lagcast=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Evaluate {
            data,
            target,
            predictors,
            lag,
            train_fraction,
            learning_curve,
            model,
            seed,
        } => {
            if let Some(target) = target {
                config.data.target = target;
            }
            if !predictors.is_empty() {
                config.data.predictors = predictors;
            }
            if let Some(lag) = lag {
                config.lag = lag;
            }
            if let Some(fraction) = train_fraction {
                config.evaluation.train_fraction = fraction;
            }
            if learning_curve {
                config.evaluation.learning_curve = true;
            }
            if let Some(seed) = seed {
                config.forest.seed = seed;
            }
            modeling(config, model, Input::Csv(&data))?;
        }
        Commands::Causality {
            data,
            columns,
            max_lag,
            fallback_lag,
        } => {
            if !columns.is_empty() {
                config.causality.columns = Some(columns);
            }
            if let Some(max_lag) = max_lag {
                config.causality.granger.max_lag = max_lag;
            }
            if let Some(fallback) = fallback_lag {
                config.causality.granger.fallback_lag = Some(fallback);
            }
            let alpha = config.causality.granger.significance;
            let outcome = CausalityPipeline::new(config)?
                .run_csv(&data)
                .with_context(|| format!("causality {}", data.display()))?;
            print_causality(&outcome, alpha);
        }
        Commands::Demo {
            rows,
            lag,
            noise,
            seed,
            model,
        } => {
            let set = lagged_linear(rows, lag, 2.0, noise, seed)?;
            config.data.target = TARGET.to_string();
            config.data.predictors.clear();
            config.lag = lag;
            config.forest.seed = seed;
            config.evaluation.learning_curve = true;

            println!("{}\n", overlay_table(&set, &[TARGET, PREDICTOR])?);
            modeling(config, model, Input::Series(&set))?;
        }
    }

    Ok(())
}
