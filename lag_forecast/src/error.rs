//! Error types for the lag_forecast crate

use lag_math::MathError;
use thiserror::Error;

/// Custom error types for the lag_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Month token whose first three letters name no calendar month
    #[error("Unrecognized month: {0:?}")]
    UnrecognizedMonth(String),

    /// Numeric text that could not be parsed after stripping separators
    #[error("Unparsable number: {0:?}")]
    UnparsableNumber(String),

    /// Fewer usable rows than a component needs
    #[error("Insufficient data for {context}: need {required} rows, have {available}")]
    InsufficientData {
        context: String,
        required: usize,
        available: usize,
    },

    /// Log or ratio transform produced a value that cannot be modeled
    #[error("Non-finite value in series '{series}' at row {index}")]
    NonFiniteSeriesValue { series: String, index: usize },

    /// Automatic lag-order search could not produce an order
    #[error("Lag order selection failed: {0}")]
    LagOrderSelectionFailure(String),

    /// A column the pipeline needs is absent from the input
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error related to parameter validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error raised while fitting or applying a model
    #[error("Model error: {0}")]
    ModelError(String),

    /// Error reading or validating a configuration file
    #[error("Config error: {0}")]
    ConfigError(String),

    /// Error from the CSV reader
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from numeric primitives
    #[error("Math error: {0}")]
    Math(#[from] MathError),
}

impl ForecastError {
    /// Shorthand for [`ForecastError::InsufficientData`]
    pub fn insufficient(context: impl Into<String>, required: usize, available: usize) -> Self {
        ForecastError::InsufficientData {
            context: context.into(),
            required,
            available,
        }
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::CsvError(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::ConfigError(err.to_string())
    }
}
