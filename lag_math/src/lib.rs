//! # Lag Math
//!
//! Numeric building blocks for the lagged-series workspace.
//! This crate provides error metrics, small dense linear algebra used by the
//! regression and autoregression code, and series transforms.

use thiserror::Error;

pub mod linalg;
pub mod metrics;
pub mod transforms;

/// Errors that can occur in numeric calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("Singular matrix: {0}")]
    SingularMatrix(String),
}

/// Result type for numeric operations
pub type Result<T> = std::result::Result<T, MathError>;

pub use linalg::{determinant, least_squares, solve};
pub use metrics::{mean, mean_squared_error, root_mean_squared_error};
pub use transforms::{log_difference, min_max_normalize};
