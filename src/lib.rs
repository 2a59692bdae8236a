//! # Lagcast Workspace
//!
//! Umbrella crate for the lagged monthly-series workspace.
//!
//! - [`lag_math`]: error metrics, small linear algebra and series transforms
//! - [`lag_forecast`]: loading, cleaning, lag features, models, walk-forward
//!   evaluation, Granger causality and point forecasts
//!
//! ## Example
//!
//! ```
//! use lagcast_workspace::lag_forecast::LagFeatureBuilder;
//! use lagcast_workspace::lag_forecast::synthetic::{lagged_linear, TARGET};
//!
//! let set = lagged_linear(12, 2, 1.0, 0.0, 1).unwrap();
//! let dataset = LagFeatureBuilder::new(2).build(&set, TARGET).unwrap();
//! assert_eq!(dataset.len(), 10);
//! ```

pub use lag_forecast;
pub use lag_math;
