//! Seeded synthetic monthly data
//!
//! Produces series with a known lag relationship for tests and the `demo`
//! command.

use crate::data::{Series, SeriesSet};
use crate::dates::add_months;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Name of the driving series in [`lagged_linear`] output
pub const PREDICTOR: &str = "predictor";
/// Name of the unrelated series in [`lagged_linear`] output
pub const DISTRACTOR: &str = "distractor";
/// Name of the target series in [`lagged_linear`] output
pub const TARGET: &str = "target";

/// Monthly set where `target[i] = slope * predictor[i - lag] + noise`.
///
/// Rows start in January 2020. The first `lag` target values are pure noise
/// around the predictor mean, so they carry no lag signal. A third series of
/// independent noise is included so models have something to ignore.
pub fn lagged_linear(n: usize, lag: usize, slope: f64, noise_sd: f64, seed: u64) -> Result<SeriesSet> {
    if n == 0 {
        return Err(ForecastError::InvalidParameter(
            "synthetic series needs at least one row".to_string(),
        ));
    }
    let noise = Normal::new(0.0, noise_sd).map_err(|e| {
        ForecastError::InvalidParameter(format!("noise_sd {}: {}", noise_sd, e))
    })?;
    let level = Normal::new(50.0, 10.0).map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;
    let mut rng = StdRng::seed_from_u64(seed);

    let predictor: Vec<f64> = (0..n).map(|_| level.sample(&mut rng)).collect();
    let distractor: Vec<f64> = (0..n).map(|_| level.sample(&mut rng)).collect();
    let target: Vec<f64> = (0..n)
        .map(|i| {
            let signal = if i >= lag { predictor[i - lag] } else { 50.0 };
            slope * signal + noise.sample(&mut rng)
        })
        .collect();

    let start = NaiveDate::from_ymd_opt(2020, 1, 1)
        .ok_or_else(|| ForecastError::DataError("invalid start month".to_string()))?;
    let dates: Vec<NaiveDate> = (0..n)
        .map(|i| {
            add_months(start, i)
                .ok_or_else(|| ForecastError::DataError(format!("month {} out of range", i)))
        })
        .collect::<Result<_>>()?;

    SeriesSet::new(vec![
        Series::from_values(TARGET, target),
        Series::from_values(PREDICTOR, predictor),
        Series::from_values(DISTRACTOR, distractor),
    ])?
    .with_dates(dates)
}
