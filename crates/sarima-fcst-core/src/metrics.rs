//! Forecast accuracy metrics and truth/forecast alignment.
//!
//! | Metric | Meaning |
//! |--------|---------|
//! | MAE | Average error in original units |
//! | RMSE | Penalizes large errors more heavily |
//! | MAPE | Percentage error; undefined when any actual value is zero |
//! | Coverage | Share of actual values inside the forecast bounds |

use crate::error::{ForecastError, Result};
use crate::forecast::ForecastResult;
use crate::series::SeriesView;
use serde::Serialize;

/// Calculates Mean Absolute Error between actual and predicted values.
///
/// # Formula
/// MAE = (1/n) * Σ|actual_i - forecast_i|
///
/// # Example
/// ```
/// use sarima_fcst_core::metrics::mae;
/// let actual = vec![1.0, 2.0, 3.0];
/// let forecast = vec![1.1, 2.2, 2.8];
/// let error = mae(&actual, &forecast).unwrap();
/// assert!((error - 0.166).abs() < 0.01);
/// ```
pub fn mae(actual: &[f64], forecast: &[f64]) -> Result<f64> {
    validate_inputs(actual, forecast)?;
    let sum: f64 = actual
        .iter()
        .zip(forecast.iter())
        .map(|(a, f)| (a - f).abs())
        .sum();
    Ok(sum / actual.len() as f64)
}

/// Mean Squared Error.
pub fn mse(actual: &[f64], forecast: &[f64]) -> Result<f64> {
    validate_inputs(actual, forecast)?;
    let sum: f64 = actual
        .iter()
        .zip(forecast.iter())
        .map(|(a, f)| (a - f).powi(2))
        .sum();
    Ok(sum / actual.len() as f64)
}

/// Root Mean Squared Error, in the original units.
pub fn rmse(actual: &[f64], forecast: &[f64]) -> Result<f64> {
    Ok(mse(actual, forecast)?.sqrt())
}

/// Calculates Mean Absolute Percentage Error.
///
/// Fails with [`ForecastError::DivideByZeroInMape`] at the first zero actual
/// value instead of skipping it.
///
/// # Formula
/// MAPE = (100/n) * Σ|actual_i - forecast_i| / actual_i
///
/// # Example
/// ```
/// use sarima_fcst_core::metrics::mape;
/// let error = mape(&[100.0, 200.0, 50.0], &[110.0, 180.0, 55.0]).unwrap();
/// assert!((error - 10.0).abs() < 1e-9);
/// ```
pub fn mape(actual: &[f64], forecast: &[f64]) -> Result<f64> {
    validate_inputs(actual, forecast)?;
    if let Some(index) = actual.iter().position(|a| *a == 0.0) {
        return Err(ForecastError::DivideByZeroInMape { index });
    }
    let sum: f64 = actual
        .iter()
        .zip(forecast.iter())
        .map(|(a, f)| (a - f).abs() / a)
        .sum();
    Ok(sum / actual.len() as f64 * 100.0)
}

/// Fraction of actual values within `[lower, upper]`.
pub fn coverage(actual: &[f64], lower: &[f64], upper: &[f64]) -> Result<f64> {
    validate_inputs(actual, lower)?;
    validate_inputs(actual, upper)?;
    let covered = actual
        .iter()
        .zip(lower.iter().zip(upper.iter()))
        .filter(|(a, (l, u))| *a >= *l && *a <= *u)
        .count();
    Ok(covered as f64 / actual.len() as f64)
}

fn validate_inputs(actual: &[f64], forecast: &[f64]) -> Result<()> {
    if actual.len() != forecast.len() {
        return Err(ForecastError::InvalidInput(format!(
            "Actual and forecast arrays must have the same length: {} vs {}",
            actual.len(),
            forecast.len()
        )));
    }
    if actual.is_empty() {
        return Err(ForecastError::InvalidInput(
            "Cannot compute a metric over zero observations".to_string(),
        ));
    }
    Ok(())
}

/// Accuracy of a forecast over a held-out window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    /// Number of aligned observations
    pub n: usize,
    pub mape: f64,
    pub mae: f64,
    pub rmse: f64,
    /// Share of actual values inside the forecast bounds
    pub coverage: f64,
}

/// Pair truth values with forecast means by date.
///
/// Both sides must hold the same dates in the same order.
pub fn align(truth: SeriesView<'_>, forecast: &ForecastResult) -> Result<(Vec<f64>, Vec<f64>)> {
    if truth.len() != forecast.len() {
        return Err(ForecastError::Alignment(format!(
            "{} truth values but {} forecast points",
            truth.len(),
            forecast.len()
        )));
    }
    if let Some((d, p)) = truth
        .dates()
        .iter()
        .zip(&forecast.points)
        .find(|(d, p)| **d != p.date)
    {
        return Err(ForecastError::Alignment(format!(
            "truth date {} does not match forecast date {}",
            d, p.date
        )));
    }
    Ok((truth.values().to_vec(), forecast.means()))
}

/// Score `forecast` against `truth` after aligning them by date.
pub fn evaluate(truth: SeriesView<'_>, forecast: &ForecastResult) -> Result<Evaluation> {
    let (actual, predicted) = align(truth, forecast)?;
    let lower: Vec<f64> = forecast.points.iter().map(|p| p.lower).collect();
    let upper: Vec<f64> = forecast.points.iter().map(|p| p.upper).collect();
    Ok(Evaluation {
        n: actual.len(),
        mape: mape(&actual, &predicted)?,
        mae: mae(&actual, &predicted)?,
        rmse: rmse(&actual, &predicted)?,
        coverage: coverage(&actual, &lower, &upper)?,
    })
}
