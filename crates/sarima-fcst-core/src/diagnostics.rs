//! Residual diagnostics for a fitted model.
//!
//! Produces the numbers behind the usual four-panel residual plot:
//! standardized residuals over time, their histogram, a normal Q-Q plot and
//! the correlogram. Ljung-Box and Jarque-Bera summarize the last two.

use crate::error::{ForecastError, Result};
use crate::sarima::Sarima;
use anofox_forecast::features::autocorrelation;
use anofox_forecast::validation::{jarque_bera, ljung_box, JarqueBeraResult, LjungBoxResult};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};

/// Default number of autocorrelation lags.
pub const DEFAULT_ACF_LAGS: usize = 10;

/// Default histogram bin count.
pub const DEFAULT_HISTOGRAM_BINS: usize = 10;

/// Portmanteau or normality test result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TestResult {
    /// Test statistic
    pub statistic: f64,
    /// Upper-tail chi-squared p-value
    pub p_value: f64,
    /// Degrees of freedom
    pub df: usize,
}

impl From<LjungBoxResult> for TestResult {
    fn from(r: LjungBoxResult) -> Self {
        Self {
            statistic: r.statistic,
            p_value: r.p_value,
            df: r.df,
        }
    }
}

impl From<&JarqueBeraResult> for TestResult {
    fn from(r: &JarqueBeraResult) -> Self {
        Self {
            statistic: r.statistic,
            p_value: r.p_value,
            df: 2,
        }
    }
}

/// Equal-width histogram over the standardized residuals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    /// Bin edges, one more than `counts`
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

/// Summary of a residual series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidualDiagnostics {
    pub n: usize,
    pub mean: f64,
    /// Sample standard deviation
    pub std_dev: f64,
    pub skewness: f64,
    pub excess_kurtosis: f64,
    pub standardized: Vec<f64>,
    /// Autocorrelations for lags 1..=acf.len()
    pub acf: Vec<f64>,
    pub ljung_box: TestResult,
    pub jarque_bera: TestResult,
    /// (theoretical, sample) quantile pairs
    pub qq: Vec<(f64, f64)>,
    pub histogram: Histogram,
}

impl ResidualDiagnostics {
    /// Diagnose the residuals of a fitted model.
    pub fn from_model(model: &Sarima) -> Result<Self> {
        Self::compute(model.residuals(), DEFAULT_ACF_LAGS)
    }

    pub fn compute(residuals: &[f64], lags: usize) -> Result<Self> {
        let n = residuals.len();
        if n < 3 {
            return Err(ForecastError::InvalidInput(format!(
                "Residual diagnostics need at least 3 residuals, got {}",
                n
            )));
        }
        let lags = lags.min(n - 1);
        let nf = n as f64;

        let mean = residuals.iter().sum::<f64>() / nf;
        let ss = residuals.iter().map(|r| (r - mean).powi(2)).sum::<f64>();
        let std_dev = (ss / (nf - 1.0)).sqrt();
        let standardized: Vec<f64> = if std_dev > 0.0 {
            residuals.iter().map(|r| (r - mean) / std_dev).collect()
        } else {
            vec![0.0; n]
        };

        let acf = (1..=lags).map(|k| autocorrelation(residuals, k)).collect();
        let normality = jarque_bera(residuals);

        Ok(Self {
            n,
            mean,
            std_dev,
            skewness: normality.skewness,
            excess_kurtosis: normality.excess_kurtosis,
            qq: qq_pairs(&standardized)?,
            histogram: histogram(&standardized, DEFAULT_HISTOGRAM_BINS),
            standardized,
            acf,
            ljung_box: ljung_box(residuals, Some(lags), 0).into(),
            jarque_bera: TestResult::from(&normality),
        })
    }
}

/// Normal Q-Q pairs using plotting positions (i + 0.5) / n.
fn qq_pairs(standardized: &[f64]) -> Result<Vec<(f64, f64)>> {
    let normal = Normal::new(0.0, 1.0).map_err(|e| ForecastError::InvalidInput(e.to_string()))?;
    let mut sorted = standardized.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len() as f64;
    Ok(sorted
        .into_iter()
        .enumerate()
        .map(|(i, s)| (normal.inverse_cdf((i as f64 + 0.5) / n), s))
        .collect())
}

fn histogram(values: &[f64], bins: usize) -> Histogram {
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let (lo, hi) = if hi > lo { (lo, hi) } else { (lo - 0.5, lo + 0.5) };
    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
    let mut counts = vec![0; bins];
    for v in values {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    Histogram { edges, counts }
}
