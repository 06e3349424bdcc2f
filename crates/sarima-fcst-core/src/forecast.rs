//! Static, dynamic and out-of-sample forecasts from a fitted SARIMA model.

use crate::error::{ForecastError, Result};
use crate::sarima::{PathPrediction, Sarima};
use crate::series::{add_months, month_sequence, months_between, SeriesView};
use chrono::NaiveDate;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt;

/// How a forecast was conditioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMode {
    /// One step ahead, each step conditioned on observed history
    OneStep,
    /// Conditioned on the model's own earlier predictions
    Dynamic,
    /// Beyond the last observation
    OutOfSample,
}

impl ForecastMode {
    pub fn name(&self) -> &'static str {
        match self {
            ForecastMode::OneStep => "one_step",
            ForecastMode::Dynamic => "dynamic",
            ForecastMode::OutOfSample => "out_of_sample",
        }
    }
}

impl fmt::Display for ForecastMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One forecast step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    /// Predicted mean
    pub mean: f64,
    /// Lower confidence bound
    pub lower: f64,
    /// Upper confidence bound
    pub upper: f64,
}

/// An ordered forecast for one mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    pub mode: ForecastMode,
    /// First forecast date
    pub origin: NaiveDate,
    /// Confidence level of the bounds
    pub level: f64,
    pub points: Vec<ForecastPoint>,
}

impl ForecastResult {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn means(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.mean).collect()
    }

    /// Points with `start <= date <= end`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> ForecastResult {
        ForecastResult {
            points: self
                .points
                .iter()
                .filter(|p| p.date >= start && p.date <= end)
                .copied()
                .collect(),
            ..self.clone()
        }
    }
}

/// Two-sided normal quantile for a confidence level in (0, 1).
pub fn normal_quantile(level: f64) -> Result<f64> {
    if !(level > 0.0 && level < 1.0) {
        return Err(ForecastError::InvalidInput(format!(
            "Confidence level must be in (0, 1), got {}",
            level
        )));
    }
    let normal = Normal::new(0.0, 1.0).map_err(|e| ForecastError::InvalidInput(e.to_string()))?;
    Ok(normal.inverse_cdf((1.0 + level) / 2.0))
}

/// Produces forecasts for a model fitted on `train`.
#[derive(Debug, Clone)]
pub struct Forecaster<'a> {
    model: &'a Sarima,
    train: SeriesView<'a>,
    level: f64,
    z: f64,
}

impl<'a> Forecaster<'a> {
    pub fn new(model: &'a Sarima, train: SeriesView<'a>, level: f64) -> Result<Self> {
        if model.n_obs() != train.len() {
            return Err(ForecastError::InvalidInput(format!(
                "Model was fitted on {} observations but the training window has {}",
                model.n_obs(),
                train.len()
            )));
        }
        let z = normal_quantile(level)?;
        Ok(Self {
            model,
            train,
            level,
            z,
        })
    }

    /// One-step-ahead predictions from `origin` to the end of the training window.
    pub fn one_step(&self, origin: NaiveDate) -> Result<ForecastResult> {
        self.in_sample(origin, ForecastMode::OneStep)
    }

    /// Dynamic predictions from `origin` to the end of the training window.
    pub fn dynamic(&self, origin: NaiveDate) -> Result<ForecastResult> {
        self.in_sample(origin, ForecastMode::Dynamic)
    }

    /// Forecast every month after the training window up to and including `end`.
    pub fn out_of_sample(&self, end: NaiveDate) -> Result<ForecastResult> {
        let last = self
            .train
            .last_date()
            .ok_or_else(|| ForecastError::InvalidInput("Empty training window".to_string()))?;
        let horizon = months_between(last, end);
        if horizon <= 0 {
            return Err(ForecastError::InvalidInput(format!(
                "Forecast end {} must be after the last observation {}",
                end, last
            )));
        }
        let origin = add_months(last, 1)?;
        let dates = month_sequence(origin, horizon as usize)?;
        let path = self.model.forecast(dates.len());
        Ok(self.assemble(ForecastMode::OutOfSample, origin, &dates, path))
    }

    fn in_sample(&self, origin: NaiveDate, mode: ForecastMode) -> Result<ForecastResult> {
        let idx = self.train.position(origin).ok_or_else(|| {
            ForecastError::InvalidInput(format!(
                "Forecast origin {} is not a date in the training window",
                origin
            ))
        })?;
        let path = self
            .model
            .predict_in_sample(idx, mode == ForecastMode::Dynamic)
            .ok_or_else(|| {
                ForecastError::InvalidInput(format!(
                    "Forecast origin {} precedes the first {} observations consumed by lags",
                    origin,
                    self.model.start_index()
                ))
            })?;
        Ok(self.assemble(mode, origin, &self.train.dates()[idx..], path))
    }

    fn assemble(
        &self,
        mode: ForecastMode,
        origin: NaiveDate,
        dates: &[NaiveDate],
        path: PathPrediction,
    ) -> ForecastResult {
        let points: Vec<ForecastPoint> = dates
            .iter()
            .zip(path.mean.iter().zip(&path.std_error))
            .map(|(&date, (&mean, &se))| ForecastPoint {
                date,
                mean,
                lower: mean - self.z * se,
                upper: mean + self.z * se,
            })
            .collect();
        tracing::debug!(mode = %mode, steps = points.len(), "forecast produced");
        ForecastResult {
            mode,
            origin,
            level: self.level,
            points,
        }
    }
}
