//! Pipeline configuration.
//!
//! Defaults reproduce the airline-passengers study: train on 1949-1959, hold
//! out 1960, forecast through 1962.

use crate::error::{ForecastError, Result};
use crate::loader::{CsvSchema, DEFAULT_FOOTER_ROWS};
use crate::order::OrderGrid;
use crate::sarima::FitOptions;
use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;

/// Inclusive date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Figure settings handed to an external renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotStyle {
    /// Default figure size in inches (width, height)
    pub figure_size: (f64, f64),
    /// Residual diagnostics figure size
    pub diagnostics_size: (f64, f64),
    /// Forecast overlay figure size
    pub forecast_size: (f64, f64),
    pub font_size: u32,
    pub style_theme: String,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            figure_size: (20.0, 10.0),
            diagnostics_size: (20.0, 14.0),
            forecast_size: (20.0, 16.0),
            font_size: 12,
            style_theme: "ggplot".to_string(),
        }
    }
}

/// Everything a pipeline run needs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data_path: PathBuf,
    pub schema: CsvSchema,
    /// Window used for order search and fitting
    pub train: DateRange,
    /// Held-out window for evaluation
    pub test: DateRange,
    /// First date of the in-sample static and dynamic predictions
    pub forecast_origin: NaiveDate,
    /// Last date of the out-of-sample forecast (inclusive)
    pub forecast_end: NaiveDate,
    pub grid: OrderGrid,
    pub fit: FitOptions,
    /// Confidence level of forecast bounds
    pub confidence_level: f64,
    pub style: PlotStyle,
    /// Log candidate fit failures at debug instead of warn
    pub suppress_fit_warnings: bool,
    /// Fit search candidates on a worker pool
    pub parallel: bool,
    /// Worker count when parallel; 0 for one per core
    pub threads: usize,
    /// Directory for headless CSV/JSON output; nothing is written when unset
    pub output_dir: Option<PathBuf>,
}

/// First day of a month; an out-of-range literal fails const evaluation.
const fn month_start(year: i32, month: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(year, month, 1) {
        Some(date) => date,
        None => panic!("month literal out of range"),
    }
}

const TRAIN_START: NaiveDate = month_start(1949, 1);
const TRAIN_END: NaiveDate = month_start(1959, 12);
const TEST_START: NaiveDate = month_start(1960, 1);
const TEST_END: NaiveDate = month_start(1960, 12);
const FORECAST_ORIGIN: NaiveDate = month_start(1958, 1);
const FORECAST_END: NaiveDate = month_start(1962, 12);

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/international-airline-passengers.csv"),
            schema: CsvSchema {
                date_column: "Month".to_string(),
                value_column: None,
                footer_rows: DEFAULT_FOOTER_ROWS,
            },
            train: DateRange::new(TRAIN_START, TRAIN_END),
            test: DateRange::new(TEST_START, TEST_END),
            forecast_origin: FORECAST_ORIGIN,
            forecast_end: FORECAST_END,
            grid: OrderGrid::default(),
            fit: FitOptions::default(),
            confidence_level: 0.95,
            style: PlotStyle::default(),
            suppress_fit_warnings: true,
            parallel: false,
            threads: 0,
            output_dir: None,
        }
    }
}

impl PipelineConfig {
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    pub fn with_train(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.train = DateRange::new(start, end);
        self
    }

    pub fn with_test(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.test = DateRange::new(start, end);
        self
    }

    pub fn with_forecast_origin(mut self, origin: NaiveDate) -> Self {
        self.forecast_origin = origin;
        self
    }

    pub fn with_forecast_end(mut self, end: NaiveDate) -> Self {
        self.forecast_end = end;
        self
    }

    pub fn with_grid(mut self, grid: OrderGrid) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_suppress_fit_warnings(mut self, suppress: bool) -> Self {
        self.suppress_fit_warnings = suppress;
        self
    }

    /// Check date ordering and numeric settings before any work is done.
    pub fn validate(&self) -> Result<()> {
        if self.train.start > self.train.end {
            return Err(ForecastError::InvalidInput(format!(
                "Training window starts {} after it ends {}",
                self.train.start, self.train.end
            )));
        }
        if self.test.start > self.test.end {
            return Err(ForecastError::InvalidInput(format!(
                "Test window starts {} after it ends {}",
                self.test.start, self.test.end
            )));
        }
        if !self.train.contains(self.forecast_origin) {
            return Err(ForecastError::InvalidInput(format!(
                "Forecast origin {} lies outside the training window {}..{}",
                self.forecast_origin, self.train.start, self.train.end
            )));
        }
        if self.forecast_end <= self.train.end {
            return Err(ForecastError::InvalidInput(format!(
                "Forecast end {} must follow the training window end {}",
                self.forecast_end, self.train.end
            )));
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(ForecastError::InvalidInput(format!(
                "Confidence level must be in (0, 1), got {}",
                self.confidence_level
            )));
        }
        if self.grid.is_empty() {
            return Err(ForecastError::InvalidInput("Order grid is empty".to_string()));
        }
        Ok(())
    }
}
