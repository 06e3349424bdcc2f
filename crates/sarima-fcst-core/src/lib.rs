//! Core library for SARIMA grid-search forecasting of monthly seasonal series.
//!
//! The pipeline loads a CSV series, scores every candidate order on the
//! training window by AIC, refits the winner, and produces one-step, dynamic
//! and out-of-sample forecasts evaluated against a held-out window.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod forecast;
pub mod loader;
pub mod metrics;
pub mod order;
pub mod pipeline;
pub mod report;
pub mod sarima;
pub mod search;
pub mod series;

// Re-exports for convenience
pub use config::{DateRange, PipelineConfig, PlotStyle};
pub use diagnostics::{Histogram, ResidualDiagnostics, TestResult};
pub use error::{FitFailure, FitFailureKind, ForecastError, LoadError, Result};
pub use forecast::{normal_quantile, ForecastMode, ForecastPoint, ForecastResult, Forecaster};
pub use loader::{load_csv, load_from_reader, parse_month, CsvSchema};
pub use metrics::{align, coverage, evaluate, mae, mape, mse, rmse, Evaluation};
pub use order::{Order, OrderCandidate, OrderGrid, OrderRanges, SeasonalOrder};
pub use pipeline::{run, run_on_series, PipelineReport};
pub use sarima::{FitOptions, PathPrediction, Sarima};
pub use search::{
    search, CandidateScore, Estimator, SarimaEstimator, SearchOptions, SearchOutcome,
};
pub use series::{add_months, month_sequence, months_between, SeriesView, TimeSeries};
