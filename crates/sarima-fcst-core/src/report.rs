//! Headless output: CSV tables and JSON figure specifications.
//!
//! Files written to the output directory:
//!
//! | File | Content |
//! |------|---------|
//! | `data.csv` | Loaded series |
//! | `forecasts.csv` | All three forecasts with bounds |
//! | `search.csv` | Every candidate with its AIC or failure |
//! | `diagnostics.json` | Residual diagnostics of the refitted model |
//! | `plots.json` | Figure style and series for an external renderer |

use crate::config::PlotStyle;
use crate::diagnostics::ResidualDiagnostics;
use crate::error::{ForecastError, Result};
use crate::forecast::ForecastResult;
use crate::metrics::Evaluation;
use crate::pipeline::PipelineReport;
use chrono::NaiveDate;
use serde::Serialize;
use std::fs;
use std::path::Path;

fn output_error(path: &Path, err: impl ToString) -> ForecastError {
    ForecastError::Output(format!("{}: {}", path.display(), err.to_string()))
}

/// Write every report file into `dir`, creating it if needed.
pub fn write_all(dir: &Path, report: &PipelineReport, style: &PlotStyle) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| output_error(dir, e))?;
    write_series_csv(&dir.join("data.csv"), report.series.dates(), report.series.values())?;
    write_forecasts_csv(
        &dir.join("forecasts.csv"),
        &[&report.one_step, &report.dynamic, &report.out_of_sample],
    )?;
    write_search_csv(&dir.join("search.csv"), report)?;
    write_json(&dir.join("diagnostics.json"), &report.diagnostics)?;
    write_json(&dir.join("plots.json"), &PlotSpec::new(report, style))?;
    tracing::info!(dir = %dir.display(), "wrote report files");
    Ok(())
}

fn write_series_csv(path: &Path, dates: &[NaiveDate], values: &[f64]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| output_error(path, e))?;
    wtr.write_record(["Month", "Value"])
        .map_err(|e| output_error(path, e))?;
    for (date, value) in dates.iter().zip(values) {
        wtr.write_record([date.format("%Y-%m-%d").to_string(), value.to_string()])
            .map_err(|e| output_error(path, e))?;
    }
    wtr.flush().map_err(|e| output_error(path, e))
}

fn write_forecasts_csv(path: &Path, forecasts: &[&ForecastResult]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| output_error(path, e))?;
    wtr.write_record(["mode", "date", "mean", "lower", "upper"])
        .map_err(|e| output_error(path, e))?;
    for forecast in forecasts {
        for p in &forecast.points {
            wtr.write_record([
                forecast.mode.name().to_string(),
                p.date.format("%Y-%m-%d").to_string(),
                p.mean.to_string(),
                p.lower.to_string(),
                p.upper.to_string(),
            ])
            .map_err(|e| output_error(path, e))?;
        }
    }
    wtr.flush().map_err(|e| output_error(path, e))
}

fn write_search_csv(path: &Path, report: &PipelineReport) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| output_error(path, e))?;
    wtr.write_record(["order", "seasonal_order", "aic", "failure", "selected"])
        .map_err(|e| output_error(path, e))?;
    let best = report.search.best_candidate();
    for eval in report.search.evaluations() {
        let (aic, failure) = match &eval.outcome {
            Ok(aic) => (aic.to_string(), String::new()),
            Err(f) => (String::new(), f.to_string()),
        };
        wtr.write_record([
            eval.candidate.order.to_string(),
            eval.candidate.seasonal.to_string(),
            aic,
            failure,
            (eval.candidate == best).to_string(),
        ])
        .map_err(|e| output_error(path, e))?;
    }
    wtr.flush().map_err(|e| output_error(path, e))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| output_error(path, e))?;
    fs::write(path, json).map_err(|e| output_error(path, e))
}

/// A named line on a figure.
#[derive(Debug, Serialize)]
struct Line<'a> {
    label: &'a str,
    dates: &'a [NaiveDate],
    values: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct Figure<'a> {
    title: String,
    size: (f64, f64),
    lines: Vec<Line<'a>>,
    forecasts: Vec<&'a ForecastResult>,
}

#[derive(Debug, Serialize)]
struct PlotSpec<'a> {
    style: &'a PlotStyle,
    model: String,
    aic: f64,
    figures: Vec<Figure<'a>>,
    diagnostics: &'a ResidualDiagnostics,
    evaluation: &'a Evaluation,
}

impl<'a> PlotSpec<'a> {
    fn new(report: &'a PipelineReport, style: &'a PlotStyle) -> Self {
        let observed = || Line {
            label: "observed",
            dates: report.series.dates(),
            values: report.series.values().to_vec(),
        };
        let figures = vec![
            Figure {
                title: "Passengers".to_string(),
                size: style.figure_size,
                lines: vec![observed()],
                forecasts: Vec::new(),
            },
            Figure {
                title: "One-step ahead and dynamic forecasts".to_string(),
                size: style.figure_size,
                lines: vec![observed()],
                forecasts: vec![&report.one_step, &report.dynamic],
            },
            Figure {
                title: "Out-of-sample forecast".to_string(),
                size: style.forecast_size,
                lines: vec![observed()],
                forecasts: vec![&report.out_of_sample],
            },
        ];
        Self {
            style,
            model: report.model.candidate().to_string(),
            aic: report.model.aic(),
            figures,
            diagnostics: &report.diagnostics,
            evaluation: &report.evaluation,
        }
    }
}
