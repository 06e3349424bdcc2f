//! End-to-end run: load, search, refit, diagnose, forecast, evaluate.

use crate::config::PipelineConfig;
use crate::diagnostics::ResidualDiagnostics;
use crate::error::{ForecastError, Result};
use crate::forecast::{ForecastResult, Forecaster};
use crate::loader::load_csv;
use crate::metrics::{evaluate, Evaluation};
use crate::report::write_all;
use crate::sarima::{FitOptions, Sarima};
use crate::search::{search, Estimator, SarimaEstimator, SearchOptions, SearchOutcome};
use crate::series::TimeSeries;

/// Everything produced by one run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Full loaded series
    pub series: TimeSeries,
    pub search: SearchOutcome,
    /// Winning order refitted on the training window
    pub model: Sarima,
    pub diagnostics: ResidualDiagnostics,
    pub one_step: ForecastResult,
    pub dynamic: ForecastResult,
    pub out_of_sample: ForecastResult,
    /// Out-of-sample forecast restricted to the test window
    pub test_forecast: ForecastResult,
    pub evaluation: Evaluation,
}

/// Run the pipeline on the configured CSV file.
pub fn run(config: &PipelineConfig) -> Result<PipelineReport> {
    config.validate()?;
    let series = load_csv(&config.data_path, &config.schema)?;
    let estimator = SarimaEstimator::new(config.fit);
    let report = run_on_series(series, config, &estimator)?;
    if let Some(dir) = &config.output_dir {
        write_all(dir, &report, &config.style)?;
    }
    Ok(report)
}

/// Run every stage after loading, scoring candidates with `estimator`.
pub fn run_on_series<E: Estimator>(
    series: TimeSeries,
    config: &PipelineConfig,
    estimator: &E,
) -> Result<PipelineReport> {
    config.validate()?;
    let train = series.between(config.train.start, config.train.end);
    if train.is_empty() {
        return Err(ForecastError::InvalidInput(format!(
            "No observations in the training window {}..{}",
            config.train.start, config.train.end
        )));
    }
    let test = series.between(config.test.start, config.test.end);
    tracing::info!(train = train.len(), test = test.len(), "split series");

    let candidates = config.grid.candidates();
    let options = SearchOptions {
        parallel: config.parallel,
        threads: config.threads,
        suppress_fit_warnings: config.suppress_fit_warnings,
    };
    let outcome = search(train.values(), &candidates, estimator, &options)?;

    let best = outcome.best_candidate();
    let fit = FitOptions {
        sample_start: Some(outcome.sample_start()),
        ..config.fit
    };
    let model = Sarima::fit_with(train.values(), best, &fit).map_err(|failure| {
        ForecastError::Fit {
            candidate: best.to_string(),
            failure,
        }
    })?;
    tracing::info!(
        candidate = %best,
        aic = model.aic(),
        bic = model.bic(),
        sigma2 = model.sigma2(),
        iterations = model.iterations(),
        "refitted selected order"
    );

    let diagnostics = ResidualDiagnostics::from_model(&model)?;

    let forecaster = Forecaster::new(&model, train, config.confidence_level)?;
    let one_step = forecaster.one_step(config.forecast_origin)?;
    let dynamic = forecaster.dynamic(config.forecast_origin)?;
    let out_of_sample = forecaster.out_of_sample(config.forecast_end)?;

    let test_forecast = out_of_sample.between(config.test.start, config.test.end);
    let evaluation = evaluate(test, &test_forecast)?;
    tracing::info!(
        mape = evaluation.mape,
        mae = evaluation.mae,
        rmse = evaluation.rmse,
        "evaluated forecast on test window"
    );

    Ok(PipelineReport {
        series,
        search: outcome,
        model,
        diagnostics,
        one_step,
        dynamic,
        out_of_sample,
        test_forecast,
        evaluation,
    })
}
