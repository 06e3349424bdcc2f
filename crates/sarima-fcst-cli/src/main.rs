use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{Datelike, NaiveDate};
use clap::Parser;
use sarima_fcst_core::{parse_month, run, ForecastError, PipelineConfig, PipelineReport};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "sarima-fcst",
    about = "Grid-search a seasonal ARIMA model and forecast a monthly series"
)]
struct Cli {
    /// CSV file with a `Month` column and one value column.
    #[arg(long, default_value = "data/international-airline-passengers.csv")]
    data: PathBuf,
    /// First month of the training window (YYYY-MM or YYYY-MM-DD).
    #[arg(long, value_parser = month_arg, default_value = "1949-01")]
    train_start: NaiveDate,
    /// Last month of the training window.
    #[arg(long, value_parser = month_arg, default_value = "1959-12")]
    train_end: NaiveDate,
    /// First month of the held-out test window.
    #[arg(long, value_parser = month_arg, default_value = "1960-01")]
    test_start: NaiveDate,
    /// Last month of the held-out test window.
    #[arg(long, value_parser = month_arg, default_value = "1960-12")]
    test_end: NaiveDate,
    /// Origin of the one-step and dynamic in-sample predictions.
    #[arg(long, value_parser = month_arg, default_value = "1958-01")]
    origin: NaiveDate,
    /// Last month of the out-of-sample forecast (inclusive).
    #[arg(long, value_parser = month_arg, default_value = "1962-12")]
    forecast_end: NaiveDate,
    /// Directory for CSV and JSON report files.
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Fit search candidates on a worker pool.
    #[arg(long)]
    parallel: bool,
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn month_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_month(raw).ok_or_else(|| format!("expected YYYY-MM or YYYY-MM-DD, got '{}'", raw))
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(cli: &Cli) -> PipelineConfig {
    let config = PipelineConfig::default()
        .with_data_path(&cli.data)
        .with_train(cli.train_start, cli.train_end)
        .with_test(cli.test_start, cli.test_end)
        .with_forecast_origin(cli.origin)
        .with_forecast_end(cli.forecast_end)
        .with_parallel(cli.parallel);
    match &cli.output_dir {
        Some(dir) => config.with_output_dir(dir),
        None => config,
    }
}

fn print_examples(config: &PipelineConfig) {
    println!("Examples of parameter combinations for Seasonal ARIMA...");
    for c in config.grid.examples() {
        println!("SARIMAX: {} x {}", c.order, c.seasonal);
    }
}

fn print_report(report: &PipelineReport, config: &PipelineConfig) {
    for score in report.search.evaluations() {
        if let Some(aic) = score.aic() {
            println!("SARIMAX{}x{} - AIC:{}", score.candidate.order, score.candidate.seasonal, aic);
        }
    }
    let best = report.search.best_candidate();
    println!(
        "The smallest AIC is {} for model SARIMAX{}x{}",
        report.search.best_aic(),
        best.order,
        best.seasonal
    );

    let model = &report.model;
    println!("{:<12}{:>12}", "", "coef");
    let terms = [
        ("ar.L", 1, model.ar_coefficients()),
        ("ma.L", 1, model.ma_coefficients()),
        ("ar.S.L", best.seasonal.period, model.seasonal_ar_coefficients()),
        ("ma.S.L", best.seasonal.period, model.seasonal_ma_coefficients()),
    ];
    for (prefix, step, coefs) in terms {
        for (i, c) in coefs.iter().enumerate() {
            println!("{:<12}{:>12.4}", format!("{}{}", prefix, (i + 1) * step), c);
        }
    }
    println!("{:<12}{:>12.4}", "sigma2", model.sigma2());

    for point in &report.test_forecast.points {
        println!("{}    {}", point.date, point.mean);
    }
    println!(
        "The Mean Absolute Percentage Error for the forecast of year {} is {:.2}%",
        config.test.start.year(),
        report.evaluation.mape
    );
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = build_config(&cli);
    print_examples(&config);

    match run(&config) {
        Ok(report) => {
            print_report(&report, &config);
            ExitCode::SUCCESS
        }
        Err(err) => {
            report_error(&err);
            ExitCode::from(err.to_code() as u8)
        }
    }
}

fn report_error(err: &ForecastError) {
    tracing::error!(code = err.to_code(), "{}", err);
    eprintln!("error: {}", err);
}
