//! Error types for the forecasting pipeline.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors raised while reading the input CSV.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Cannot read '{path}': {reason}")]
    Io { path: String, reason: String },

    #[error("Malformed CSV: {0}")]
    Csv(String),

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Invalid date '{value}' in row {row}: expected YYYY-MM or YYYY-MM-DD")]
    InvalidDate { row: usize, value: String },

    #[error("Invalid value '{value}' in row {row}")]
    InvalidValue { row: usize, value: String },

    #[error("Duplicate timestamp {0}")]
    DuplicateTimestamp(NaiveDate),

    #[error("No data rows left after dropping {footer_rows} footer rows")]
    Empty { footer_rows: usize },
}

impl From<csv::Error> for LoadError {
    fn from(err: csv::Error) -> Self {
        LoadError::Csv(err.to_string())
    }
}

/// Coarse classification of a failed candidate fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FitFailureKind {
    /// The order cannot be fitted on this data at all.
    InvalidOrder,
    /// The order is valid but estimation did not produce a usable optimum.
    Convergence,
}

/// A single candidate fit failure. Tolerated in bulk during the order search.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitFailure {
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("insufficient data: need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("optimizer did not converge after {iterations} iterations")]
    NonConvergence { iterations: usize },

    #[error("numerical instability: {0}")]
    NumericalInstability(String),
}

impl FitFailure {
    pub fn kind(&self) -> FitFailureKind {
        match self {
            FitFailure::InvalidOrder(_) | FitFailure::InsufficientData { .. } => {
                FitFailureKind::InvalidOrder
            }
            FitFailure::NonConvergence { .. } | FitFailure::NumericalInstability(_) => {
                FitFailureKind::Convergence
            }
        }
    }
}

/// Top-level pipeline errors.
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("No viable model: all {attempted} candidate orders failed to fit")]
    NoViableModel { attempted: usize },

    #[error("Fit of {candidate} failed: {failure}")]
    Fit {
        candidate: String,
        failure: FitFailure,
    },

    #[error("Alignment error: {0}")]
    Alignment(String),

    #[error("Division by zero in MAPE: actual value at index {index} is zero")]
    DivideByZeroInMape { index: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Output error: {0}")]
    Output(String),
}

impl ForecastError {
    /// Stable numeric code, used as the process exit status.
    pub fn to_code(&self) -> i32 {
        match self {
            ForecastError::Load(_) => 2,
            ForecastError::NoViableModel { .. } => 3,
            ForecastError::Fit { .. } => 4,
            ForecastError::Alignment(_) => 5,
            ForecastError::DivideByZeroInMape { .. } => 6,
            ForecastError::InvalidInput(_) => 7,
            ForecastError::Output(_) => 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_conversion() {
        assert_eq!(ForecastError::Load(LoadError::Empty { footer_rows: 3 }).to_code(), 2);
        assert_eq!(ForecastError::NoViableModel { attempted: 256 }.to_code(), 3);
        assert_eq!(
            ForecastError::Fit {
                candidate: "SARIMAX(1, 1, 1)x(0, 1, 1, 12)".into(),
                failure: FitFailure::NonConvergence { iterations: 10 },
            }
            .to_code(),
            4
        );
        assert_eq!(ForecastError::Alignment("test".into()).to_code(), 5);
        assert_eq!(ForecastError::DivideByZeroInMape { index: 0 }.to_code(), 6);
        assert_eq!(ForecastError::InvalidInput("test".into()).to_code(), 7);
        assert_eq!(ForecastError::Output("test".into()).to_code(), 8);
    }

    #[test]
    fn test_error_display() {
        let err = ForecastError::NoViableModel { attempted: 256 };
        assert_eq!(
            format!("{}", err),
            "No viable model: all 256 candidate orders failed to fit"
        );

        let err = ForecastError::Load(LoadError::MissingColumn("Month".into()));
        assert_eq!(format!("{}", err), "Load error: Missing column 'Month'");

        let err = ForecastError::DivideByZeroInMape { index: 2 };
        assert_eq!(
            format!("{}", err),
            "Division by zero in MAPE: actual value at index 2 is zero"
        );

        let err = FitFailure::InsufficientData { needed: 10, got: 3 };
        assert_eq!(
            format!("{}", err),
            "insufficient data: need at least 10 observations, got 3"
        );
    }

    #[test]
    fn test_fit_failure_kind() {
        assert_eq!(
            FitFailure::InvalidOrder("overlap".into()).kind(),
            FitFailureKind::InvalidOrder
        );
        assert_eq!(
            FitFailure::InsufficientData { needed: 5, got: 2 }.kind(),
            FitFailureKind::InvalidOrder
        );
        assert_eq!(
            FitFailure::NonConvergence { iterations: 5000 }.kind(),
            FitFailureKind::Convergence
        );
        assert_eq!(
            FitFailure::NumericalInstability("zero variance".into()).kind(),
            FitFailureKind::Convergence
        );
    }
}
