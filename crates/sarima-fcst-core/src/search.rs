//! Exhaustive order search by information criterion.
//!
//! Every candidate is fitted independently on the same training values and
//! scored over the same observations: the likelihood of each starts at the
//! largest lag start of the whole grid, so information criteria are
//! comparable. Fit failures are recorded and skipped; the search itself only
//! fails when no candidate produced a score. Selection is the minimum AIC with ties going to
//! the earliest candidate in enumeration order, so serial and parallel runs
//! pick the same model.

use crate::error::{FitFailure, FitFailureKind, ForecastError, Result};
use crate::order::OrderCandidate;
use crate::sarima::{FitOptions, Sarima};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Scores a single candidate on a training series.
pub trait Estimator: Sync {
    /// Score `candidate`, counting only observations from `sample_start` on.
    fn score(
        &self,
        values: &[f64],
        candidate: &OrderCandidate,
        sample_start: usize,
    ) -> std::result::Result<f64, FitFailure>;
}

/// Fits the CSS SARIMA model and scores it by AIC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SarimaEstimator {
    pub options: FitOptions,
}

impl SarimaEstimator {
    pub fn new(options: FitOptions) -> Self {
        Self { options }
    }
}

impl Estimator for SarimaEstimator {
    fn score(
        &self,
        values: &[f64],
        candidate: &OrderCandidate,
        sample_start: usize,
    ) -> std::result::Result<f64, FitFailure> {
        let options = FitOptions {
            sample_start: Some(sample_start),
            ..self.options
        };
        Sarima::fit_with(values, *candidate, &options).map(|m| m.aic())
    }
}

/// Search execution options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Fit candidates on a worker pool
    pub parallel: bool,
    /// Worker count when parallel; 0 lets rayon pick one per core
    pub threads: usize,
    /// Log candidate failures at debug instead of warn
    pub suppress_fit_warnings: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            threads: 0,
            suppress_fit_warnings: true,
        }
    }
}

/// Result of scoring one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    pub candidate: OrderCandidate,
    pub outcome: std::result::Result<f64, FitFailure>,
}

impl CandidateScore {
    pub fn aic(&self) -> Option<f64> {
        self.outcome.as_ref().ok().copied()
    }
}

/// Every evaluation plus the winner.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    evaluations: Vec<CandidateScore>,
    best_index: usize,
    sample_start: usize,
}

impl SearchOutcome {
    /// Evaluations in enumeration order.
    pub fn evaluations(&self) -> &[CandidateScore] {
        &self.evaluations
    }

    pub fn best(&self) -> &CandidateScore {
        &self.evaluations[self.best_index]
    }

    pub fn best_candidate(&self) -> OrderCandidate {
        self.best().candidate
    }

    pub fn best_aic(&self) -> f64 {
        self.best().aic().unwrap_or(f64::NAN)
    }

    /// First observation every candidate was scored on.
    pub fn sample_start(&self) -> usize {
        self.sample_start
    }

    pub fn attempted(&self) -> usize {
        self.evaluations.len()
    }

    pub fn succeeded(&self) -> usize {
        self.evaluations.iter().filter(|e| e.outcome.is_ok()).count()
    }

    /// Number of failures of the given kind.
    pub fn failures(&self, kind: FitFailureKind) -> usize {
        self.evaluations
            .iter()
            .filter(|e| matches!(&e.outcome, Err(f) if f.kind() == kind))
            .count()
    }
}

/// Score every candidate and select the minimum AIC.
pub fn search<E: Estimator>(
    values: &[f64],
    candidates: &[OrderCandidate],
    estimator: &E,
    options: &SearchOptions,
) -> Result<SearchOutcome> {
    let sample_start = shared_sample_start(candidates);
    let evaluate = |candidate: &OrderCandidate| -> CandidateScore {
        let outcome = estimator.score(values, candidate, sample_start).and_then(|aic| {
            if aic.is_finite() {
                Ok(aic)
            } else {
                Err(FitFailure::NumericalInstability(format!("AIC is {}", aic)))
            }
        });
        log_evaluation(candidate, &outcome, options.suppress_fit_warnings);
        CandidateScore {
            candidate: *candidate,
            outcome,
        }
    };

    let evaluations = if options.parallel {
        evaluate_parallel(candidates, options.threads, &evaluate)?
    } else {
        candidates.iter().map(evaluate).collect()
    };

    let best_index = select_best(&evaluations).ok_or(ForecastError::NoViableModel {
        attempted: evaluations.len(),
    })?;

    let outcome = SearchOutcome {
        evaluations,
        best_index,
        sample_start,
    };
    tracing::info!(
        attempted = outcome.attempted(),
        sample_start,
        succeeded = outcome.succeeded(),
        invalid_order = outcome.failures(FitFailureKind::InvalidOrder),
        convergence = outcome.failures(FitFailureKind::Convergence),
        best = %outcome.best_candidate(),
        aic = outcome.best_aic(),
        "order search finished"
    );
    Ok(outcome)
}

#[cfg(feature = "parallel")]
fn evaluate_parallel<F>(
    candidates: &[OrderCandidate],
    threads: usize,
    evaluate: &F,
) -> Result<Vec<CandidateScore>>
where
    F: Fn(&OrderCandidate) -> CandidateScore + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| ForecastError::InvalidInput(format!("Cannot start worker pool: {}", e)))?;
    // Indexed parallel iterators collect in input order.
    Ok(pool.install(|| candidates.par_iter().map(evaluate).collect()))
}

#[cfg(not(feature = "parallel"))]
fn evaluate_parallel<F>(
    candidates: &[OrderCandidate],
    _threads: usize,
    evaluate: &F,
) -> Result<Vec<CandidateScore>>
where
    F: Fn(&OrderCandidate) -> CandidateScore + Sync,
{
    tracing::warn!("built without the `parallel` feature; searching serially");
    Ok(candidates.iter().map(evaluate).collect())
}

/// Largest lag start over the grid.
pub fn shared_sample_start(candidates: &[OrderCandidate]) -> usize {
    candidates
        .iter()
        .map(OrderCandidate::conditioning_lags)
        .max()
        .unwrap_or(0)
}

/// Index of the minimum AIC; strict comparison keeps the first of equal scores.
fn select_best(evaluations: &[CandidateScore]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, e) in evaluations.iter().enumerate() {
        if let Some(aic) = e.aic() {
            match best {
                Some((_, b)) if aic >= b => {}
                _ => best = Some((i, aic)),
            }
        }
    }
    best.map(|(i, _)| i)
}

fn log_evaluation(
    candidate: &OrderCandidate,
    outcome: &std::result::Result<f64, FitFailure>,
    suppress_fit_warnings: bool,
) {
    match outcome {
        Ok(aic) => tracing::debug!(candidate = %candidate, aic, "candidate scored"),
        Err(failure) if suppress_fit_warnings => {
            tracing::debug!(candidate = %candidate, %failure, "candidate skipped")
        }
        Err(failure) => tracing::warn!(candidate = %candidate, %failure, "candidate skipped"),
    }
}
