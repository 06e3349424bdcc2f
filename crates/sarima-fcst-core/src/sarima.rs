//! Seasonal ARIMA model estimated by conditional sum of squares.
//!
//! The model is
//!
//! ```text
//! φ(B) Φ(Bˢ) (1 − B)ᵈ (1 − Bˢ)ᴰ yₜ = θ(B) Θ(Bˢ) eₜ
//! ```
//!
//! without a trend term. The AR and differencing factors are multiplied into a
//! single lag polynomial acting on `y`, so residuals, in-sample predictions and
//! forecasts all run on the original scale through one recursion.
//!
//! Coefficients are unconstrained: stationarity and invertibility are not
//! enforced. Parameter search is delegated to the Nelder-Mead optimizer of
//! `anofox-forecast`, minimizing `ln(CSS)`.

use crate::error::FitFailure;
use crate::order::OrderCandidate;
use anofox_forecast::utils::optimization::{nelder_mead, NelderMeadConfig};
use std::f64::consts::PI;

/// Optimizer settings for a single fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    /// Maximum Nelder-Mead iterations
    pub max_iter: usize,
    /// Convergence tolerance on the objective spread
    pub tolerance: f64,
    /// First observation counted in the sum of squares and likelihood.
    /// Raised to the candidate's own lag start when smaller; `None` uses
    /// that lag start.
    pub sample_start: Option<usize>,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iter: 5000,
            tolerance: 1e-8,
            sample_start: None,
        }
    }
}

/// Combined lag polynomials for one parameter vector.
///
/// `ar[i]` is the coefficient on `y[t - 1 - i]`, `ma[j]` the coefficient on
/// `e[t - 1 - j]`.
#[derive(Debug, Clone, PartialEq)]
struct LagPolynomials {
    ar: Vec<f64>,
    ma: Vec<f64>,
}

/// Split a flat parameter vector into (φ, θ, Φ, Θ).
fn split_params<'a>(
    params: &'a [f64],
    candidate: &OrderCandidate,
) -> (&'a [f64], &'a [f64], &'a [f64], &'a [f64]) {
    let (p, q) = (candidate.order.p, candidate.order.q);
    let (sp, sq) = (candidate.seasonal.p, candidate.seasonal.q);
    let (ar, rest) = params.split_at(p);
    let (ma, rest) = rest.split_at(q);
    let (sar, sma) = rest.split_at(sp);
    debug_assert_eq!(sma.len(), sq);
    (ar, ma, sar, sma)
}

/// Multiply two polynomials given by ascending coefficients.
fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        if x == 0.0 {
            continue;
        }
        for (j, &y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// `1 + sign·c₁·B^stride + sign·c₂·B^(2·stride) + …`
fn lag_factor(coefs: &[f64], stride: usize, sign: f64) -> Vec<f64> {
    let mut out = vec![0.0; coefs.len() * stride + 1];
    out[0] = 1.0;
    for (k, &c) in coefs.iter().enumerate() {
        out[(k + 1) * stride] = sign * c;
    }
    out
}

impl LagPolynomials {
    fn build(params: &[f64], candidate: &OrderCandidate) -> Self {
        let (ar, ma, sar, sma) = split_params(params, candidate);
        let s = candidate.seasonal.period.max(1);

        let mut full_ar = poly_mul(&lag_factor(ar, 1, -1.0), &lag_factor(sar, s, -1.0));
        for _ in 0..candidate.order.d {
            full_ar = poly_mul(&full_ar, &[1.0, -1.0]);
        }
        for _ in 0..candidate.seasonal.d {
            full_ar = poly_mul(&full_ar, &lag_factor(&[1.0], s, -1.0));
        }
        let full_ma = poly_mul(&lag_factor(ma, 1, 1.0), &lag_factor(sma, s, 1.0));

        Self {
            ar: full_ar[1..].iter().map(|c| -c).collect(),
            ma: full_ma[1..].to_vec(),
        }
    }

    /// Conditional mean of `y[t]` given `y[..t]` and `e[..t]`.
    #[inline]
    fn predict_at(&self, t: usize, y: &[f64], e: &[f64]) -> f64 {
        let mut pred = 0.0;
        for (i, &phi) in self.ar.iter().enumerate() {
            if phi != 0.0 && t > i {
                pred += phi * y[t - 1 - i];
            }
        }
        for (j, &theta) in self.ma.iter().enumerate() {
            if theta != 0.0 && t > j {
                pred += theta * e[t - 1 - j];
            }
        }
        pred
    }

    /// Residuals from `start` onward; earlier entries are zero.
    fn residuals(&self, y: &[f64], start: usize) -> Vec<f64> {
        let mut e = vec![0.0; y.len()];
        for t in start..y.len() {
            e[t] = y[t] - self.predict_at(t, y, &e);
        }
        e
    }

    /// MA(∞) weights ψ₀..ψ_{h−1}.
    fn psi_weights(&self, h: usize) -> Vec<f64> {
        let mut psi = vec![0.0; h];
        if h == 0 {
            return psi;
        }
        psi[0] = 1.0;
        for j in 1..h {
            let mut v = self.ma.get(j - 1).copied().unwrap_or(0.0);
            for i in 1..=j.min(self.ar.len()) {
                v += self.ar[i - 1] * psi[j - i];
            }
            psi[j] = v;
        }
        psi
    }
}

fn sum_of_squares(e: &[f64], start: usize) -> f64 {
    e[start..].iter().map(|r| r * r).sum()
}

/// Point predictions with their standard errors.
#[derive(Debug, Clone, PartialEq)]
pub struct PathPrediction {
    pub mean: Vec<f64>,
    pub std_error: Vec<f64>,
}

/// A fitted SARIMA model.
#[derive(Debug, Clone)]
pub struct Sarima {
    candidate: OrderCandidate,
    params: Vec<f64>,
    polys: LagPolynomials,
    values: Vec<f64>,
    residuals: Vec<f64>,
    start: usize,
    sample_start: usize,
    sigma2: f64,
    log_likelihood: f64,
    aic: f64,
    bic: f64,
    iterations: usize,
}

impl Sarima {
    /// Fit with default optimizer settings.
    pub fn fit(values: &[f64], candidate: OrderCandidate) -> Result<Self, FitFailure> {
        Self::fit_with(values, candidate, &FitOptions::default())
    }

    /// Fit `candidate` to `values`.
    pub fn fit_with(
        values: &[f64],
        candidate: OrderCandidate,
        options: &FitOptions,
    ) -> Result<Self, FitFailure> {
        validate_order(&candidate)?;

        let start = candidate.conditioning_lags();
        let sample_start = options.sample_start.map_or(start, |s| s.max(start));
        let n_coef = candidate.num_coefficients();
        let needed = sample_start + n_coef + 2;
        if values.len() < needed {
            return Err(FitFailure::InsufficientData {
                needed,
                got: values.len(),
            });
        }

        let objective = |params: &[f64]| -> f64 {
            let polys = LagPolynomials::build(params, &candidate);
            let css = sum_of_squares(&polys.residuals(values, start), sample_start);
            if css.is_finite() && css > 0.0 {
                css.ln()
            } else {
                f64::MAX
            }
        };

        let (params, iterations) = if n_coef == 0 {
            (Vec::new(), 0)
        } else {
            let initial = initial_params(&candidate);
            let config = NelderMeadConfig {
                max_iter: options.max_iter,
                tolerance: options.tolerance,
                ..Default::default()
            };
            let result = nelder_mead(objective, &initial, None, config);
            if !result.converged {
                return Err(FitFailure::NonConvergence {
                    iterations: result.iterations,
                });
            }
            (result.optimal_point, result.iterations)
        };

        let polys = LagPolynomials::build(&params, &candidate);
        let residuals = polys.residuals(values, start);
        let n_eff = (values.len() - sample_start) as f64;
        let sigma2 = sum_of_squares(&residuals, sample_start) / n_eff;
        if !sigma2.is_finite() || sigma2 <= 0.0 {
            return Err(FitFailure::NumericalInstability(format!(
                "residual variance is {}",
                sigma2
            )));
        }

        let k = (n_coef + 1) as f64;
        let log_likelihood = -0.5 * n_eff * (1.0 + (2.0 * PI).ln() + sigma2.ln());
        let aic = -2.0 * log_likelihood + 2.0 * k;
        let bic = -2.0 * log_likelihood + k * n_eff.ln();

        Ok(Self {
            candidate,
            params,
            polys,
            values: values.to_vec(),
            residuals,
            start,
            sample_start,
            sigma2,
            log_likelihood,
            aic,
            bic,
            iterations,
        })
    }

    pub fn candidate(&self) -> OrderCandidate {
        self.candidate
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        split_params(&self.params, &self.candidate).0
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        split_params(&self.params, &self.candidate).1
    }

    pub fn seasonal_ar_coefficients(&self) -> &[f64] {
        split_params(&self.params, &self.candidate).2
    }

    pub fn seasonal_ma_coefficients(&self) -> &[f64] {
        split_params(&self.params, &self.candidate).3
    }

    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    pub fn aic(&self) -> f64 {
        self.aic
    }

    pub fn bic(&self) -> f64 {
        self.bic
    }

    /// Optimizer iterations used by the fit.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Number of observations the model was fitted on.
    pub fn n_obs(&self) -> usize {
        self.values.len()
    }

    /// First index with a residual (all lags observed).
    pub fn start_index(&self) -> usize {
        self.start
    }

    /// First observation entering the likelihood and information criteria.
    pub fn sample_start(&self) -> usize {
        self.sample_start
    }

    /// Residuals from [`Self::start_index`] onward.
    pub fn residuals(&self) -> &[f64] {
        &self.residuals[self.start..]
    }

    /// In-sample one-step fitted values from [`Self::start_index`] onward.
    pub fn fitted_values(&self) -> Vec<f64> {
        self.values[self.start..]
            .iter()
            .zip(self.residuals())
            .map(|(y, e)| y - e)
            .collect()
    }

    /// Predictions for in-sample indices `origin..n_obs`.
    ///
    /// Static predictions condition every step on observed history. Dynamic
    /// predictions feed their own output back as history from `origin` on and
    /// set later innovations to zero. The first step is identical in both modes.
    pub fn predict_in_sample(&self, origin: usize, dynamic: bool) -> Option<PathPrediction> {
        if origin < self.start || origin >= self.values.len() {
            return None;
        }
        Some(self.predict_path(origin, self.values.len(), dynamic))
    }

    /// Out-of-sample forecast for `horizon` steps past the last observation.
    pub fn forecast(&self, horizon: usize) -> PathPrediction {
        let n = self.values.len();
        self.predict_path(n, n + horizon, true)
    }

    fn predict_path(&self, origin: usize, end: usize, dynamic: bool) -> PathPrediction {
        let n = self.values.len();
        let mut y: Vec<f64> = self.values[..origin].to_vec();
        let mut e: Vec<f64> = self.residuals[..origin].to_vec();
        let mut mean = Vec::with_capacity(end - origin);

        for t in origin..end {
            let pred = self.polys.predict_at(t, &y, &e);
            mean.push(pred);
            if dynamic || t >= n {
                y.push(pred);
                e.push(0.0);
            } else {
                y.push(self.values[t]);
                e.push(self.residuals[t]);
            }
        }

        let sigma = self.sigma2.sqrt();
        let std_error = if dynamic {
            let psi = self.polys.psi_weights(end - origin);
            let mut acc = 0.0;
            psi.iter()
                .map(|w| {
                    acc += w * w;
                    sigma * acc.sqrt()
                })
                .collect()
        } else {
            vec![sigma; end - origin]
        };

        PathPrediction { mean, std_error }
    }
}

fn validate_order(candidate: &OrderCandidate) -> Result<(), FitFailure> {
    let seasonal = &candidate.seasonal;
    if seasonal.is_active() && seasonal.period < 2 {
        return Err(FitFailure::InvalidOrder(format!(
            "seasonal terms require a period of at least 2, got {}",
            seasonal.period
        )));
    }
    if seasonal.p > 0 && candidate.order.p >= seasonal.period {
        return Err(FitFailure::InvalidOrder(format!(
            "autoregressive lags overlap: p = {} reaches seasonal period {}",
            candidate.order.p, seasonal.period
        )));
    }
    if seasonal.q > 0 && candidate.order.q >= seasonal.period {
        return Err(FitFailure::InvalidOrder(format!(
            "moving-average lags overlap: q = {} reaches seasonal period {}",
            candidate.order.q, seasonal.period
        )));
    }
    Ok(())
}

fn initial_params(candidate: &OrderCandidate) -> Vec<f64> {
    let decay = |n: usize| (0..n).map(|i| 0.1 / (i + 1) as f64);
    decay(candidate.order.p)
        .chain(decay(candidate.order.q))
        .chain(decay(candidate.seasonal.p))
        .chain(decay(candidate.seasonal.q))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{Order, SeasonalOrder};
    use approx::assert_relative_eq;

    fn candidate(p: usize, d: usize, q: usize, sp: usize, sd: usize, sq: usize) -> OrderCandidate {
        OrderCandidate::new(Order::new(p, d, q), SeasonalOrder::new(sp, sd, sq, 12))
    }

    /// Trend + period-12 season + deterministic pseudo-noise.
    fn seasonal_data(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let trend = 100.0 + 1.5 * i as f64;
                let season = 20.0 * (2.0 * PI * i as f64 / 12.0).sin();
                let noise = ((i * 7 + 3) % 11) as f64 - 5.0;
                trend + season + noise
            })
            .collect()
    }

    #[test]
    fn test_poly_mul() {
        assert_eq!(poly_mul(&[1.0, -0.5], &[1.0, -1.0]), vec![1.0, -1.5, 0.5]);
    }

    #[test]
    fn test_lag_polynomials_with_differencing() {
        // (1 - 0.5B)(1 - B)(1 - B^12)
        //   = 1 - 1.5B + 0.5B^2 - B^12 + 1.5B^13 - 0.5B^14
        let c = candidate(1, 1, 0, 0, 1, 0);
        let polys = LagPolynomials::build(&[0.5], &c);
        assert_eq!(polys.ar.len(), 14);
        assert_relative_eq!(polys.ar[0], 1.5);
        assert_relative_eq!(polys.ar[1], -0.5);
        assert_relative_eq!(polys.ar[11], 1.0);
        assert_relative_eq!(polys.ar[12], -1.5);
        assert_relative_eq!(polys.ar[13], 0.5);
        assert!(polys.ma.is_empty());
    }

    #[test]
    fn test_lag_polynomials_seasonal_ma() {
        // (1 + 0.4B)(1 + 0.3B^12)
        let c = candidate(0, 0, 1, 0, 0, 1);
        let polys = LagPolynomials::build(&[0.4, 0.3], &c);
        assert_eq!(polys.ma.len(), 13);
        assert_relative_eq!(polys.ma[0], 0.4);
        assert_relative_eq!(polys.ma[11], 0.3);
        assert_relative_eq!(polys.ma[12], 0.12);
    }

    #[test]
    fn test_psi_weights_random_walk() {
        let c = candidate(0, 1, 0, 0, 0, 0);
        let polys = LagPolynomials::build(&[], &c);
        assert_eq!(polys.psi_weights(4), vec![1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_white_noise_model_has_closed_form_fit() {
        let values = vec![1.0, -1.0, 2.0, -2.0, 1.0, -1.0];
        let model = Sarima::fit(&values, candidate(0, 0, 0, 0, 0, 0)).unwrap();
        let expected_sigma2 = values.iter().map(|v| v * v).sum::<f64>() / 6.0;
        assert_relative_eq!(model.sigma2(), expected_sigma2, epsilon = 1e-12);
        assert_eq!(model.iterations(), 0);
        let ll = -3.0 * (1.0 + (2.0 * PI).ln() + expected_sigma2.ln());
        assert_relative_eq!(model.aic(), -2.0 * ll + 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_fit_seasonal_model() {
        let values = seasonal_data(120);
        let c = candidate(1, 1, 0, 0, 1, 1);
        let model = Sarima::fit(&values, c).unwrap();
        assert_eq!(model.candidate(), c);
        assert_eq!(model.ar_coefficients().len(), 1);
        assert!(model.ma_coefficients().is_empty());
        assert!(model.seasonal_ar_coefficients().is_empty());
        assert_eq!(model.seasonal_ma_coefficients().len(), 1);
        assert_eq!(model.start_index(), 14);
        assert_eq!(model.residuals().len(), 120 - 14);
        assert!(model.aic().is_finite());
        assert!(model.bic() > model.aic());
    }

    #[test]
    fn test_non_seasonal_order_is_used() {
        let values = seasonal_data(120);
        let model = Sarima::fit(&values, candidate(2, 1, 1, 0, 1, 0)).unwrap();
        assert_eq!(model.ar_coefficients().len(), 2);
        assert_eq!(model.ma_coefficients().len(), 1);
        assert!(model.ar_coefficients().iter().any(|c| *c != 0.0));
    }

    #[test]
    fn test_fit_is_deterministic() {
        let values = seasonal_data(96);
        let c = candidate(1, 0, 1, 1, 1, 0);
        let a = Sarima::fit(&values, c).unwrap();
        let b = Sarima::fit(&values, c).unwrap();
        assert_eq!(a.aic().to_bits(), b.aic().to_bits());
    }

    #[test]
    fn test_shared_sample_start_scores_same_observations() {
        let values = seasonal_data(132);
        let options = FitOptions {
            sample_start: Some(36),
            ..Default::default()
        };
        let plain = Sarima::fit_with(&values, candidate(0, 0, 0, 0, 0, 0), &options).unwrap();
        let seasonal = Sarima::fit_with(&values, candidate(0, 0, 0, 1, 0, 0), &options).unwrap();
        assert_eq!(plain.sample_start(), 36);
        assert_eq!(seasonal.sample_start(), 36);
        assert_eq!(plain.start_index(), 0);
        assert_eq!(seasonal.start_index(), 12);

        let expected = values[36..].iter().map(|v| v * v).sum::<f64>() / 96.0;
        assert_relative_eq!(plain.sigma2(), expected, epsilon = 1e-9);
        let ll = -48.0 * (1.0 + (2.0 * PI).ln() + expected.ln());
        assert_relative_eq!(plain.aic(), -2.0 * ll + 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sample_start_never_precedes_lag_start() {
        let values = seasonal_data(100);
        let options = FitOptions {
            sample_start: Some(3),
            ..Default::default()
        };
        let model = Sarima::fit_with(&values, candidate(1, 1, 0, 0, 1, 0), &options).unwrap();
        assert_eq!(model.start_index(), 14);
        assert_eq!(model.sample_start(), 14);
    }

    #[test]
    fn test_insufficient_data() {
        let values = seasonal_data(20);
        let err = Sarima::fit(&values, candidate(1, 1, 1, 1, 1, 1)).unwrap_err();
        assert!(matches!(err, FitFailure::InsufficientData { .. }));
    }

    #[test]
    fn test_overlapping_lags_rejected() {
        let c = OrderCandidate::new(Order::new(4, 0, 0), SeasonalOrder::new(1, 0, 0, 4));
        let err = Sarima::fit(&seasonal_data(100), c).unwrap_err();
        assert!(matches!(err, FitFailure::InvalidOrder(_)));
    }

    #[test]
    fn test_seasonal_terms_need_period() {
        let c = OrderCandidate::new(Order::new(1, 0, 0), SeasonalOrder::new(1, 0, 0, 1));
        let err = Sarima::fit(&seasonal_data(100), c).unwrap_err();
        assert!(matches!(err, FitFailure::InvalidOrder(_)));
    }

    #[test]
    fn test_constant_series_is_numerically_unstable() {
        let values = vec![5.0; 40];
        let err = Sarima::fit(&values, candidate(0, 1, 0, 0, 0, 0)).unwrap_err();
        assert!(matches!(err, FitFailure::NumericalInstability(_)));
    }

    #[test]
    fn test_fitted_plus_residuals_reconstructs_data() {
        let values = seasonal_data(80);
        let model = Sarima::fit(&values, candidate(1, 1, 0, 0, 1, 0)).unwrap();
        let fitted = model.fitted_values();
        for (i, (f, e)) in fitted.iter().zip(model.residuals()).enumerate() {
            assert_relative_eq!(f + e, values[model.start_index() + i], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_static_and_dynamic_share_first_step() {
        let values = seasonal_data(120);
        let model = Sarima::fit(&values, candidate(1, 1, 0, 0, 1, 0)).unwrap();
        let origin = 96;
        let st = model.predict_in_sample(origin, false).unwrap();
        let dy = model.predict_in_sample(origin, true).unwrap();
        assert_eq!(st.mean.len(), 24);
        assert_eq!(st.mean[0].to_bits(), dy.mean[0].to_bits());
        assert!(st.mean[1..]
            .iter()
            .zip(&dy.mean[1..])
            .any(|(a, b)| (a - b).abs() > 1e-9));
    }

    #[test]
    fn test_static_prediction_matches_fitted_values() {
        let values = seasonal_data(100);
        let model = Sarima::fit(&values, candidate(1, 0, 0, 0, 1, 0)).unwrap();
        let origin = 60;
        let st = model.predict_in_sample(origin, false).unwrap();
        let fitted = model.fitted_values();
        for (i, p) in st.mean.iter().enumerate() {
            assert_relative_eq!(*p, fitted[origin - model.start_index() + i], epsilon = 1e-9);
        }
        assert!(st.std_error.iter().all(|s| *s == model.sigma2().sqrt()));
    }

    #[test]
    fn test_origin_before_start_is_rejected() {
        let values = seasonal_data(100);
        let model = Sarima::fit(&values, candidate(0, 1, 0, 0, 1, 0)).unwrap();
        assert!(model.predict_in_sample(5, false).is_none());
        assert!(model.predict_in_sample(100, false).is_none());
    }

    #[test]
    fn test_forecast_intervals_widen() {
        let values = seasonal_data(120);
        let model = Sarima::fit(&values, candidate(1, 1, 0, 0, 1, 0)).unwrap();
        let fc = model.forecast(24);
        assert_eq!(fc.mean.len(), 24);
        assert!(fc.mean.iter().all(|v| v.is_finite()));
        assert_relative_eq!(fc.std_error[0], model.sigma2().sqrt());
        assert!(fc.std_error.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_forecast_random_walk_is_flat() {
        let values: Vec<f64> = (0..30).map(|i| ((i * 5) % 7) as f64 + 10.0).collect();
        let model = Sarima::fit(&values, candidate(0, 1, 0, 0, 0, 0)).unwrap();
        let fc = model.forecast(3);
        let last = *values.last().unwrap();
        assert_eq!(fc.mean, vec![last, last, last]);
        let s = model.sigma2().sqrt();
        assert_relative_eq!(fc.std_error[2], s * 3f64.sqrt(), epsilon = 1e-12);
    }
}
