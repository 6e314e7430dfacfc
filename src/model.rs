//! Fitter and forecaster over [`TimeSeries`].

use serde::Serialize;
use tracing::debug;

use crate::error::{ForecastError, Result};
use crate::forecast::{compute_residuals, forecast, ResidualOutput};
use crate::initialization::KalmanInit;
use crate::kalman::{kalman_filter, KalmanFilterOutput};
use crate::optimizer;
use crate::params::SarimaParams;
use crate::series::{month_sequence, Observation, TimeSeries};
use crate::state_space::StateSpace;
use crate::types::{FitResult, ModelConfig, SarimaOrder};

/// Unfitted model: order, stability flag and optimizer choice.
#[derive(Debug, Clone, Default)]
pub struct SarimaModel {
    config: ModelConfig,
}

impl SarimaModel {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Estimate coefficients on `series`. The series is only read.
    pub fn fit(&self, series: &TimeSeries) -> Result<FittedModel> {
        let endog = series.values();
        let fit = optimizer::fit(&endog, &self.config)?;

        let params = SarimaParams::from_flat(&fit.params, &self.config.order)?;
        let state_space = StateSpace::new(&self.config.order, &params)?;
        let init = KalmanInit::for_state_space(&state_space);
        let filtered = kalman_filter(&endog, &state_space, &init)?;

        debug!(
            order = %self.config.order,
            method = %fit.method,
            iterations = fit.n_iter,
            loglike = fit.loglike,
            aic = fit.aic,
            "model fitted"
        );

        Ok(FittedModel {
            series: series.clone(),
            config: self.config.clone(),
            params,
            fit,
            state_space,
            filtered,
        })
    }
}

/// Model bound to the series it was fitted on. Immutable after `fit`.
#[derive(Debug, Clone)]
pub struct FittedModel {
    series: TimeSeries,
    config: ModelConfig,
    params: SarimaParams,
    fit: FitResult,
    state_space: StateSpace,
    filtered: KalmanFilterOutput,
}

/// Point forecasts with their variance and interval bounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub mean: TimeSeries,
    pub variance: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub alpha: f64,
}

impl Forecast {
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }
}

/// Serializable digest of a fitted model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub order: String,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub seasonal_ar: Vec<f64>,
    pub seasonal_ma: Vec<f64>,
    pub sigma2: f64,
    pub loglike: f64,
    pub aic: f64,
    pub bic: f64,
    pub n_obs: usize,
    pub iterations: u64,
    pub method: String,
}

impl FittedModel {
    pub fn order(&self) -> SarimaOrder {
        self.config.order
    }

    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    pub fn params(&self) -> &SarimaParams {
        &self.params
    }

    pub fn fit_result(&self) -> &FitResult {
        &self.fit
    }

    pub fn loglike(&self) -> f64 {
        self.fit.loglike
    }

    /// Estimated innovation variance.
    pub fn scale(&self) -> f64 {
        self.fit.scale
    }

    pub fn aic(&self) -> f64 {
        self.fit.aic
    }

    pub fn bic(&self) -> f64 {
        self.fit.bic
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            order: self.config.order.to_string(),
            ar: self.params.ar.clone(),
            ma: self.params.ma.clone(),
            seasonal_ar: self.params.sar.clone(),
            seasonal_ma: self.params.sma.clone(),
            sigma2: self.fit.scale,
            loglike: self.fit.loglike,
            aic: self.fit.aic,
            bic: self.fit.bic,
            n_obs: self.fit.n_obs,
            iterations: self.fit.n_iter,
            method: self.fit.method.clone(),
        }
    }

    /// Forecast `horizon` months past the end of the training series.
    pub fn forecast(&self, horizon: usize, alpha: f64) -> Result<Forecast> {
        if horizon < 1 {
            return Err(ForecastError::InvalidHorizon(horizon));
        }
        let start = self
            .series
            .next_date()
            .ok_or(ForecastError::EmptySeries("training"))??;

        let result = forecast(&self.state_space, &self.filtered, horizon, alpha)?;
        let dates = month_sequence(start, horizon)?;
        let mean = TimeSeries::new(
            dates
                .into_iter()
                .zip(result.mean)
                .map(|(date, value)| Observation::new(date, value))
                .collect(),
        )?;

        Ok(Forecast {
            mean,
            variance: result.variance,
            lower: result.ci_lower,
            upper: result.ci_upper,
            alpha,
        })
    }

    /// One-step-ahead innovations over the training series.
    pub fn residuals(&self) -> ResidualOutput {
        compute_residuals(&self.filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Method;
    use chrono::NaiveDate;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()
    }

    fn ar1_series(n: usize) -> TimeSeries {
        let mut y = vec![0.0; n];
        let mut state: u64 = 2024;
        for t in 1..n {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let e = ((state >> 33) as f64 / (1u64 << 31) as f64) - 0.5;
            y[t] = 0.5 * y[t - 1] + e;
        }
        TimeSeries::from_values(start(), y).unwrap()
    }

    fn ar1_model() -> SarimaModel {
        SarimaModel::new(ModelConfig {
            order: SarimaOrder::new(1, 0, 0, 0, 0, 0, 0),
            relax_stability_checks: true,
            method: Method::NelderMead,
            max_iter: 500,
        })
    }

    #[test]
    fn test_forecast_dates_follow_series() {
        let series = ar1_series(120);
        let fitted = ar1_model().fit(&series).unwrap();
        let fc = fitted.forecast(6, 0.05).unwrap();

        assert_eq!(fc.len(), 6);
        assert_eq!(fc.mean.first_date(), Some(NaiveDate::from_ymd_opt(2031, 1, 1).unwrap()));
        assert_eq!(fc.variance.len(), 6);
        for i in 0..6 {
            assert!(fc.lower[i] <= fc.mean.observations()[i].value);
            assert!(fc.upper[i] >= fc.mean.observations()[i].value);
        }
    }

    #[test]
    fn test_forecast_is_idempotent() {
        let fitted = ar1_model().fit(&ar1_series(120)).unwrap();
        let a = fitted.forecast(12, 0.05).unwrap();
        let b = fitted.forecast(12, 0.05).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_horizon_rejected() {
        let fitted = ar1_model().fit(&ar1_series(60)).unwrap();
        assert!(matches!(fitted.forecast(0, 0.05), Err(ForecastError::InvalidHorizon(0))));
    }

    #[test]
    fn test_fit_does_not_touch_series() {
        let series = ar1_series(60);
        let copy = series.clone();
        let fitted = ar1_model().fit(&series).unwrap();
        assert_eq!(series, copy);
        assert_eq!(fitted.series(), &copy);
    }

    #[test]
    fn test_insufficient_data() {
        let series = TimeSeries::from_values(start(), vec![1.0, 2.0, 3.0]).unwrap();
        let err = SarimaModel::default().fit(&series).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientData { got: 3, .. }));
    }

    #[test]
    fn test_summary_and_residuals() {
        let fitted = ar1_model().fit(&ar1_series(80)).unwrap();
        let summary = fitted.summary();
        assert_eq!(summary.ar.len(), 1);
        assert!(summary.ma.is_empty());
        assert_eq!(summary.n_obs, 80);
        assert!((summary.aic - fitted.aic()).abs() < 1e-12);
        assert_eq!(fitted.residuals().residuals.len(), 80);
    }
}
