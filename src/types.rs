use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ForecastError;

/// Seasonal ARIMA order specification: (p, d, q)(P, D, Q, s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SarimaOrder {
    pub p: usize,  // AR order
    pub d: usize,  // differencing order
    pub q: usize,  // MA order
    pub pp: usize, // seasonal AR order (P)
    pub dd: usize, // seasonal differencing order (D)
    pub qq: usize, // seasonal MA order (Q)
    pub s: usize,  // seasonal period
}

impl SarimaOrder {
    pub fn new(p: usize, d: usize, q: usize, pp: usize, dd: usize, qq: usize, s: usize) -> Self {
        Self { p, d, q, pp, dd, qq, s }
    }

    /// Build from the `(p, d, q)` and `(P, D, Q, s)` tuples used in configuration.
    pub fn from_tuples(order: (usize, usize, usize), seasonal: (usize, usize, usize, usize)) -> Self {
        let (p, d, q) = order;
        let (pp, dd, qq, s) = seasonal;
        Self::new(p, d, q, pp, dd, qq, s)
    }

    pub fn has_seasonal_terms(&self) -> bool {
        self.pp > 0 || self.dd > 0 || self.qq > 0
    }

    /// Extended AR order: p + s*P
    pub fn k_ar(&self) -> usize {
        self.p + self.s * self.pp
    }

    /// Extended MA order: q + s*Q
    pub fn k_ma(&self) -> usize {
        self.q + self.s * self.qq
    }

    /// ARMA block dimension: max(k_ar, k_ma + 1)
    pub fn k_order(&self) -> usize {
        std::cmp::max(self.k_ar(), self.k_ma() + 1)
    }

    /// Differencing block dimension: d + s*D
    pub fn k_states_diff(&self) -> usize {
        self.d + self.s * self.dd
    }

    pub fn k_states(&self) -> usize {
        self.k_order() + self.k_states_diff()
    }

    /// Number of ARMA coefficients estimated by the optimizer.
    pub fn n_coeffs(&self) -> usize {
        self.p + self.q + self.pp + self.qq
    }

    /// Shortest series the model can be fitted to.
    ///
    /// The seasonal rule `s*(D+1) + max(p, q) + 1` is combined with the Kalman
    /// burn-in (`k_states` observations are discarded) and the parameter count.
    pub fn min_observations(&self) -> usize {
        let seasonal_rule = self.s * (self.dd + 1) + self.p.max(self.q) + 1;
        seasonal_rule
            .max(self.k_states() + 1)
            .max(self.n_coeffs() + 1)
    }

    /// Reject orders the state-space builder cannot represent.
    pub fn validate(&self) -> Result<(), ForecastError> {
        if self.dd > 1 {
            return Err(ForecastError::InvalidConfig(format!(
                "seasonal differencing D={} is not supported (D must be 0 or 1)",
                self.dd
            )));
        }
        if self.has_seasonal_terms() && self.s < 2 {
            return Err(ForecastError::InvalidConfig(format!(
                "seasonal terms require a seasonal period >= 2, got s={}",
                self.s
            )));
        }
        Ok(())
    }
}

impl fmt::Display for SarimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SARIMA({},{},{})({},{},{},{})",
            self.p, self.d, self.q, self.pp, self.dd, self.qq, self.s
        )
    }
}

/// Optimizer used for maximum likelihood estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    /// Bounded L-BFGS-B with Nelder-Mead fallback.
    #[default]
    Lbfgsb,
    /// Unbounded L-BFGS with More-Thuente line search.
    Lbfgs,
    NelderMead,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Lbfgsb => "lbfgsb",
            Method::Lbfgs => "lbfgs",
            Method::NelderMead => "nelder-mead",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lbfgsb" | "l-bfgs-b" => Ok(Method::Lbfgsb),
            "lbfgs" | "l-bfgs" => Ok(Method::Lbfgs),
            "nelder-mead" | "nm" => Ok(Method::NelderMead),
            other => Err(ForecastError::InvalidConfig(format!(
                "unknown method '{}': use 'lbfgsb', 'lbfgs' or 'nelder-mead'",
                other
            ))),
        }
    }
}

/// Model configuration handed to the fitter.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub order: SarimaOrder,
    /// Skip stationarity/invertibility enforcement on AR/MA coefficients.
    pub relax_stability_checks: bool,
    pub method: Method,
    pub max_iter: u64,
}

impl ModelConfig {
    pub fn new(order: SarimaOrder) -> Self {
        Self {
            order,
            ..Default::default()
        }
    }

    pub fn enforce_stationarity(&self) -> bool {
        !self.relax_stability_checks
    }

    pub fn enforce_invertibility(&self) -> bool {
        !self.relax_stability_checks
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            order: SarimaOrder::new(1, 1, 1, 1, 1, 1, 12),
            relax_stability_checks: true,
            method: Method::Lbfgsb,
            max_iter: 500,
        }
    }
}

/// Fit result returned by the optimizer.
#[derive(Debug, Clone)]
pub struct FitResult {
    /// Constrained coefficients, layout `[ar(p) | ma(q) | sar(P) | sma(Q)]`.
    pub params: Vec<f64>,
    pub loglike: f64,
    /// Concentrated innovation variance.
    pub scale: f64,
    pub n_obs: usize,
    pub n_params: usize,
    pub n_iter: u64,
    pub converged: bool,
    pub method: String,
    pub aic: f64,
    pub bic: f64,
}

impl FitResult {
    pub fn with_information_criteria(mut self) -> Self {
        let k = self.n_params as f64;
        let n = self.n_obs as f64;
        self.aic = -2.0 * self.loglike + 2.0 * k;
        self.bic = -2.0 * self.loglike + k * n.ln();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sarima_111_111_12_k_states() {
        // k_ar = 13, k_ma = 13, k_order = 14, k_diff = 13
        let order = SarimaOrder::new(1, 1, 1, 1, 1, 1, 12);
        assert_eq!(order.k_ar(), 13);
        assert_eq!(order.k_ma(), 13);
        assert_eq!(order.k_order(), 14);
        assert_eq!(order.k_states_diff(), 13);
        assert_eq!(order.k_states(), 27);
    }

    #[test]
    fn test_arima_110_k_states() {
        let order = SarimaOrder::new(1, 1, 0, 0, 0, 0, 0);
        assert_eq!(order.k_order(), 1);
        assert_eq!(order.k_states_diff(), 1);
        assert_eq!(order.k_states(), 2);
    }

    #[test]
    fn test_min_observations() {
        // seasonal rule: 12*2 + 1 + 1 = 26, burn-in rule: 27 + 1 = 28
        let order = SarimaOrder::new(1, 1, 1, 1, 1, 1, 12);
        assert_eq!(order.min_observations(), 28);

        let order = SarimaOrder::new(1, 0, 0, 0, 0, 0, 0);
        assert_eq!(order.min_observations(), 2);
    }

    #[test]
    fn test_validate_rejects_d2() {
        assert!(SarimaOrder::new(0, 0, 0, 0, 2, 0, 12).validate().is_err());
        assert!(SarimaOrder::new(1, 0, 0, 1, 0, 0, 1).validate().is_err());
        assert!(SarimaOrder::new(1, 1, 1, 1, 1, 1, 12).validate().is_ok());
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("lbfgsb".parse::<Method>().unwrap(), Method::Lbfgsb);
        assert_eq!("nm".parse::<Method>().unwrap(), Method::NelderMead);
        assert!("bfgs".parse::<Method>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = ModelConfig::default();
        assert_eq!(config.order, SarimaOrder::new(1, 1, 1, 1, 1, 1, 12));
        assert!(config.relax_stability_checks);
        assert!(!config.enforce_stationarity());
        assert_eq!(config.max_iter, 500);
    }

    #[test]
    fn test_information_criteria() {
        let r = FitResult {
            params: vec![0.5],
            loglike: -10.0,
            scale: 1.0,
            n_obs: 100,
            n_params: 2,
            n_iter: 5,
            converged: true,
            method: "lbfgsb".into(),
            aic: 0.0,
            bic: 0.0,
        }
        .with_information_criteria();
        assert!((r.aic - 24.0).abs() < 1e-12);
        assert!((r.bic - (20.0 + 2.0 * 100f64.ln())).abs() < 1e-12);
    }
}
