use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::{ForecastError, Result};
use crate::kalman::KalmanFilterOutput;
use crate::state_space::StateSpace;

/// H-step ahead forecast result.
#[derive(Debug, Clone)]
pub struct ForecastResult {
    /// Forecast means E[y_{n+h}] for h = 1..steps.
    pub mean: Vec<f64>,
    /// Forecast variances Var[y_{n+h}].
    pub variance: Vec<f64>,
    pub ci_lower: Vec<f64>,
    pub ci_upper: Vec<f64>,
}

/// Residual diagnostics output.
#[derive(Debug, Clone)]
pub struct ResidualOutput {
    /// Raw innovations v_t.
    pub residuals: Vec<f64>,
    /// Standardized residuals v_t / sqrt(F_t * scale).
    pub standardized_residuals: Vec<f64>,
}

/// Two-sided normal quantile for a `1 - alpha` interval.
pub fn z_score(alpha: f64) -> Result<f64> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(ForecastError::InvalidConfig(format!(
            "alpha must lie in (0, 1), got {}",
            alpha
        )));
    }
    let normal = Normal::new(0.0, 1.0).map_err(|e| ForecastError::InvalidConfig(e.to_string()))?;
    Ok(normal.inverse_cdf(1.0 - alpha / 2.0))
}

/// Compute h-step ahead forecast from the final Kalman filter state.
///
/// Uses state-space forward propagation:
///   y_hat_h = Z' * a_h
///   F_h     = Z' * P_h * Z * scale
///   a_{h+1} = T * a_h
///   P_{h+1} = T * P_h * T' + R * R'
pub fn forecast(
    ss: &StateSpace,
    filter_output: &KalmanFilterOutput,
    steps: usize,
    alpha: f64,
) -> Result<ForecastResult> {
    if steps == 0 {
        return Err(ForecastError::InvalidHorizon(steps));
    }
    let z_alpha = z_score(alpha)?;

    let z = &ss.design;
    let t_mat = &ss.transition;
    let rr = ss.disturbance_cov();
    let scale = filter_output.scale;

    let mut a = filter_output.predicted_state.clone();
    let mut p = filter_output.predicted_cov.clone();

    let mut mean = Vec::with_capacity(steps);
    let mut variance = Vec::with_capacity(steps);
    let mut ci_lower = Vec::with_capacity(steps);
    let mut ci_upper = Vec::with_capacity(steps);

    for _ in 0..steps {
        let y_hat = z.dot(&a);
        let p_z = &p * z;
        let f_h = (z.dot(&p_z) * scale).max(0.0);
        let se = f_h.sqrt();

        mean.push(y_hat);
        variance.push(f_h);
        ci_lower.push(y_hat - z_alpha * se);
        ci_upper.push(y_hat + z_alpha * se);

        a = t_mat * &a;
        p = t_mat * &p * t_mat.transpose() + &rr;
    }

    Ok(ForecastResult {
        mean,
        variance,
        ci_lower,
        ci_upper,
    })
}

/// Compute residuals and standardized residuals from Kalman filter output.
pub fn compute_residuals(filter_output: &KalmanFilterOutput) -> ResidualOutput {
    let scale = filter_output.scale;
    let standardized = filter_output
        .innovations
        .iter()
        .zip(filter_output.innovation_vars.iter())
        .map(|(&v, &f)| {
            if f * scale > 0.0 {
                v / (f * scale).sqrt()
            } else {
                0.0
            }
        })
        .collect();

    ResidualOutput {
        residuals: filter_output.innovations.clone(),
        standardized_residuals: standardized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::initialization::KalmanInit;
    use crate::kalman::kalman_filter;
    use crate::params::SarimaParams;
    use crate::types::SarimaOrder;

    const PHI: f64 = 0.6527425084139002;

    fn ar1_data(n: usize) -> Vec<f64> {
        let mut y = vec![0.0; n];
        let mut state: u64 = 99;
        for t in 1..n {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let e = ((state >> 33) as f64 / (1u64 << 31) as f64) - 0.5;
            y[t] = PHI * y[t - 1] + e;
        }
        y
    }

    fn setup(order: SarimaOrder, params: SarimaParams, data: &[f64]) -> (StateSpace, KalmanFilterOutput) {
        let ss = StateSpace::new(&order, &params).unwrap();
        let init = KalmanInit::for_state_space(&ss);
        let fo = kalman_filter(data, &ss, &init).unwrap();
        (ss, fo)
    }

    fn ar1_setup(data: &[f64]) -> (StateSpace, KalmanFilterOutput) {
        let params = SarimaParams {
            ar: vec![PHI],
            ma: vec![],
            sar: vec![],
            sma: vec![],
        };
        setup(SarimaOrder::new(1, 0, 0, 0, 0, 0, 0), params, data)
    }

    #[test]
    fn test_z_score_standard() {
        assert!((z_score(0.05).unwrap() - 1.959964).abs() < 1e-5);
        assert!((z_score(0.10).unwrap() - 1.644854).abs() < 1e-5);
        assert!(z_score(0.0).is_err());
        assert!(z_score(1.5).is_err());
    }

    #[test]
    fn test_forecast_ar1_mean_decays() {
        let data = ar1_data(200);
        let (ss, fo) = ar1_setup(&data);
        let result = forecast(&ss, &fo, 5, 0.05).unwrap();
        assert_eq!(result.mean.len(), 5);

        let last = *data.last().unwrap();
        for (h, m) in result.mean.iter().enumerate() {
            let expected = PHI.powi(h as i32 + 1) * last;
            assert!((m - expected).abs() < 1e-6, "h={} mean={} expected={}", h, m, expected);
        }
    }

    #[test]
    fn test_forecast_variance_non_decreasing() {
        let data = ar1_data(200);
        let (ss, fo) = ar1_setup(&data);
        let result = forecast(&ss, &fo, 10, 0.05).unwrap();
        for i in 1..result.variance.len() {
            assert!(
                result.variance[i] >= result.variance[i - 1],
                "Variance should be non-decreasing: v[{}]={} < v[{}]={}",
                i,
                result.variance[i],
                i - 1,
                result.variance[i - 1]
            );
        }
    }

    #[test]
    fn test_forecast_ci_symmetric() {
        let data = ar1_data(200);
        let (ss, fo) = ar1_setup(&data);
        let result = forecast(&ss, &fo, 5, 0.05).unwrap();
        for i in 0..5 {
            let lower_dist = result.mean[i] - result.ci_lower[i];
            let upper_dist = result.ci_upper[i] - result.mean[i];
            assert!(lower_dist >= 0.0);
            assert!((lower_dist - upper_dist).abs() < 1e-10, "CI not symmetric at step {}", i);
        }
    }

    #[test]
    fn test_forecast_zero_steps_rejected() {
        let data = ar1_data(50);
        let (ss, fo) = ar1_setup(&data);
        let err = forecast(&ss, &fo, 0, 0.05).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidHorizon(0)));
    }

    #[test]
    fn test_random_walk_variance_grows_linearly() {
        // ARIMA(0,1,0): Var[y_{n+h}] = h * sigma2
        let data: Vec<f64> = ar1_data(100).iter().scan(0.0, |acc, e| {
            *acc += e;
            Some(*acc)
        }).collect();
        let params = SarimaParams { ar: vec![], ma: vec![], sar: vec![], sma: vec![] };
        let (ss, fo) = setup(SarimaOrder::new(0, 1, 0, 0, 0, 0, 0), params, &data);
        let result = forecast(&ss, &fo, 4, 0.05).unwrap();
        for (h, v) in result.variance.iter().enumerate() {
            let expected = (h + 1) as f64 * fo.scale;
            assert!((v - expected).abs() < 1e-6 * expected.max(1.0), "h={} var={}", h, v);
            assert!((result.mean[h] - data[data.len() - 1]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_residuals_length_and_scale() {
        let data = ar1_data(400);
        let (_, fo) = ar1_setup(&data);
        let result = compute_residuals(&fo);
        assert_eq!(result.residuals.len(), data.len());
        assert_eq!(result.standardized_residuals.len(), data.len());

        let std_res = &result.standardized_residuals[1..];
        let n = std_res.len() as f64;
        let mean = std_res.iter().sum::<f64>() / n;
        let var = std_res.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
        assert!(var > 0.5 && var < 2.0, "Standardized residual variance should be ~1, got {}", var);
    }
}
