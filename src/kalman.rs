use nalgebra::{DMatrix, DVector};

use crate::error::{ForecastError, Result};
use crate::initialization::KalmanInit;
use crate::state_space::StateSpace;

/// Output of a full Kalman filter pass.
#[derive(Debug, Clone)]
pub struct KalmanFilterOutput {
    /// Concentrated log-likelihood.
    pub loglike: f64,
    /// Concentrated innovation variance sigma2_hat.
    pub scale: f64,
    /// One-step-ahead prediction errors v_t.
    pub innovations: Vec<f64>,
    /// Unscaled innovation variances F_t.
    pub innovation_vars: Vec<f64>,
    /// a_{n+1|n}: state prediction after the last observation.
    pub predicted_state: DVector<f64>,
    /// P_{n+1|n}, unscaled.
    pub predicted_cov: DMatrix<f64>,
    pub n_obs_effective: usize,
}

/// Run the Kalman filter and evaluate the concentrated log-likelihood.
///
///   v_t = y_t - Z' a_{t|t-1}                F_t = Z' P_{t|t-1} Z
///   a_{t|t} = a_{t|t-1} + K v_t             K   = P_{t|t-1} Z / F_t
///   P_{t|t} = (I - K Z') P (I - K Z')'      (Joseph form)
///   a_{t+1|t} = T a_{t|t}                   P_{t+1|t} = T P_{t|t} T' + R R'
///
/// With the scale concentrated out:
///   sigma2_hat = sum(v_t^2 / F_t) / n_eff
///   loglike    = -n_eff/2 (ln 2pi + ln sigma2_hat + 1) - 1/2 sum(ln F_t)
pub fn kalman_filter(endog: &[f64], ss: &StateSpace, init: &KalmanInit) -> Result<KalmanFilterOutput> {
    let n = endog.len();
    let k = ss.k_states;
    let burn = init.loglikelihood_burn;

    if n <= burn {
        return Err(ForecastError::InsufficientData {
            needed: burn + 1,
            got: n,
        });
    }
    let n_eff = n - burn;

    let mut a = init.initial_state.clone();
    let mut p = init.initial_state_cov.clone();

    let t_mat = &ss.transition;
    let z = &ss.design;
    let rr = ss.disturbance_cov();
    let eye = DMatrix::<f64>::identity(k, k);

    let mut sum_log_f = 0.0;
    let mut sum_v2_f = 0.0;
    let mut innovations = Vec::with_capacity(n);
    let mut innovation_vars = Vec::with_capacity(n);

    for (t, &y) in endog.iter().enumerate() {
        let v_t = y - z.dot(&a);
        let p_z = &p * z;
        let f_t = z.dot(&p_z);
        innovations.push(v_t);
        innovation_vars.push(f_t);

        if f_t > 0.0 {
            let gain = &p_z / f_t;
            let a_upd = &a + &gain * v_t;
            let i_kz = &eye - &gain * z.transpose();
            let p_upd = &i_kz * &p * i_kz.transpose();

            a = t_mat * a_upd;
            p = t_mat * p_upd * t_mat.transpose() + &rr;

            if t >= burn {
                sum_log_f += f_t.ln();
                sum_v2_f += v_t * v_t / f_t;
            }
        } else {
            // degenerate prediction variance: skip the update
            a = t_mat * &a;
            p = t_mat * &p * t_mat.transpose() + &rr;
        }
    }

    let n_eff_f = n_eff as f64;
    let scale = sum_v2_f / n_eff_f;
    let loglike = -0.5 * n_eff_f * (2.0 * std::f64::consts::PI).ln()
        - 0.5 * n_eff_f * scale.max(1e-300).ln()
        - 0.5 * n_eff_f
        - 0.5 * sum_log_f;

    Ok(KalmanFilterOutput {
        loglike,
        scale,
        innovations,
        innovation_vars,
        predicted_state: a,
        predicted_cov: p,
        n_obs_effective: n_eff,
    })
}
