//! Starting values for maximum likelihood estimation.
//!
//! The series is differenced (regular then seasonal), AR terms come from
//! Burg's method with a Yule-Walker fallback, MA terms from the innovations
//! algorithm on the AR residuals, and seasonal terms from autocovariances at
//! multiples of the seasonal period. Anything that fails falls back to zero.

use crate::types::SarimaOrder;

/// Apply regular differencing `d` times.
pub fn difference(y: &[f64], d: usize) -> Vec<f64> {
    let mut out = y.to_vec();
    for _ in 0..d {
        out = out.windows(2).map(|w| w[1] - w[0]).collect();
    }
    out
}

/// Apply seasonal differencing `dd` times with period `s`.
pub fn seasonal_difference(y: &[f64], dd: usize, s: usize) -> Vec<f64> {
    if s == 0 {
        return y.to_vec();
    }
    let mut out = y.to_vec();
    for _ in 0..dd {
        if out.len() <= s {
            return vec![];
        }
        out = (s..out.len()).map(|i| out[i] - out[i - s]).collect();
    }
    out
}

fn autocovariance(y: &[f64], lag: usize) -> f64 {
    let n = y.len();
    if lag >= n {
        return 0.0;
    }
    let mean = y.iter().sum::<f64>() / n as f64;
    (0..n - lag)
        .map(|i| (y[i] - mean) * (y[i + lag] - mean))
        .sum::<f64>()
        / n as f64
}

/// Burg's maximum entropy AR estimate.
fn burg_ar(y: &[f64], p: usize) -> Option<Vec<f64>> {
    if p == 0 {
        return Some(vec![]);
    }
    let n = y.len();
    if n <= p {
        return None;
    }

    let mean = y.iter().sum::<f64>() / n as f64;
    let mut ef: Vec<f64> = y.iter().map(|&v| v - mean).collect();
    let mut eb = ef.clone();
    let mut a = vec![0.0; p];

    for k in 0..p {
        let mut num = 0.0;
        let mut den = 0.0;
        for t in (k + 1)..n {
            num += ef[t] * eb[t - 1];
            den += ef[t] * ef[t] + eb[t - 1] * eb[t - 1];
        }
        if den.abs() < 1e-15 {
            return None;
        }
        let refl = 2.0 * num / den;
        if refl.abs() >= 1.0 {
            return None;
        }

        let prev = a[..k].to_vec();
        a[k] = refl;
        for j in 0..k {
            a[j] = prev[j] - refl * prev[k - 1 - j];
        }

        // reverse order so eb[t-1] is read before it is overwritten
        for t in ((k + 1)..n).rev() {
            let ef_t = ef[t];
            ef[t] = ef_t - refl * eb[t - 1];
            eb[t] = eb[t - 1] - refl * ef_t;
        }
    }

    Some(a)
}

/// Levinson-Durbin solve of the Yule-Walker system for `gammas[0..=p]`.
fn levinson_durbin(gammas: &[f64], p: usize) -> Option<Vec<f64>> {
    if p == 0 {
        return Some(vec![]);
    }
    if gammas.len() <= p || gammas[0].abs() < 1e-15 {
        return None;
    }

    let mut phi = vec![0.0; p];
    let mut var = gammas[0];
    for k in 0..p {
        if var.abs() < 1e-15 {
            return None;
        }
        let num = gammas[k + 1] - (0..k).map(|j| phi[j] * gammas[k - j]).sum::<f64>();
        let lambda = num / var;

        let prev = phi.clone();
        phi[k] = lambda;
        for j in 0..k {
            phi[j] = prev[j] - lambda * prev[k - 1 - j];
        }
        var *= 1.0 - lambda * lambda;
    }
    Some(phi)
}

/// Innovations algorithm (Brockwell & Davis 5.2) on `gammas[0..=q]`.
///
/// The lags in `gammas` may be seasonal; coefficients are clamped to
/// (-0.99, 0.99).
fn innovations_ma(gammas: &[f64], q: usize) -> Vec<f64> {
    if q == 0 || gammas.len() <= q || gammas[0].abs() < 1e-15 {
        return vec![0.0; q];
    }

    let mut theta = vec![vec![0.0; q]; q + 1];
    let mut v = vec![0.0; q + 1];
    v[0] = gammas[0];

    for i in 1..=q {
        for k in 0..i {
            let mut sum = gammas[i - k];
            for j in 0..k {
                sum -= theta[k][k - 1 - j] * theta[i][i - 1 - j] * v[j];
            }
            theta[i][i - 1 - k] = if v[k].abs() > 1e-15 { sum / v[k] } else { 0.0 };
        }
        v[i] = gammas[0];
        for j in 0..i {
            v[i] -= theta[i][i - 1 - j].powi(2) * v[j];
        }
        v[i] = v[i].max(1e-15);
    }

    theta[q].iter().map(|c| c.clamp(-0.99, 0.99)).collect()
}

/// Residuals of `y` filtered through AR coefficients at lags `step, 2*step, ...`.
fn ar_residuals(y: &[f64], coeffs: &[f64], step: usize) -> Vec<f64> {
    if coeffs.is_empty() || step == 0 {
        return y.to_vec();
    }
    let start = coeffs.len() * step;
    if y.len() <= start {
        return vec![];
    }
    (start..y.len())
        .map(|t| {
            let pred: f64 = coeffs
                .iter()
                .enumerate()
                .map(|(j, c)| c * y[t - (j + 1) * step])
                .sum();
            y[t] - pred
        })
        .collect()
}

/// Starting coefficients in the flat layout `[ar(p) | ma(q) | sar(P) | sma(Q)]`.
pub fn compute_start_params(endog: &[f64], order: &SarimaOrder) -> Vec<f64> {
    let SarimaOrder { p, q, pp, qq, s, .. } = *order;

    let diffed = seasonal_difference(&difference(endog, order.d), order.dd, s);
    if diffed.len() < 3 {
        return vec![0.0; order.n_coeffs()];
    }

    let ar = burg_ar(&diffed, p)
        .or_else(|| {
            let gammas: Vec<f64> = (0..=p).map(|k| autocovariance(&diffed, k)).collect();
            levinson_durbin(&gammas, p)
        })
        .unwrap_or_else(|| vec![0.0; p]);

    let resid = ar_residuals(&diffed, &ar, 1);
    let ma_gammas: Vec<f64> = (0..=q).map(|k| autocovariance(&resid, k)).collect();
    let ma = innovations_ma(&ma_gammas, q);

    let sar = if pp > 0 && s > 0 && diffed.len() > pp * s {
        let gammas: Vec<f64> = (0..=pp).map(|k| autocovariance(&diffed, k * s)).collect();
        levinson_durbin(&gammas, pp).unwrap_or_else(|| vec![0.0; pp])
    } else {
        vec![0.0; pp]
    };

    let sma = if qq > 0 && s > 0 {
        let base = if pp > 0 {
            ar_residuals(&diffed, &sar, s)
        } else {
            resid
        };
        if base.len() > qq * s {
            let gammas: Vec<f64> = (0..=qq).map(|k| autocovariance(&base, k * s)).collect();
            innovations_ma(&gammas, qq)
        } else {
            vec![0.0; qq]
        }
    } else {
        vec![0.0; qq]
    };

    let mut params = Vec::with_capacity(order.n_coeffs());
    params.extend(ar);
    params.extend(ma);
    params.extend(sar);
    params.extend(sma);
    params
        .into_iter()
        .map(|c| if c.is_finite() { c } else { 0.0 })
        .collect()
}
