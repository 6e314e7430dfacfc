//! Lag polynomials of the multiplicative seasonal ARMA model.

use crate::params::SarimaParams;
use crate::types::SarimaOrder;

/// Polynomial product: c[k] = sum_i a[i]*b[k-i].
pub fn polymul(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return vec![];
    }
    let mut r = vec![0.0; a.len() + b.len() - 1];
    for (i, &ai) in a.iter().enumerate() {
        for (j, &bj) in b.iter().enumerate() {
            r[i + j] += ai * bj;
        }
    }
    r
}

/// Lag polynomial `1 + sign*c_1*L^step + sign*c_2*L^(2*step) + ...`.
fn lag_poly(coeffs: &[f64], step: usize, sign: f64) -> Vec<f64> {
    if coeffs.is_empty() || step == 0 {
        return vec![1.0];
    }
    let mut poly = vec![0.0; coeffs.len() * step + 1];
    poly[0] = 1.0;
    for (i, &c) in coeffs.iter().enumerate() {
        poly[(i + 1) * step] = sign * c;
    }
    poly
}

/// AR polynomial `1 - phi_1 L - ... - phi_p L^p`.
pub fn ar_poly(coeffs: &[f64]) -> Vec<f64> {
    lag_poly(coeffs, 1, -1.0)
}

/// Seasonal AR polynomial `1 - Phi_1 L^s - ... - Phi_P L^(Ps)`.
pub fn seasonal_ar_poly(coeffs: &[f64], s: usize) -> Vec<f64> {
    lag_poly(coeffs, s, -1.0)
}

/// MA polynomial `1 + theta_1 L + ... + theta_q L^q`.
pub fn ma_poly(coeffs: &[f64]) -> Vec<f64> {
    lag_poly(coeffs, 1, 1.0)
}

/// Seasonal MA polynomial `1 + Theta_1 L^s + ... + Theta_Q L^(Qs)`.
pub fn seasonal_ma_poly(coeffs: &[f64], s: usize) -> Vec<f64> {
    lag_poly(coeffs, s, 1.0)
}

/// Expanded AR polynomial: non-seasonal times seasonal.
pub fn reduced_ar(params: &SarimaParams, order: &SarimaOrder) -> Vec<f64> {
    polymul(&ar_poly(&params.ar), &seasonal_ar_poly(&params.sar, order.s))
}

/// Expanded MA polynomial: non-seasonal times seasonal.
pub fn reduced_ma(params: &SarimaParams, order: &SarimaOrder) -> Vec<f64> {
    polymul(&ma_poly(&params.ma), &seasonal_ma_poly(&params.sma, order.s))
}
