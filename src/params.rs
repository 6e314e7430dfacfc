use crate::error::{ForecastError, Result};
use crate::types::SarimaOrder;

/// Structured SARIMA coefficients.
///
/// Flat layout used by the optimizer: `[ar(p) | ma(q) | sar(P) | sma(Q)]`.
/// The innovation variance is always concentrated out of the likelihood.
#[derive(Debug, Clone, PartialEq)]
pub struct SarimaParams {
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub sar: Vec<f64>,
    pub sma: Vec<f64>,
}

impl SarimaParams {
    pub fn from_flat(flat: &[f64], order: &SarimaOrder) -> Result<Self> {
        let expected = order.n_coeffs();
        if flat.len() != expected {
            return Err(ForecastError::ParamLengthMismatch {
                expected,
                got: flat.len(),
            });
        }

        let (ar, rest) = flat.split_at(order.p);
        let (ma, rest) = rest.split_at(order.q);
        let (sar, sma) = rest.split_at(order.pp);

        Ok(Self {
            ar: ar.to_vec(),
            ma: ma.to_vec(),
            sar: sar.to_vec(),
            sma: sma.to_vec(),
        })
    }

    /// Coefficient count used for AIC/BIC; the concentrated variance counts too.
    pub fn n_estimated_params(order: &SarimaOrder) -> usize {
        order.n_coeffs() + 1
    }
}

// ---------------------------------------------------------------------------
// Monahan (1984) / Jones (1980) reparameterization
// ---------------------------------------------------------------------------

/// Map unconstrained reals to the coefficients of a stationary AR polynomial.
///
/// Each value becomes a partial autocorrelation `x / sqrt(1 + x^2)`, then the
/// Levinson-Durbin recursion turns the PACF sequence into AR coefficients.
pub fn constrain_stationary(unconstrained: &[f64]) -> Vec<f64> {
    let n = unconstrained.len();
    if n == 0 {
        return vec![];
    }

    let pacf: Vec<f64> = unconstrained
        .iter()
        .map(|&x| x / (1.0 + x * x).sqrt())
        .collect();

    let mut y = vec![vec![0.0; n]; n];
    for k in 0..n {
        for i in 0..k {
            y[k][i] = y[k - 1][i] + pacf[k] * y[k - 1][k - i - 1];
        }
        y[k][k] = pacf[k];
    }

    y[n - 1].iter().map(|&v| -v).collect()
}

/// Inverse of [`constrain_stationary`].
pub fn unconstrain_stationary(constrained: &[f64]) -> Vec<f64> {
    let n = constrained.len();
    if n == 0 {
        return vec![];
    }

    let mut y = vec![vec![0.0; n]; n];
    for (i, &c) in constrained.iter().enumerate() {
        y[n - 1][i] = -c;
    }

    for k in (1..n).rev() {
        let rk = y[k][k];
        let denom = (1.0 - rk * rk).max(1e-15);
        for i in 0..k {
            y[k - 1][i] = (y[k][i] - rk * y[k][k - i - 1]) / denom;
        }
    }

    (0..n)
        .map(|k| {
            let r = y[k][k];
            r / (1.0 - r * r).max(1e-15).sqrt()
        })
        .collect()
}

/// Invertible MA coefficients: the stationary map with the sign flipped.
pub fn constrain_invertible(unconstrained: &[f64]) -> Vec<f64> {
    constrain_stationary(unconstrained)
        .into_iter()
        .map(|x| -x)
        .collect()
}

pub fn unconstrain_invertible(constrained: &[f64]) -> Vec<f64> {
    let negated: Vec<f64> = constrained.iter().map(|&x| -x).collect();
    unconstrain_stationary(&negated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flat_splits_blocks() {
        let order = SarimaOrder::new(2, 0, 1, 1, 0, 1, 12);
        let flat = vec![0.5, -0.3, 0.2, 0.4, -0.1];
        let params = SarimaParams::from_flat(&flat, &order).unwrap();
        assert_eq!(params.ar, vec![0.5, -0.3]);
        assert_eq!(params.ma, vec![0.2]);
        assert_eq!(params.sar, vec![0.4]);
        assert_eq!(params.sma, vec![-0.1]);
    }

    #[test]
    fn test_from_flat_length_mismatch() {
        let order = SarimaOrder::new(1, 0, 0, 0, 0, 0, 0);
        let err = SarimaParams::from_flat(&[0.5, 0.3], &order).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::ParamLengthMismatch { expected: 1, got: 2 }
        ));
    }

    #[test]
    fn test_n_estimated_params() {
        let order = SarimaOrder::new(1, 1, 1, 1, 1, 1, 12);
        assert_eq!(SarimaParams::n_estimated_params(&order), 5);
    }

    #[test]
    fn test_monahan_roundtrip_ar3() {
        let original = vec![1.0, -0.5, 0.2];
        let recovered = unconstrain_stationary(&constrain_stationary(&original));
        for (a, b) in original.iter().zip(recovered.iter()) {
            assert!((a - b).abs() < 1e-10, "roundtrip failed: {} vs {}", a, b);
        }
    }

    #[test]
    fn test_constrained_ar1_inside_unit_circle() {
        for x in [-50.0, -1.0, 0.0, 3.0, 1e3] {
            let phi = constrain_stationary(&[x])[0];
            assert!(phi.abs() < 1.0, "phi={} escaped the unit interval", phi);
        }
    }

    #[test]
    fn test_invertible_roundtrip() {
        let original = vec![0.4, -0.2];
        let recovered = unconstrain_invertible(&constrain_invertible(&original));
        for (a, b) in original.iter().zip(recovered.iter()) {
            assert!((a - b).abs() < 1e-10);
        }
    }

    #[test]
    fn test_empty_transforms() {
        assert!(constrain_stationary(&[]).is_empty());
        assert!(unconstrain_stationary(&[]).is_empty());
    }
}
