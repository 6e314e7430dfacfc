use nalgebra::{DMatrix, DVector};

use crate::state_space::StateSpace;

/// Variance assigned to every initial state under approximate diffuse start.
pub const DIFFUSE_KAPPA: f64 = 1e6;

/// Kalman filter starting point.
#[derive(Debug, Clone)]
pub struct KalmanInit {
    pub initial_state: DVector<f64>,
    pub initial_state_cov: DMatrix<f64>,
    /// Leading observations left out of the log-likelihood.
    pub loglikelihood_burn: usize,
}

impl KalmanInit {
    /// a_0 = 0, P_0 = kappa * I, and every diffuse-affected observation
    /// (one per state) is burned.
    pub fn approximate_diffuse(k_states: usize, kappa: f64) -> Self {
        Self {
            initial_state: DVector::zeros(k_states),
            initial_state_cov: DMatrix::identity(k_states, k_states) * kappa,
            loglikelihood_burn: k_states,
        }
    }

    pub fn for_state_space(ss: &StateSpace) -> Self {
        Self::approximate_diffuse(ss.k_states, DIFFUSE_KAPPA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approximate_diffuse_basic() {
        let init = KalmanInit::approximate_diffuse(2, 1e6);
        assert_eq!(init.initial_state.len(), 2);
        assert!(init.initial_state.iter().all(|v| *v == 0.0));
        assert!((init.initial_state_cov[(0, 0)] - 1e6).abs() < 1e-6);
        assert!(init.initial_state_cov[(0, 1)].abs() < 1e-15);
        assert_eq!(init.loglikelihood_burn, 2);
    }
}
