use nalgebra::{DMatrix, DVector};

use crate::error::{ForecastError, Result};
use crate::params::SarimaParams;
use crate::polynomial::{reduced_ar, reduced_ma};
use crate::types::SarimaOrder;

/// Harvey-representation state space for a SARIMA model.
///
/// State equation:  alpha_{t+1} = T * alpha_t + R * eta_t,   eta_t ~ N(0, sigma2)
/// Observation:     y_t         = Z' * alpha_t
///
/// The differencing operators live in the leading `d + s*D` states so the
/// filter runs on the undifferenced series.
#[derive(Debug, Clone)]
pub struct StateSpace {
    pub k_states: usize,
    pub k_states_diff: usize,
    pub transition: DMatrix<f64>, // T: k_states x k_states
    pub design: DVector<f64>,     // Z
    pub selection: DVector<f64>,  // R (single disturbance)
}

impl StateSpace {
    /// Supports SARIMA(p,d,q)(P,D,Q,s) with D <= 1.
    pub fn new(order: &SarimaOrder, params: &SarimaParams) -> Result<Self> {
        if order.dd > 1 {
            return Err(ForecastError::StateSpace(format!(
                "seasonal differencing D={} is not supported",
                order.dd
            )));
        }
        if order.dd > 0 && order.s < 2 {
            return Err(ForecastError::StateSpace(format!(
                "seasonal differencing requires s >= 2, got s={}",
                order.s
            )));
        }
        if params.ar.len() != order.p
            || params.ma.len() != order.q
            || params.sar.len() != order.pp
            || params.sma.len() != order.qq
        {
            return Err(ForecastError::ParamLengthMismatch {
                expected: order.n_coeffs(),
                got: params.ar.len() + params.ma.len() + params.sar.len() + params.sma.len(),
            });
        }

        Ok(Self {
            k_states: order.k_states(),
            k_states_diff: order.k_states_diff(),
            transition: build_transition(order, params),
            design: build_design(order),
            selection: build_selection(order, params),
        })
    }

    /// R * R' (state disturbance covariance with unit variance).
    pub fn disturbance_cov(&self) -> DMatrix<f64> {
        &self.selection * self.selection.transpose()
    }
}

/// Transition matrix T.
///
/// 1. regular differencing block: upper triangular ones
/// 2. seasonal differencing: s x s cyclic shift per layer
/// 3. regular differencing states pick up the last seasonal state
/// 4. differencing states feed from the first ARMA state
/// 5. ARMA companion block
fn build_transition(order: &SarimaOrder, params: &SarimaParams) -> DMatrix<f64> {
    let k = order.k_states();
    let (d, dd, s) = (order.d, order.dd, order.s);
    let sd = order.k_states_diff();
    let ko = order.k_order();

    let mut t = DMatrix::<f64>::zeros(k, k);

    for i in 0..d {
        for j in i..d {
            t[(i, j)] = 1.0;
        }
    }

    for layer in 0..dd {
        let base = d + layer * s;
        t[(base, base + s - 1)] = 1.0;
        for i in 0..(s - 1) {
            t[(base + i + 1, base + i)] = 1.0;
        }
    }

    if dd > 0 {
        let last_seasonal = d + s * dd - 1;
        for i in 0..d {
            t[(i, last_seasonal)] = 1.0;
        }
    }

    for i in 0..d {
        t[(i, sd)] = 1.0;
    }
    for layer in 0..dd {
        t[(d + layer * s, sd)] = 1.0;
    }

    let red_ar = reduced_ar(params, order);
    for (i, &c) in red_ar.iter().skip(1).take(ko).enumerate() {
        t[(sd + i, sd)] = -c;
    }
    for i in 0..ko.saturating_sub(1) {
        t[(sd + i, sd + i + 1)] = 1.0;
    }

    t
}

/// Design vector Z: ones on the regular differencing states, on the last
/// state of each seasonal layer and on the first ARMA state.
fn build_design(order: &SarimaOrder) -> DVector<f64> {
    let k = order.k_states();
    let (d, dd, s) = (order.d, order.dd, order.s);
    let sd = order.k_states_diff();

    let mut z = DVector::<f64>::zeros(k);
    for i in 0..d {
        z[i] = 1.0;
    }
    for layer in 0..dd {
        z[d + (layer + 1) * s - 1] = 1.0;
    }
    if sd < k {
        z[sd] = 1.0;
    }
    z
}

/// Selection vector R: the expanded MA polynomial placed on the ARMA block.
fn build_selection(order: &SarimaOrder, params: &SarimaParams) -> DVector<f64> {
    let k = order.k_states();
    let sd = order.k_states_diff();
    let ko = order.k_order();

    let mut r = DVector::<f64>::zeros(k);
    r[sd] = 1.0;

    let red_ma = reduced_ma(params, order);
    for (i, &c) in red_ma.iter().enumerate().take(ko).skip(1) {
        r[sd + i] = c;
    }
    r
}
