//! Maximum likelihood estimation of SARIMA coefficients.
//!
//! This module provides:
//! - Parameter space transformations (constrained <-> unconstrained)
//! - Negative log-likelihood objective for argmin and L-BFGS-B
//! - `fit()`: the entry point used by the model fitter

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use argmin::core::{CostFunction, Executor, Gradient, State, TerminationReason};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::neldermead::NelderMead;
use argmin::solver::quasinewton::LBFGS;

use crate::error::{ForecastError, Result};
use crate::initialization::KalmanInit;
use crate::kalman::kalman_filter;
use crate::params::{self, SarimaParams};
use crate::start_params::compute_start_params;
use crate::state_space::StateSpace;
use crate::types::{FitResult, Method, ModelConfig};

/// Cost reported for parameters where the likelihood cannot be evaluated.
const PENALTY: f64 = f64::MAX / 2.0;

/// Box bound applied to AR/MA coefficients when stability checks are relaxed.
const COEFF_BOUND: f64 = 0.999;

// ---------------------------------------------------------------------------
// Parameter transformations (constrained <-> unconstrained)
// ---------------------------------------------------------------------------

fn check_len(flat: &[f64], config: &ModelConfig) -> Result<()> {
    let expected = config.order.n_coeffs();
    if flat.len() != expected {
        return Err(ForecastError::ParamLengthMismatch {
            expected,
            got: flat.len(),
        });
    }
    Ok(())
}

/// Apply `ar_map` to the AR blocks and `ma_map` to the MA blocks of a flat
/// `[ar(p) | ma(q) | sar(P) | sma(Q)]` vector.
fn map_blocks(
    flat: &[f64],
    config: &ModelConfig,
    ar_map: fn(&[f64]) -> Vec<f64>,
    ma_map: fn(&[f64]) -> Vec<f64>,
) -> Vec<f64> {
    let order = &config.order;
    let blocks = [
        (order.p, config.enforce_stationarity(), ar_map),
        (order.q, config.enforce_invertibility(), ma_map),
        (order.pp, config.enforce_stationarity(), ar_map),
        (order.qq, config.enforce_invertibility(), ma_map),
    ];

    let mut out = Vec::with_capacity(flat.len());
    let mut i = 0;
    for (len, enforce, map) in blocks {
        let block = &flat[i..i + len];
        if enforce && len > 0 {
            out.extend(map(block));
        } else {
            out.extend_from_slice(block);
        }
        i += len;
    }
    out
}

/// Constrained coefficients to the optimizer's unconstrained space.
///
/// Identity unless stationarity/invertibility is enforced.
pub fn untransform_params(constrained: &[f64], config: &ModelConfig) -> Result<Vec<f64>> {
    check_len(constrained, config)?;
    Ok(map_blocks(
        constrained,
        config,
        params::unconstrain_stationary,
        params::unconstrain_invertible,
    ))
}

/// Unconstrained optimizer values back to model coefficients.
pub fn transform_params(unconstrained: &[f64], config: &ModelConfig) -> Result<Vec<f64>> {
    check_len(unconstrained, config)?;
    Ok(map_blocks(
        unconstrained,
        config,
        params::constrain_stationary,
        params::constrain_invertible,
    ))
}

/// L-BFGS-B bounds: unbounded under the Monahan/Jones transform (any real
/// maps to an admissible polynomial), otherwise the unit box.
fn compute_bounds(config: &ModelConfig) -> Vec<(Option<f64>, Option<f64>)> {
    let order = &config.order;
    let blocks = [
        (order.p, config.enforce_stationarity()),
        (order.q, config.enforce_invertibility()),
        (order.pp, config.enforce_stationarity()),
        (order.qq, config.enforce_invertibility()),
    ];
    blocks
        .iter()
        .flat_map(|&(len, enforce)| {
            let bound = if enforce {
                (None, None)
            } else {
                (Some(-COEFF_BOUND), Some(COEFF_BOUND))
            };
            std::iter::repeat(bound).take(len)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Objective
// ---------------------------------------------------------------------------

/// Negative concentrated log-likelihood over unconstrained parameters.
#[derive(Clone)]
struct SarimaObjective {
    endog: Vec<f64>,
    config: ModelConfig,
}

impl SarimaObjective {
    fn eval_loglike(&self, unconstrained: &[f64]) -> Result<f64> {
        let constrained = transform_params(unconstrained, &self.config)?;
        let sparams = SarimaParams::from_flat(&constrained, &self.config.order)?;
        let ss = StateSpace::new(&self.config.order, &sparams)?;
        let init = KalmanInit::for_state_space(&ss);
        let output = kalman_filter(&self.endog, &ss, &init)?;

        if output.loglike.is_finite() {
            Ok(output.loglike)
        } else {
            Err(ForecastError::Optimization("non-finite log-likelihood".into()))
        }
    }

    fn eval_negloglike(&self, unconstrained: &[f64]) -> f64 {
        match self.eval_loglike(unconstrained) {
            Ok(ll) => -ll,
            Err(_) => PENALTY,
        }
    }

    /// Central-difference gradient of the negative log-likelihood.
    fn numerical_gradient(&self, x: &[f64]) -> Vec<f64> {
        let mut work = x.to_vec();
        let mut grad = vec![0.0; x.len()];
        for i in 0..x.len() {
            let orig = work[i];
            let h = 1e-6 * orig.abs().max(1.0);
            work[i] = orig + h;
            let f_plus = self.eval_negloglike(&work);
            work[i] = orig - h;
            let f_minus = self.eval_negloglike(&work);
            work[i] = orig;

            let g = (f_plus - f_minus) / (2.0 * h);
            grad[i] = if g.is_finite() && f_plus < PENALTY && f_minus < PENALTY {
                g
            } else {
                0.0
            };
        }
        grad
    }
}

impl CostFunction for SarimaObjective {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Vec<f64>) -> std::result::Result<f64, argmin::core::Error> {
        Ok(self.eval_negloglike(param))
    }
}

impl Gradient for SarimaObjective {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, param: &Vec<f64>) -> std::result::Result<Vec<f64>, argmin::core::Error> {
        Ok(self.numerical_gradient(param))
    }
}

/// Result of one optimizer run, in unconstrained space.
struct OptimOutcome {
    params: Vec<f64>,
    n_iter: u64,
    converged: bool,
}

fn converged_reason(reason: Option<&TerminationReason>) -> bool {
    matches!(
        reason,
        Some(TerminationReason::SolverConverged) | Some(TerminationReason::TargetCostReached)
    )
}

// ---------------------------------------------------------------------------
// Solvers
// ---------------------------------------------------------------------------

fn run_lbfgs(
    objective: SarimaObjective,
    init_params: Vec<f64>,
    max_iter: u64,
) -> std::result::Result<OptimOutcome, String> {
    let linesearch = MoreThuenteLineSearch::new();
    let solver = LBFGS::new(linesearch, 10)
        .with_tolerance_grad(1e-5)
        .map_err(|e| e.to_string())?
        .with_tolerance_cost(1e-9)
        .map_err(|e| e.to_string())?;

    let result = Executor::new(objective, solver)
        .configure(
            |state: argmin::core::IterState<Vec<f64>, Vec<f64>, (), (), (), f64>| {
                state.param(init_params).max_iters(max_iter)
            },
        )
        .run()
        .map_err(|e| format!("L-BFGS failed: {}", e))?;

    let state = result.state();
    let params = state
        .get_best_param()
        .ok_or("L-BFGS: no best parameter found")?
        .clone();

    Ok(OptimOutcome {
        params,
        n_iter: state.get_iter(),
        converged: converged_reason(state.get_termination_reason()),
    })
}

fn run_nelder_mead(
    objective: SarimaObjective,
    init_params: Vec<f64>,
    max_iter: u64,
) -> std::result::Result<OptimOutcome, String> {
    // n+1 vertices: the start plus a 5% step along each axis
    let mut simplex = vec![init_params.clone()];
    for i in 0..init_params.len() {
        let mut vertex = init_params.clone();
        vertex[i] += if vertex[i].abs() > 1e-8 {
            vertex[i] * 0.05
        } else {
            0.00025
        };
        simplex.push(vertex);
    }

    let solver = NelderMead::new(simplex)
        .with_sd_tolerance(1e-8)
        .map_err(|e| e.to_string())?;

    let result = Executor::new(objective, solver)
        .configure(
            |state: argmin::core::IterState<Vec<f64>, (), (), (), (), f64>| {
                state.max_iters(max_iter)
            },
        )
        .run()
        .map_err(|e| format!("Nelder-Mead failed: {}", e))?;

    let state = result.state();
    let params = state
        .get_best_param()
        .ok_or("Nelder-Mead: no best parameter found")?
        .clone();

    Ok(OptimOutcome {
        params,
        n_iter: state.get_iter(),
        converged: converged_reason(state.get_termination_reason()),
    })
}

fn run_lbfgsb(
    objective: &SarimaObjective,
    init_params: Vec<f64>,
    bounds: Vec<(Option<f64>, Option<f64>)>,
    max_iter: u64,
) -> std::result::Result<OptimOutcome, String> {
    let n = init_params.len();
    let obj = objective.clone();
    let eval_count = Arc::new(AtomicU64::new(0));
    let eval_count_inner = eval_count.clone();
    let hit_limit = Arc::new(AtomicBool::new(false));
    let hit_limit_inner = hit_limit.clone();

    let evaluate = move |x: &[f64], g: &mut [f64]| -> anyhow::Result<f64> {
        // lbfgsb has no iteration cap; a zero gradient past the budget stops it
        if eval_count_inner.load(Ordering::Relaxed) >= max_iter {
            hit_limit_inner.store(true, Ordering::Relaxed);
            g.iter_mut().for_each(|g_i| *g_i = 0.0);
            return Ok(obj.eval_negloglike(x));
        }
        eval_count_inner.fetch_add(1, Ordering::Relaxed);

        let cost = obj.eval_negloglike(x);
        if cost >= PENALTY {
            g.iter_mut().for_each(|g_i| *g_i = 0.0);
            return Ok(cost);
        }
        g[..n].copy_from_slice(&obj.numerical_gradient(x));
        Ok(cost)
    };

    let param = lbfgsb::LbfgsbParameter {
        m: 10,
        factr: 1e7,
        pgtol: 1e-5,
        iprint: -1, // silent
    };

    let mut problem = lbfgsb::LbfgsbProblem::build(init_params, evaluate);
    problem.set_bounds(bounds);

    let mut state = lbfgsb::LbfgsbState::new(problem, param);
    state
        .minimize()
        .map_err(|e| format!("L-BFGS-B failed: {}", e))?;

    let x = state.x().to_vec();
    let valid = state.fx().is_finite() && state.fx() < PENALTY;

    Ok(OptimOutcome {
        params: x,
        n_iter: eval_count.load(Ordering::Relaxed),
        converged: valid && !hit_limit.load(Ordering::Relaxed),
    })
}

// ---------------------------------------------------------------------------
// Public fit() entry point
// ---------------------------------------------------------------------------

/// Fit a SARIMA model by maximum likelihood.
///
/// Fails with `InsufficientData` before any optimizer work when the series is
/// shorter than `order.min_observations()`, and with `FitConvergence` when no
/// solver reports convergence.
pub fn fit(endog: &[f64], config: &ModelConfig) -> Result<FitResult> {
    let order = &config.order;
    order.validate()?;

    let needed = order.min_observations();
    if endog.len() < needed {
        return Err(ForecastError::InsufficientData {
            needed,
            got: endog.len(),
        });
    }
    if let Some(i) = endog.iter().position(|v| !v.is_finite()) {
        return Err(ForecastError::InvalidSeries(format!(
            "observation {} is not finite",
            i
        )));
    }

    let mut constrained_start = compute_start_params(endog, order);
    if config.relax_stability_checks {
        for c in constrained_start.iter_mut() {
            *c = c.clamp(-0.99, 0.99);
        }
    }
    let start = untransform_params(&constrained_start, config)?;

    let objective = SarimaObjective {
        endog: endog.to_vec(),
        config: config.clone(),
    };

    let (outcome, used_method) = if start.is_empty() {
        // nothing to estimate: only the concentrated scale
        (
            OptimOutcome {
                params: vec![],
                n_iter: 0,
                converged: true,
            },
            "none".to_string(),
        )
    } else {
        match config.method {
            Method::NelderMead => (
                run_nelder_mead(objective, start, config.max_iter)
                    .map_err(ForecastError::Optimization)?,
                Method::NelderMead.to_string(),
            ),
            Method::Lbfgs => (
                run_lbfgs(objective, start, config.max_iter).map_err(ForecastError::Optimization)?,
                Method::Lbfgs.to_string(),
            ),
            Method::Lbfgsb => {
                let bounds = compute_bounds(config);
                match run_lbfgsb(&objective, start.clone(), bounds, config.max_iter) {
                    Ok(out) if out.converged => (out, Method::Lbfgsb.to_string()),
                    _ => (
                        run_nelder_mead(objective, start, config.max_iter)
                            .map_err(ForecastError::Optimization)?,
                        "nelder-mead (fallback)".to_string(),
                    ),
                }
            }
        }
    };

    if !outcome.converged {
        return Err(ForecastError::FitConvergence {
            method: used_method,
            iterations: outcome.n_iter,
        });
    }

    let final_constrained = transform_params(&outcome.params, config)?;
    let final_params = SarimaParams::from_flat(&final_constrained, order)?;
    let ss = StateSpace::new(order, &final_params)?;
    let init = KalmanInit::for_state_space(&ss);
    let output = kalman_filter(endog, &ss, &init)?;

    if !output.loglike.is_finite() {
        return Err(ForecastError::FitConvergence {
            method: used_method,
            iterations: outcome.n_iter,
        });
    }

    Ok(FitResult {
        params: final_constrained,
        loglike: output.loglike,
        scale: output.scale,
        n_obs: endog.len(),
        n_params: SarimaParams::n_estimated_params(order),
        n_iter: outcome.n_iter,
        converged: true,
        method: used_method,
        aic: 0.0,
        bic: 0.0,
    }
    .with_information_criteria())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
