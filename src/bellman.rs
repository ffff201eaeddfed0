//! The Bellman operator of the stochastic investment problem.
//!
//! At each state `s` the agent chooses an investment `I` in `(0, s)`. The
//! objective weighs current CRRA utility by the shock magnitude and the
//! interpolated continuation value by the two continuation probabilities of the
//! active regime.

use log::debug;
use nalgebra::DVector;
use rayon::prelude::*;

use crate::error::{Result, SolverError};
use crate::grid::StateGrid;
use crate::interpolation::GridInterpolant;
use crate::model::{ModelParameters, Period};
use crate::optimize::{BrentMaximizer, ScalarMaximizer};
use crate::options::BellmanOptions;

/// Updated value function and the maximizing investment at every grid point.
#[derive(Clone, Debug)]
pub struct BellmanUpdate {
    pub values: DVector<f64>,
    pub policy: DVector<f64>,
}

/// CRRA utility: `ln c` when `sigma = 1`, `c^(1 - sigma) / (1 - sigma)` otherwise.
/// Non-positive consumption has utility negative infinity.
pub fn utility(consumption: f64, risk_aversion: f64) -> f64 {
    if !(consumption > 0.0) {
        return f64::NEG_INFINITY;
    }
    if risk_aversion == 1.0 {
        consumption.ln()
    } else {
        consumption.powf(1.0 - risk_aversion) / (1.0 - risk_aversion)
    }
}

/// Consumption in the given period for state `s` and investment `I`.
pub fn period_consumption(state: f64, investment: f64, period: Period, gross_return: f64) -> f64 {
    match period {
        Period::Decision => state - investment,
        Period::Continuation => gross_return * investment,
    }
}

/// Objective maximized at state `s`:
/// `w_u * u(c) + beta * (w_h * V(I) + w_l * V(I))`.
pub fn objective(
    state: f64,
    investment: f64,
    params: &ModelParameters,
    continuation: &GridInterpolant,
) -> f64 {
    let (w_u, w_h, w_l) = params.shock().objective_weights();
    let c = period_consumption(
        state,
        investment,
        params.utility_period,
        params.gross_return,
    );
    let future = continuation.evaluate(investment);
    w_u * utility(c, params.risk_aversion)
        + params.discount_factor * (w_h * future + w_l * future)
}

/// Applies the Bellman operator with the default Brent maximizer.
pub fn apply(
    values: &DVector<f64>,
    grid: &StateGrid,
    params: &ModelParameters,
    options: &BellmanOptions,
) -> Result<BellmanUpdate> {
    apply_with(values, grid, params, options, &BrentMaximizer::default())
}

/// Applies the Bellman operator using the supplied maximizer.
///
/// The input sample is only read. Every state must exceed `2 * epsilon`;
/// otherwise the whole application fails with `InfeasibleState`.
pub fn apply_with<M: ScalarMaximizer>(
    values: &DVector<f64>,
    grid: &StateGrid,
    params: &ModelParameters,
    options: &BellmanOptions,
    maximizer: &M,
) -> Result<BellmanUpdate> {
    let n = grid.len();
    if values.len() != n {
        return Err(SolverError::dimension_mismatch(
            "value function length",
            n,
            values.len(),
        ));
    }
    let epsilon = options.epsilon;
    if !(epsilon > 0.0) {
        return Err(SolverError::invalid_parameter("epsilon", epsilon));
    }
    if let Some(index) = grid.iter().position(|state| *state <= 2.0 * epsilon) {
        return Err(SolverError::InfeasibleState {
            index,
            state: grid[index],
            epsilon,
        });
    }

    let continuation = GridInterpolant::new(grid, values.as_slice())?;
    let solve_point = |index: usize| -> Result<(f64, f64)> {
        let state = grid[index];
        let optimum = maximizer.maximize(
            |investment| objective(state, investment, params, &continuation),
            epsilon,
            state - epsilon,
        )?;
        if !optimum.converged {
            debug!(
                "bellman: search at state {state} stopped after {} evaluations",
                optimum.evaluations
            );
        }
        Ok((optimum.value, optimum.x))
    };

    let points: Vec<(f64, f64)> = if options.parallel {
        (0..n).into_par_iter().map(solve_point).collect::<Result<_>>()?
    } else {
        (0..n).map(solve_point).collect::<Result<_>>()?
    };

    Ok(BellmanUpdate {
        values: DVector::from_iterator(n, points.iter().map(|(value, _)| *value)),
        policy: DVector::from_iterator(n, points.iter().map(|(_, investment)| *investment)),
    })
}
