//! Value function iteration: repeated Bellman applications until the sup-norm
//! distance between successive value functions falls below tolerance.

use log::{debug, info, warn};
use nalgebra::DVector;

use crate::bellman::apply_with;
use crate::error::Result;
use crate::grid::StateGrid;
use crate::interpolation::GridInterpolant;
use crate::model::ModelParameters;
use crate::optimize::{BrentMaximizer, ScalarMaximizer};
use crate::options::VfiOptions;

/// Final state of a value function iteration.
///
/// Hitting the iteration ceiling is not an error; inspect `converged`.
#[derive(Clone, Debug)]
pub struct VfiSolution {
    /// Last value function computed.
    pub values: DVector<f64>,
    /// Maximizing investment for `values`.
    pub policy: DVector<f64>,
    /// Number of Bellman applications performed.
    pub iterations: usize,
    /// Sup-norm distance between the last two value functions.
    pub distance: f64,
    pub converged: bool,
}

impl VfiSolution {
    /// Continuous value function on `grid`.
    pub fn value_function(&self, grid: &StateGrid) -> Result<GridInterpolant> {
        GridInterpolant::new(grid, self.values.as_slice())
    }

    /// Continuous investment policy on `grid`.
    pub fn policy_function(&self, grid: &StateGrid) -> Result<GridInterpolant> {
        GridInterpolant::new(grid, self.policy.as_slice())
    }
}

/// Runs value function iteration from `V = 0` with the default Brent maximizer.
pub fn solve(
    grid: &StateGrid,
    params: &ModelParameters,
    options: &VfiOptions,
) -> Result<VfiSolution> {
    solve_with(grid, params, options, &BrentMaximizer::default())
}

/// Runs value function iteration from `V = 0` with a caller-supplied maximizer.
pub fn solve_with<M: ScalarMaximizer>(
    grid: &StateGrid,
    params: &ModelParameters,
    options: &VfiOptions,
    maximizer: &M,
) -> Result<VfiSolution> {
    params.validate()?;

    let max_iterations = options.max_iterations.max(1);
    let mut values = DVector::zeros(grid.len());
    let mut policy = DVector::zeros(grid.len());
    let mut distance = f64::INFINITY;
    let mut iterations = 0usize;

    while iterations < max_iterations {
        let update = apply_with(&values, grid, params, &options.bellman, maximizer)?;
        distance = (&values - &update.values).amax();
        values = update.values;
        policy = update.policy;
        iterations += 1;
        debug!("vfi iteration {iterations}: distance {distance:.3e}");

        if distance < options.tolerance {
            info!("value function converged after {iterations} iterations");
            return Ok(VfiSolution {
                values,
                policy,
                iterations,
                distance,
                converged: true,
            });
        }
    }

    warn!(
        "value function did not converge after {iterations} iterations (distance {distance:.3e})"
    );
    Ok(VfiSolution {
        values,
        policy,
        iterations,
        distance,
        converged: false,
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::model::Period;

    #[test]
    fn converges_to_closed_form_when_investing_everything() {
        // With log return utility and an increasing continuation value the agent
        // invests (almost) everything, so V solves V(s) = 0.8 ln(1.1 s) + 0.95 V(s).
        let grid = StateGrid::linspace(0.4, 2.0, 40).unwrap();
        let params = ModelParameters::default();
        let solution = solve(&grid, &params, &VfiOptions::default()).unwrap();

        assert!(solution.converged);
        assert!(solution.distance < 1e-5);
        for (i, state) in grid.iter().enumerate() {
            let closed_form = 0.8 * (1.1 * state).ln() / (1.0 - 0.95);
            assert_relative_eq!(
                solution.values[i],
                closed_form,
                epsilon = 2e-2,
                max_relative = 1e-3
            );
        }
    }

    #[test]
    fn decision_period_does_not_settle_when_investment_leaves_the_grid() {
        // Investment is a fraction of the state, so at the lowest states it falls
        // below the smallest node and the continuation value is extrapolated.
        let grid = StateGrid::linspace(0.4, 2.0, 500).unwrap();
        let params = ModelParameters::default().with_utility_period(Period::Decision);
        let options = VfiOptions::default().with_max_iterations(300);
        let solution = solve(&grid, &params, &options).unwrap();

        assert!(!solution.converged);
        assert_eq!(solution.iterations, 300);
        assert!(solution.values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn iteration_ceiling_is_not_an_error() {
        let grid = StateGrid::linspace(0.4, 2.0, 20).unwrap();
        let options = VfiOptions::default().with_max_iterations(3);
        let solution = solve(&grid, &ModelParameters::default(), &options).unwrap();

        assert!(!solution.converged);
        assert_eq!(solution.iterations, 3);
        assert!(solution.distance >= 1e-5);
        assert_eq!(solution.policy.len(), grid.len());
    }

    #[test]
    fn interpolated_solution_matches_samples() {
        let grid = StateGrid::linspace(0.4, 2.0, 20).unwrap();
        let options = VfiOptions::default().with_max_iterations(5);
        let solution = solve(&grid, &ModelParameters::default(), &options).unwrap();

        let policy = solution.policy_function(&grid).unwrap();
        let value = solution.value_function(&grid).unwrap();
        assert_eq!(policy.evaluate(grid[7]), solution.policy[7]);
        assert_eq!(value.evaluate(grid[7]), solution.values[7]);
    }
}
