//! Monte Carlo simulation of an agent following a converged investment policy.

use nalgebra::DVector;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Bernoulli, Distribution};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};
use crate::grid::StateGrid;
use crate::model::{ModelParameters, ShockRegime};
use crate::vfi::VfiSolution;

/// Controls a simulated history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationOptions {
    /// Number of periods to simulate.
    pub periods: usize,
    /// State in the first period; clamped onto the grid.
    pub initial_state: f64,
    /// Probability that a period's shock is drawn from the good regime.
    pub good_probability: f64,
    /// Margin keeping investment strictly inside `(0, state)`.
    pub epsilon: f64,
    pub seed: u64,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            periods: 100,
            initial_state: 1.0,
            good_probability: 0.5,
            epsilon: 1e-6,
            seed: 1234,
        }
    }
}

/// A simulated history of states, investments, and realised regimes.
#[derive(Clone, Debug)]
pub struct SimulatedPath {
    pub states: DVector<f64>,
    pub investments: DVector<f64>,
    pub regimes: Vec<ShockRegime>,
}

/// Simulates `options.periods` periods under the policy of `solution`.
///
/// Each period the agent invests `policy(s)`, a regime is drawn, and the next
/// state is `r * I * magnitude(regime)`, kept inside the grid bounds.
pub fn simulate(
    solution: &VfiSolution,
    grid: &StateGrid,
    params: &ModelParameters,
    options: &SimulationOptions,
) -> Result<SimulatedPath> {
    let policy = solution.policy_function(grid)?;
    let draw = Bernoulli::new(options.good_probability).map_err(|_| {
        SolverError::invalid_parameter("good_probability", options.good_probability)
    })?;
    if !options.initial_state.is_finite() {
        return Err(SolverError::invalid_parameter(
            "initial_state",
            options.initial_state,
        ));
    }

    let mut rng = SmallRng::seed_from_u64(options.seed);
    let mut states = Vec::with_capacity(options.periods);
    let mut investments = Vec::with_capacity(options.periods);
    let mut regimes = Vec::with_capacity(options.periods);

    let mut state = options.initial_state.clamp(grid.lower(), grid.upper());
    for _ in 0..options.periods {
        let upper = (state - options.epsilon).max(options.epsilon);
        let investment = policy.evaluate(state).clamp(options.epsilon, upper);
        let regime = if draw.sample(&mut rng) {
            ShockRegime::Good
        } else {
            ShockRegime::Bad
        };

        states.push(state);
        investments.push(investment);
        regimes.push(regime);

        let magnitude = params.shocks.get(regime).magnitude;
        state = (params.gross_return * investment * magnitude).clamp(grid.lower(), grid.upper());
    }

    Ok(SimulatedPath {
        states: DVector::from_vec(states),
        investments: DVector::from_vec(investments),
        regimes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::VfiOptions;
    use crate::vfi::solve;

    fn short_solution(grid: &StateGrid, params: &ModelParameters) -> VfiSolution {
        let options = VfiOptions::default().with_max_iterations(10);
        solve(grid, params, &options).unwrap()
    }

    #[test]
    fn simulation_is_reproducible_for_a_seed() {
        let grid = StateGrid::linspace(0.4, 2.0, 30).unwrap();
        let params = ModelParameters::default();
        let solution = short_solution(&grid, &params);
        let options = SimulationOptions {
            periods: 50,
            ..SimulationOptions::default()
        };

        let a = simulate(&solution, &grid, &params, &options).unwrap();
        let b = simulate(&solution, &grid, &params, &options).unwrap();
        assert_eq!(a.states, b.states);
        assert_eq!(a.regimes, b.regimes);
        assert_eq!(a.states.len(), 50);

        for (state, investment) in a.states.iter().zip(a.investments.iter()) {
            assert!(*state >= grid.lower() && *state <= grid.upper());
            assert!(*investment > 0.0 && *investment < *state);
        }
    }

    #[test]
    fn certain_regime_is_always_drawn() {
        let grid = StateGrid::linspace(0.4, 2.0, 30).unwrap();
        let params = ModelParameters::default();
        let solution = short_solution(&grid, &params);
        let options = SimulationOptions {
            periods: 20,
            good_probability: 1.0,
            ..SimulationOptions::default()
        };
        let path = simulate(&solution, &grid, &params, &options).unwrap();
        assert!(path.regimes.iter().all(|r| *r == ShockRegime::Good));
    }

    #[test]
    fn rejects_invalid_probability() {
        let grid = StateGrid::linspace(0.4, 2.0, 10).unwrap();
        let params = ModelParameters::default();
        let solution = short_solution(&grid, &params);
        let options = SimulationOptions {
            good_probability: 1.5,
            ..SimulationOptions::default()
        };
        assert!(matches!(
            simulate(&solution, &grid, &params, &options),
            Err(SolverError::InvalidParameter { .. })
        ));
    }
}
