//! Configuration structures for the value-function and steady-state solvers.

use serde::{Deserialize, Serialize};

use crate::solving::NewtonSolver;

/// Controls a single application of the Bellman operator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BellmanOptions {
    /// Margin keeping both consumption and investment strictly positive: the
    /// control is searched over `(epsilon, state - epsilon)`.
    pub epsilon: f64,
    /// Solve grid points on the rayon thread pool.
    pub parallel: bool,
}

impl Default for BellmanOptions {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            parallel: true,
        }
    }
}

/// Controls value function iteration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VfiOptions {
    /// Supremum-norm tolerance between successive value functions.
    pub tolerance: f64,
    /// Maximum number of Bellman applications.
    pub max_iterations: usize,
    /// Options forwarded to every Bellman application.
    #[serde(default)]
    pub bellman: BellmanOptions,
}

impl Default for VfiOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-5,
            max_iterations: 5_000,
            bellman: BellmanOptions::default(),
        }
    }
}

impl VfiOptions {
    /// Override the convergence tolerance while preserving other defaults.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the iteration ceiling (at least one Bellman application is performed).
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Override the search margin used at every grid point.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.bellman.epsilon = epsilon;
        self
    }

    /// Enable or disable the parallel per-point loop.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.bellman.parallel = parallel;
        self
    }
}

/// Strategy used to locate the OLG steady state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SteadyStateMethod {
    /// One root-find over savings and labor, with prices implied by the
    /// aggregates at every trial point.
    #[default]
    Joint,
    /// Outer fixed point on the interest rate. For each guessed rate the
    /// household system is solved at fixed prices, then the rate is moved
    /// toward the one implied by the firm's FOC with weight `damping`.
    PriceIteration { damping: f64 },
}

/// Controls the steady-state solver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SteadyStateOptions {
    #[serde(default)]
    pub method: SteadyStateMethod,
    /// Root finder used for household (and, in joint mode, market) equations.
    #[serde(default)]
    pub newton: NewtonSolver,
    /// Maximum number of rate updates in price-iteration mode.
    pub max_outer_iterations: usize,
    /// Tolerance on `|implied rate - guessed rate|` in price-iteration mode.
    pub outer_tolerance: f64,
}

impl Default for SteadyStateOptions {
    fn default() -> Self {
        Self {
            method: SteadyStateMethod::Joint,
            newton: NewtonSolver::default(),
            max_outer_iterations: 500,
            outer_tolerance: 1e-8,
        }
    }
}

impl SteadyStateOptions {
    /// Switch to the damped interest-rate fixed point.
    pub fn with_price_iteration(mut self, damping: f64) -> Self {
        self.method = SteadyStateMethod::PriceIteration { damping };
        self
    }

    /// Override the root finder configuration.
    pub fn with_newton(mut self, newton: NewtonSolver) -> Self {
        self.newton = newton;
        self
    }

    /// Set the maximum number of outer rate updates.
    pub fn with_max_outer_iterations(mut self, max_outer_iterations: usize) -> Self {
        self.max_outer_iterations = max_outer_iterations.max(1);
        self
    }

    /// Set the tolerance of the outer rate update.
    pub fn with_outer_tolerance(mut self, tolerance: f64) -> Self {
        self.outer_tolerance = tolerance;
        self
    }
}
