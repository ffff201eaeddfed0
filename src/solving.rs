//! Root finding for square systems of nonlinear equations.
//!
//! The steady-state solver treats the root finder as a capability: given a
//! residual function and an initial guess, return the best point found and a
//! convergence flag. [`NewtonSolver`] is the bundled implementation.

use log::{debug, warn};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};

/// Outcome of a root-finding run. Non-convergence is reported, not raised.
#[derive(Clone, Debug)]
pub struct RootSolution {
    /// Last accepted iterate.
    pub x: DVector<f64>,
    /// Residuals at `x`.
    pub residuals: DVector<f64>,
    /// Maximum absolute residual at `x`.
    pub residual_norm: f64,
    /// Number of Newton steps taken.
    pub iterations: usize,
    /// Number of residual evaluations, Jacobian columns included.
    pub evaluations: usize,
    /// Whether `residual_norm` fell below the tolerance.
    pub converged: bool,
}

/// Capability shared by nonlinear system solvers.
pub trait RootFinder {
    /// Searches for `x` with `system(x) = 0`, starting from `guess`.
    ///
    /// Errors from `system` that describe an infeasible trial point (see
    /// [`SolverError::is_infeasible_point`]) reject that point; any other error,
    /// or any error at the initial guess, is returned to the caller.
    fn find_root<F>(&self, system: F, guess: DVector<f64>) -> Result<RootSolution>
    where
        F: FnMut(&DVector<f64>) -> Result<DVector<f64>>;
}

/// Damped Newton iteration with a forward-difference Jacobian.
///
/// Each step solves `J d = -f` by LU decomposition; a singular Jacobian falls
/// back to the steepest-descent direction `-J'f` of `|f|^2`. Steps are halved
/// until the squared residual norm decreases sufficiently.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewtonSolver {
    /// Convergence tolerance on the maximum absolute residual.
    pub tolerance: f64,
    /// Maximum number of Newton steps.
    pub max_iterations: usize,
    /// Maximum number of step halvings per iteration.
    pub max_backtracks: usize,
    /// Relative perturbation used for finite differences.
    pub jacobian_step: f64,
}

impl Default for NewtonSolver {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 200,
            max_backtracks: 30,
            jacobian_step: f64::EPSILON.sqrt(),
        }
    }
}

impl NewtonSolver {
    /// Override the residual tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the maximum number of Newton steps.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the maximum number of step halvings per iteration.
    pub fn with_max_backtracks(mut self, max_backtracks: usize) -> Self {
        self.max_backtracks = max_backtracks;
        self
    }

    fn jacobian<F>(
        &self,
        system: &mut F,
        x: &DVector<f64>,
        f: &DVector<f64>,
        evaluations: &mut usize,
    ) -> Result<Option<DMatrix<f64>>>
    where
        F: FnMut(&DVector<f64>) -> Result<DVector<f64>>,
    {
        let n = x.len();
        let mut jacobian = DMatrix::zeros(f.len(), n);
        let mut shifted = x.clone();

        for j in 0..n {
            let h = self.jacobian_step * x[j].abs().max(1.0);
            shifted[j] = x[j] + h;
            *evaluations += 1;
            let column = match evaluate(system, &shifted)? {
                Some(forward) => (forward - f) / h,
                None => {
                    shifted[j] = x[j] - h;
                    *evaluations += 1;
                    match evaluate(system, &shifted)? {
                        Some(backward) => (f - backward) / h,
                        None => return Ok(None),
                    }
                }
            };
            jacobian.set_column(j, &column);
            shifted[j] = x[j];
        }

        Ok(Some(jacobian))
    }
}

impl RootFinder for NewtonSolver {
    fn find_root<F>(&self, mut system: F, guess: DVector<f64>) -> Result<RootSolution>
    where
        F: FnMut(&DVector<f64>) -> Result<DVector<f64>>,
    {
        let mut x = guess;
        let mut f = system(&x)?;
        let mut evaluations = 1usize;
        if f.len() != x.len() {
            return Err(SolverError::dimension_mismatch(
                "residual length",
                x.len(),
                f.len(),
            ));
        }
        if !all_finite(&f) {
            return Err(SolverError::NumericalError {
                context: "residuals at initial guess",
            });
        }

        let mut iterations = 0usize;
        let mut converged = f.amax() < self.tolerance;

        while !converged && iterations < self.max_iterations {
            let Some(jacobian) = self.jacobian(&mut system, &x, &f, &mut evaluations)? else {
                warn!("newton: jacobian could not be evaluated around the current iterate");
                break;
            };

            let gradient = jacobian.transpose() * &f;
            let direction = match jacobian.lu().solve(&(-&f)) {
                Some(step) if all_finite(&step) => step,
                _ => {
                    warn!(
                        "newton: singular jacobian at iteration {iterations}, using gradient step"
                    );
                    -gradient
                }
            };

            let merit = f.norm_squared();
            let mut lambda = 1.0_f64;
            let mut accepted = None;
            for _ in 0..=self.max_backtracks {
                let trial = &x + &direction * lambda;
                evaluations += 1;
                if let Some(f_trial) = evaluate(&mut system, &trial)? {
                    if f_trial.norm_squared() < (1.0 - 1e-4 * lambda) * merit {
                        accepted = Some((trial, f_trial));
                        break;
                    }
                }
                lambda *= 0.5;
            }

            let Some((next_x, next_f)) = accepted else {
                warn!(
                    "newton: line search stalled at iteration {iterations} with residual {:.3e}",
                    f.amax()
                );
                break;
            };

            x = next_x;
            f = next_f;
            iterations += 1;
            converged = f.amax() < self.tolerance;
            debug!(
                "newton iteration {iterations}: residual {:.3e}, step {lambda}",
                f.amax()
            );
        }

        let residual_norm = f.amax();
        Ok(RootSolution {
            x,
            residuals: f,
            residual_norm,
            iterations,
            evaluations,
            converged,
        })
    }
}

/// Evaluates the system, mapping infeasible points and non-finite output to `None`.
fn evaluate<F>(system: &mut F, x: &DVector<f64>) -> Result<Option<DVector<f64>>>
where
    F: FnMut(&DVector<f64>) -> Result<DVector<f64>>,
{
    match system(x) {
        Ok(f) if all_finite(&f) => Ok(Some(f)),
        Ok(_) => Ok(None),
        Err(error) if error.is_infeasible_point() => Ok(None),
        Err(error) => Err(error),
    }
}

fn all_finite(v: &DVector<f64>) -> bool {
    v.iter().all(|value| value.is_finite())
}
