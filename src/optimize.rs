//! Bounded, derivative-free scalar maximization.
//!
//! The Bellman operator only needs "give me the best control in `[lower, upper]`
//! and tell me whether you converged", so solvers are abstracted behind
//! [`ScalarMaximizer`]. Two implementations are provided: Brent's bounded
//! method (parabolic interpolation with golden-section fallback) and a plain
//! golden-section search.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};

/// `(3 - √5) / 2`, the fraction of the bracket used by golden-section steps.
const GOLDEN_MEAN: f64 = 0.381_966_011_250_105_1;

/// Result of a bounded scalar search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScalarOptimum {
    /// Location of the best point found.
    pub x: f64,
    /// Objective value at `x`.
    pub value: f64,
    /// Number of objective evaluations performed.
    pub evaluations: usize,
    /// Whether the bracket shrank below tolerance before the evaluation cap.
    pub converged: bool,
}

/// Capability shared by bounded scalar maximizers.
pub trait ScalarMaximizer: Sync {
    /// Maximizes `objective` over `[lower, upper]`.
    ///
    /// NaN objective values are treated as negative infinity.
    fn maximize<F>(&self, objective: F, lower: f64, upper: f64) -> Result<ScalarOptimum>
    where
        F: Fn(f64) -> f64;
}

/// Brent's bounded minimization applied to the negated objective.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrentMaximizer {
    /// Absolute tolerance on the location of the optimum.
    pub x_tolerance: f64,
    /// Maximum number of objective evaluations.
    pub max_evaluations: usize,
}

impl Default for BrentMaximizer {
    fn default() -> Self {
        Self {
            x_tolerance: 1e-5,
            max_evaluations: 500,
        }
    }
}

impl BrentMaximizer {
    /// Overrides the location tolerance.
    pub fn with_x_tolerance(mut self, x_tolerance: f64) -> Self {
        self.x_tolerance = x_tolerance;
        self
    }

    /// Overrides the evaluation cap (at least one evaluation is always made).
    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.max_evaluations = max_evaluations.max(1);
        self
    }
}

impl ScalarMaximizer for BrentMaximizer {
    fn maximize<F>(&self, objective: F, lower: f64, upper: f64) -> Result<ScalarOptimum>
    where
        F: Fn(f64) -> f64,
    {
        validate_bracket(lower, upper)?;
        let cost = |x: f64| negated(&objective, x);
        let sqrt_eps = f64::EPSILON.sqrt();

        let (mut a, mut b) = (lower, upper);
        let mut fulc = a + GOLDEN_MEAN * (b - a);
        let mut nfc = fulc;
        let mut xf = fulc;
        let mut rat = 0.0_f64;
        let mut e = 0.0_f64;
        let mut fx = cost(xf);
        let mut evaluations = 1usize;
        let mut ffulc = fx;
        let mut fnfc = fx;
        let mut xm = 0.5 * (a + b);
        let mut tol1 = sqrt_eps * xf.abs() + self.x_tolerance / 3.0;
        let mut tol2 = 2.0 * tol1;
        let mut converged = true;

        while (xf - xm).abs() > tol2 - 0.5 * (b - a) {
            let mut golden = true;

            if e.abs() > tol1 {
                golden = false;
                let mut r = (xf - nfc) * (fx - ffulc);
                let mut q = (xf - fulc) * (fx - fnfc);
                let mut p = (xf - fulc) * q - (xf - nfc) * r;
                q = 2.0 * (q - r);
                if q > 0.0 {
                    p = -p;
                }
                q = q.abs();
                r = e;
                e = rat;

                if p.abs() < (0.5 * q * r).abs() && p > q * (a - xf) && p < q * (b - xf) {
                    rat = p / q;
                    let x = xf + rat;
                    if (x - a) < tol2 || (b - x) < tol2 {
                        rat = tol1 * signum_or_one(xm - xf);
                    }
                } else {
                    golden = true;
                }
            }

            if golden {
                e = if xf >= xm { a - xf } else { b - xf };
                rat = GOLDEN_MEAN * e;
            }

            let x = xf + signum_or_one(rat) * rat.abs().max(tol1);
            let fu = cost(x);
            evaluations += 1;

            if fu <= fx {
                if x >= xf {
                    a = xf;
                } else {
                    b = xf;
                }
                fulc = nfc;
                ffulc = fnfc;
                nfc = xf;
                fnfc = fx;
                xf = x;
                fx = fu;
            } else {
                if x < xf {
                    a = x;
                } else {
                    b = x;
                }
                if fu <= fnfc || nfc == xf {
                    fulc = nfc;
                    ffulc = fnfc;
                    nfc = x;
                    fnfc = fu;
                } else if fu <= ffulc || fulc == xf || fulc == nfc {
                    fulc = x;
                    ffulc = fu;
                }
            }

            xm = 0.5 * (a + b);
            tol1 = sqrt_eps * xf.abs() + self.x_tolerance / 3.0;
            tol2 = 2.0 * tol1;

            if evaluations >= self.max_evaluations {
                converged = false;
                break;
            }
        }

        Ok(ScalarOptimum {
            x: xf,
            value: -fx,
            evaluations,
            converged,
        })
    }
}

/// Golden-section search over a fixed bracket.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoldenSection {
    /// Bracket width at which the search stops.
    pub x_tolerance: f64,
    /// Maximum number of bracket reductions.
    pub max_iterations: usize,
}

impl Default for GoldenSection {
    fn default() -> Self {
        Self {
            x_tolerance: 1e-8,
            max_iterations: 200,
        }
    }
}

impl ScalarMaximizer for GoldenSection {
    fn maximize<F>(&self, objective: F, lower: f64, upper: f64) -> Result<ScalarOptimum>
    where
        F: Fn(f64) -> f64,
    {
        validate_bracket(lower, upper)?;
        let cost = |x: f64| negated(&objective, x);

        let (mut left, mut right) = (lower, upper);
        let mut inner_left = left + GOLDEN_MEAN * (right - left);
        let mut inner_right = right - GOLDEN_MEAN * (right - left);
        let mut cost_left = cost(inner_left);
        let mut cost_right = cost(inner_right);
        let mut evaluations = 2usize;
        let mut iterations = 0usize;

        while right - left > self.x_tolerance && iterations < self.max_iterations {
            if cost_left <= cost_right {
                right = inner_right;
                inner_right = inner_left;
                cost_right = cost_left;
                inner_left = left + GOLDEN_MEAN * (right - left);
                cost_left = cost(inner_left);
            } else {
                left = inner_left;
                inner_left = inner_right;
                cost_left = cost_right;
                inner_right = right - GOLDEN_MEAN * (right - left);
                cost_right = cost(inner_right);
            }
            evaluations += 1;
            iterations += 1;
        }

        let (x, best) = if cost_left <= cost_right {
            (inner_left, cost_left)
        } else {
            (inner_right, cost_right)
        };
        Ok(ScalarOptimum {
            x,
            value: -best,
            evaluations,
            converged: right - left <= self.x_tolerance,
        })
    }
}

fn validate_bracket(lower: f64, upper: f64) -> Result<()> {
    if !lower.is_finite() {
        return Err(SolverError::invalid_parameter("search lower bound", lower));
    }
    if !upper.is_finite() || upper <= lower {
        return Err(SolverError::invalid_parameter("search upper bound", upper));
    }
    Ok(())
}

fn negated<F: Fn(f64) -> f64>(objective: &F, x: f64) -> f64 {
    let value = objective(x);
    if value.is_nan() {
        f64::INFINITY
    } else {
        -value
    }
}

fn signum_or_one(value: f64) -> f64 {
    if value < 0.0 {
        -1.0
    } else {
        1.0
    }
}
