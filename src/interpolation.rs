//! Cubic-spline interpolation of functions sampled on a [`StateGrid`].
//!
//! The Bellman operator evaluates the continuation value at arbitrary
//! investment levels, including levels below the smallest grid node. The
//! interpolant therefore never refuses a query: outside the grid the cubic of
//! the nearest end interval is extended.
//!
//! End conditions follow the usual `interp1d(kind = "cubic")` convention:
//! not-a-knot when at least four nodes are available, natural for three nodes,
//! and plain linear interpolation for two.

use crate::error::{Result, SolverError};
use crate::grid::StateGrid;

/// Piecewise cubic interpolant through `(grid[i], values[i])`.
#[derive(Clone, Debug)]
pub struct GridInterpolant {
    grid: StateGrid,
    values: Vec<f64>,
    /// Second derivatives of the spline at each node.
    curvature: Vec<f64>,
}

impl GridInterpolant {
    /// Fits the spline; fails when the sample length differs from the grid.
    pub fn new(grid: &StateGrid, values: &[f64]) -> Result<Self> {
        if values.len() != grid.len() {
            return Err(SolverError::dimension_mismatch(
                "interpolant sample length",
                grid.len(),
                values.len(),
            ));
        }
        if values.iter().any(|value| !value.is_finite()) {
            return Err(SolverError::NumericalError {
                context: "interpolant sample",
            });
        }

        let curvature = spline_curvature(grid.nodes(), values)?;
        Ok(Self {
            grid: grid.clone(),
            values: values.to_vec(),
            curvature,
        })
    }

    /// Evaluates the interpolant at any real `x`.
    pub fn evaluate(&self, x: f64) -> f64 {
        let i = self.grid.interval_of(x);
        let (x0, x1) = (self.grid[i], self.grid[i + 1]);
        let (y0, y1) = (self.values[i], self.values[i + 1]);
        let (m0, m1) = (self.curvature[i], self.curvature[i + 1]);

        let h = x1 - x0;
        let a = x1 - x;
        let b = x - x0;
        if b == 0.0 {
            return y0;
        }
        if a == 0.0 {
            return y1;
        }

        m0 * a.powi(3) / (6.0 * h)
            + m1 * b.powi(3) / (6.0 * h)
            + (y0 / h - m0 * h / 6.0) * a
            + (y1 / h - m1 * h / 6.0) * b
    }

    /// First derivative of the interpolant at `x`.
    pub fn derivative(&self, x: f64) -> f64 {
        let i = self.grid.interval_of(x);
        let (x0, x1) = (self.grid[i], self.grid[i + 1]);
        let (y0, y1) = (self.values[i], self.values[i + 1]);
        let (m0, m1) = (self.curvature[i], self.curvature[i + 1]);

        let h = x1 - x0;
        let a = x1 - x;
        let b = x - x0;
        -m0 * a * a / (2.0 * h) + m1 * b * b / (2.0 * h) - (y0 / h - m0 * h / 6.0)
            + (y1 / h - m1 * h / 6.0)
    }

    /// Grid the interpolant was fitted on.
    pub fn grid(&self) -> &StateGrid {
        &self.grid
    }

    /// Sampled values at the grid nodes.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Solves for the nodal second derivatives of the spline.
fn spline_curvature(x: &[f64], y: &[f64]) -> Result<Vec<f64>> {
    let n = x.len();
    let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let slope = |i: usize| (y[i + 1] - y[i]) / h[i];

    match n {
        2 => return Ok(vec![0.0; 2]),
        3 => {
            let m1 = 6.0 * (slope(1) - slope(0)) / (2.0 * (h[0] + h[1]));
            return Ok(vec![0.0, m1, 0.0]);
        }
        _ => {}
    }

    // Unknowns are M_1..M_{n-2}; M_0 and M_{n-1} are eliminated through the
    // not-a-knot conditions at x_1 and x_{n-2}.
    let m = n - 2;
    let mut lower = vec![0.0; m];
    let mut diag = vec![0.0; m];
    let mut upper = vec![0.0; m];
    let mut rhs = vec![0.0; m];
    for k in 0..m {
        let i = k + 1;
        lower[k] = h[i - 1];
        diag[k] = 2.0 * (h[i - 1] + h[i]);
        upper[k] = h[i];
        rhs[k] = 6.0 * (slope(i) - slope(i - 1));
    }

    let (h0, h1) = (h[0], h[1]);
    diag[0] = 3.0 * h0 + 2.0 * h1 + h0 * h0 / h1;
    upper[0] = h1 - h0 * h0 / h1;

    let (ha, hb) = (h[n - 3], h[n - 2]);
    lower[m - 1] = ha - hb * hb / ha;
    diag[m - 1] = 2.0 * ha + 3.0 * hb + hb * hb / ha;

    let interior = solve_tridiagonal(&lower, &diag, &upper, &rhs)?;

    let mut curvature = Vec::with_capacity(n);
    let left_ratio = h0 / h1;
    curvature.push(interior[0] * (1.0 + left_ratio) - left_ratio * interior[1]);
    curvature.extend_from_slice(&interior);
    let right_ratio = hb / ha;
    curvature.push(interior[m - 1] * (1.0 + right_ratio) - right_ratio * interior[m - 2]);
    Ok(curvature)
}

/// Thomas algorithm for a tridiagonal system.
fn solve_tridiagonal(lower: &[f64], diag: &[f64], upper: &[f64], rhs: &[f64]) -> Result<Vec<f64>> {
    let m = diag.len();
    let mut c_prime = vec![0.0; m];
    let mut d_prime = vec![0.0; m];

    if diag[0] == 0.0 {
        return Err(SolverError::singular("spline system"));
    }
    c_prime[0] = upper[0] / diag[0];
    d_prime[0] = rhs[0] / diag[0];
    for k in 1..m {
        let denom = diag[k] - lower[k] * c_prime[k - 1];
        if denom == 0.0 {
            return Err(SolverError::singular("spline system"));
        }
        c_prime[k] = upper[k] / denom;
        d_prime[k] = (rhs[k] - lower[k] * d_prime[k - 1]) / denom;
    }

    let mut solution = vec![0.0; m];
    solution[m - 1] = d_prime[m - 1];
    for k in (0..m - 1).rev() {
        solution[k] = d_prime[k] - c_prime[k] * solution[k + 1];
    }
    Ok(solution)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn reproduces_samples_at_nodes() {
        let grid = StateGrid::from_nodes(vec![0.1, 0.3, 0.35, 0.9, 1.4, 2.0]).unwrap();
        let values: Vec<f64> = grid.iter().map(|x| x.ln() * 3.0 - x).collect();
        let interp = GridInterpolant::new(&grid, &values).unwrap();

        for (node, value) in grid.iter().zip(values.iter()) {
            assert_eq!(interp.evaluate(*node), *value);
        }
    }

    #[test]
    fn not_a_knot_reproduces_cubics_inside_and_outside() {
        let cubic = |x: f64| 2.0 * x.powi(3) - x * x + 0.5 * x - 4.0;
        let grid = StateGrid::linspace(0.0, 3.0, 7).unwrap();
        let values: Vec<f64> = grid.iter().map(|x| cubic(*x)).collect();
        let interp = GridInterpolant::new(&grid, &values).unwrap();

        for x in [-1.0, 0.25, 1.7, 2.95, 4.5] {
            assert_relative_eq!(interp.evaluate(x), cubic(x), epsilon = 1e-9);
        }
        assert_relative_eq!(interp.derivative(1.2), 6.0 * 1.44 - 2.4 + 0.5, epsilon = 1e-9);
    }

    #[test]
    fn two_points_interpolate_linearly() {
        let grid = StateGrid::linspace(1.0, 2.0, 2).unwrap();
        let interp = GridInterpolant::new(&grid, &[1.0, 3.0]).unwrap();
        assert_relative_eq!(interp.evaluate(1.5), 2.0, epsilon = 1e-12);
        assert_relative_eq!(interp.evaluate(0.0), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn extrapolation_is_finite_for_log_samples() {
        let grid = StateGrid::linspace(0.4, 2.0, 500).unwrap();
        let values: Vec<f64> = grid.iter().map(|x| x.ln()).collect();
        let interp = GridInterpolant::new(&grid, &values).unwrap();
        let below = interp.evaluate(1e-6);
        assert!(below.is_finite());
        assert!(interp.evaluate(2.5).is_finite());
    }

    #[test]
    fn rejects_non_finite_samples() {
        let grid = StateGrid::linspace(0.0, 1.0, 4).unwrap();
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let result = GridInterpolant::new(&grid, &[0.0, bad, 2.0, 3.0]);
            assert!(matches!(result, Err(SolverError::NumericalError { .. })));
        }
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let grid = StateGrid::linspace(0.0, 1.0, 4).unwrap();
        let result = GridInterpolant::new(&grid, &[0.0, 1.0, 2.0]);
        assert!(matches!(
            result,
            Err(SolverError::DimensionMismatch {
                expected: 4,
                found: 3,
                ..
            })
        ));
    }
}
