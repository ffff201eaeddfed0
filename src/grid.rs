//! State-space grids over which value and policy functions are sampled.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};

/// Ordered, strictly increasing sample points of the continuous state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct StateGrid {
    nodes: Vec<f64>,
}

impl StateGrid {
    /// Builds `size` evenly spaced points over `[lower, upper]`, endpoints included.
    pub fn linspace(lower: f64, upper: f64, size: usize) -> Result<Self> {
        if size < 2 {
            return Err(SolverError::dimension_mismatch("grid size", 2, size));
        }
        if !lower.is_finite() {
            return Err(SolverError::invalid_parameter("grid lower bound", lower));
        }
        if !upper.is_finite() || upper <= lower {
            return Err(SolverError::invalid_parameter("grid upper bound", upper));
        }

        let step = (upper - lower) / (size - 1) as f64;
        let mut nodes: Vec<f64> = (0..size).map(|i| lower + step * i as f64).collect();
        // Pin the last node so rounding never pushes it past the bound.
        nodes[size - 1] = upper;
        Self::from_nodes(nodes)
    }

    /// Wraps an arbitrary strictly increasing set of nodes.
    pub fn from_nodes(nodes: Vec<f64>) -> Result<Self> {
        if nodes.len() < 2 {
            return Err(SolverError::dimension_mismatch("grid size", 2, nodes.len()));
        }
        for (index, node) in nodes.iter().enumerate() {
            if !node.is_finite() {
                return Err(SolverError::NumericalError {
                    context: "grid validation",
                });
            }
            if index > 0 && *node <= nodes[index - 1] {
                return Err(SolverError::invalid_parameter(
                    "grid node (must be strictly increasing)",
                    *node,
                ));
            }
        }
        Ok(Self { nodes })
    }

    /// Number of grid points.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Grids always hold at least two points; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Smallest node.
    pub fn lower(&self) -> f64 {
        self.nodes[0]
    }

    /// Largest node.
    pub fn upper(&self) -> f64 {
        self.nodes[self.nodes.len() - 1]
    }

    /// Returns a read-only view of the nodes.
    pub fn nodes(&self) -> &[f64] {
        &self.nodes
    }

    /// Iterates over the nodes in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.nodes.iter()
    }

    /// Index of the interval `[x_i, x_{i+1}]` used to evaluate a piecewise
    /// function at `x`. Points outside the grid map onto the end intervals.
    pub fn interval_of(&self, x: f64) -> usize {
        let last = self.nodes.len() - 2;
        let upper = self.nodes.partition_point(|node| *node <= x);
        upper.saturating_sub(1).min(last)
    }
}

impl std::ops::Index<usize> for StateGrid {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.nodes[index]
    }
}

impl TryFrom<Vec<f64>> for StateGrid {
    type Error = SolverError;

    fn try_from(value: Vec<f64>) -> Result<Self> {
        Self::from_nodes(value)
    }
}

impl From<StateGrid> for Vec<f64> {
    fn from(value: StateGrid) -> Self {
        value.nodes
    }
}
