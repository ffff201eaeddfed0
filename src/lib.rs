//! Fixed-point solvers for small dynamic economic models.
//!
//! The crate covers two problems that share the same numerical toolkit:
//!
//! - a stochastic investment problem solved by value function iteration
//!   (`bellman` and `vfi` modules) on a one-dimensional state grid with
//!   cubic-spline continuation values (`grid`, `interpolation`), plus
//!   Monte Carlo simulation of the resulting policy (`simulation`);
//! - the steady state of an overlapping-generations economy with endogenous
//!   labor supply (`firm`, `household`, `steady_state`), found with a damped
//!   Newton root finder (`solving`).
//!
//! Scalar maximization (`optimize`) and root finding (`solving`) sit behind
//! traits so alternative algorithms can be plugged into both solvers.
//!
//! # Quick start
//!
//! ```no_run
//! use dynecon::{
//!     steady_state, vfi, CohortPath, ModelParameters, OlgParameters, StateGrid,
//!     SteadyStateOptions, VfiOptions,
//! };
//!
//! let grid = StateGrid::linspace(0.4, 2.0, 500).expect("valid grid");
//! let params = ModelParameters::default();
//! let solution = vfi::solve(&grid, &params, &VfiOptions::default()).expect("solved");
//! println!("converged after {} iterations", solution.iterations);
//!
//! let olg = OlgParameters::default();
//! let guess = CohortPath::uniform(olg.periods(), 0.05, 0.3).expect("valid guess");
//! let ss = steady_state::solve(0.1, &guess, &olg, &SteadyStateOptions::default())
//!     .expect("well-posed economy");
//! println!("r* = {:.4}, K* = {:.3}, L* = {:.3}", ss.rate, ss.capital, ss.labor);
//! ```
//!
//! Parameters and options derive `serde` traits, so calibrations can be kept in
//! JSON files and loaded with any serde format crate.

pub mod bellman;
pub mod error;
pub mod firm;
pub mod grid;
pub mod household;
pub mod interpolation;
pub mod model;
pub mod optimize;
pub mod options;
pub mod simulation;
pub mod solving;
pub mod steady_state;
pub mod vfi;

pub use error::SolverError;
pub use grid::StateGrid;
pub use household::CohortPath;
pub use interpolation::GridInterpolant;
pub use model::{ModelParameters, OlgParameters, ShockRegime};
pub use optimize::{BrentMaximizer, ScalarMaximizer};
pub use options::{BellmanOptions, SteadyStateMethod, SteadyStateOptions, VfiOptions};
pub use solving::{NewtonSolver, RootFinder};
pub use steady_state::SteadyState;
pub use vfi::VfiSolution;
