use thiserror::Error;

/// Unified error type for `dynecon` solvers.
#[derive(Debug, Error)]
pub enum SolverError {
    /// Raised when provided samples or vectors have incompatible lengths.
    #[error("dimension mismatch in {context}: expected {expected} but found {found}")]
    DimensionMismatch {
        /// Human-readable context describing the operation.
        context: &'static str,
        /// The required length, usually implied by the grid or cohort size.
        expected: usize,
        /// The length that was actually supplied.
        found: usize,
    },

    /// Raised when a grid point leaves no room for a strictly interior control.
    #[error("state {state} at grid index {index} is too small for a search margin of {epsilon}")]
    InfeasibleState {
        index: usize,
        state: f64,
        epsilon: f64,
    },

    /// Raised when a price or aggregate lies outside the domain of the firm's FOCs.
    #[error("domain error in {context}: {value} is not admissible")]
    DomainError { context: &'static str, value: f64 },

    /// Raised when a candidate allocation implies non-positive consumption.
    #[error("consumption in period {period} must be positive, found {consumption}")]
    InfeasibleConsumption { period: usize, consumption: f64 },

    /// Raised when labor supply leaves the open interval `(0, l_tilde)`.
    #[error("labor supply in period {period} must lie in (0, {endowment}), found {labor}")]
    InfeasibleLabor {
        period: usize,
        labor: f64,
        endowment: f64,
    },

    /// Raised when the initial household allocation is identically zero.
    #[error("initial guess for savings and labor must not be all zeros")]
    DegenerateGuess,

    /// Raised when a model or solver parameter is outside its admissible range.
    #[error("parameter `{name}` is invalid: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    /// Raised when linear algebra operations encounter a singular system.
    #[error("matrix in {context} is singular")]
    SingularMatrix { context: &'static str },

    /// Raised when numerical routines produce NaN.
    #[error("encountered NaN during {context}")]
    NumericalError { context: &'static str },
}

impl SolverError {
    /// Helper to format a [`DimensionMismatch`](SolverError::DimensionMismatch) error.
    pub fn dimension_mismatch(context: &'static str, expected: usize, found: usize) -> Self {
        Self::DimensionMismatch {
            context,
            expected,
            found,
        }
    }

    /// Helper to raise when an argument falls outside the firm's domain.
    pub fn domain(context: &'static str, value: f64) -> Self {
        Self::DomainError { context, value }
    }

    /// Helper for rejecting out-of-range parameters.
    pub fn invalid_parameter(name: &'static str, value: f64) -> Self {
        Self::InvalidParameter { name, value }
    }

    /// Helper to raise when a matrix factorization fails due to singularity.
    pub fn singular(context: &'static str) -> Self {
        Self::SingularMatrix { context }
    }

    /// Returns true for errors that describe an infeasible trial point rather than
    /// a malformed problem. Root finders treat these as rejected steps.
    pub fn is_infeasible_point(&self) -> bool {
        matches!(
            self,
            Self::DomainError { .. }
                | Self::InfeasibleConsumption { .. }
                | Self::InfeasibleLabor { .. }
                | Self::NumericalError { .. }
        )
    }
}

/// Type alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, SolverError>;
