//! Parameter records for the single-agent investment problem and the OLG economy.
//!
//! Every record is immutable once validated and is passed explicitly into the
//! solvers; nothing here is global.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};

/// Direction of the shock realised in the first period.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShockRegime {
    Good,
    Bad,
}

/// Shock magnitude together with the two continuation probabilities.
///
/// The probabilities are taken as given: they are not required to sum to one
/// and are never renormalized.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShockDistribution {
    pub magnitude: f64,
    pub probability_high: f64,
    pub probability_low: f64,
}

impl ShockDistribution {
    pub fn new(magnitude: f64, probability_high: f64, probability_low: f64) -> Self {
        Self {
            magnitude,
            probability_high,
            probability_low,
        }
    }

    /// Weights applied by the Bellman objective:
    /// `(current utility, first continuation term, second continuation term)`.
    pub fn objective_weights(&self) -> (f64, f64, f64) {
        (self.magnitude, self.probability_high, self.probability_low)
    }

    /// Sum of the two continuation weights.
    pub fn continuation_weight(&self) -> f64 {
        self.probability_high + self.probability_low
    }
}

/// Shock distributions for both regimes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShockTable {
    pub good: ShockDistribution,
    pub bad: ShockDistribution,
}

impl Default for ShockTable {
    fn default() -> Self {
        Self {
            good: ShockDistribution::new(1.2, 0.7, 0.3),
            bad: ShockDistribution::new(0.8, 0.4, 0.6),
        }
    }
}

impl ShockTable {
    /// Distribution for the given regime.
    pub fn get(&self, regime: ShockRegime) -> &ShockDistribution {
        match regime {
            ShockRegime::Good => &self.good,
            ShockRegime::Bad => &self.bad,
        }
    }
}

/// Period whose consumption enters the per-period utility.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    /// `c = s - I`: what is left after investing.
    ///
    /// The optimal investment is then a fraction of the state, so near the
    /// lower end of the grid it falls below the smallest node and the
    /// continuation value is read off the extrapolated end cubic. On grids
    /// such as `[0.4, 2.0]` value function iteration does not settle in this
    /// mode; use a lower bound well below the states of interest.
    Decision,
    /// `c = r * I`: the gross return on the investment.
    Continuation,
}

/// Parameters of the stochastic investment problem.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    /// Discount factor `beta` in `(0, 1)`.
    pub discount_factor: f64,
    /// Coefficient of relative risk aversion `sigma > 0`.
    pub risk_aversion: f64,
    /// Gross portfolio return `r > 0`.
    pub gross_return: f64,
    /// Active shock regime.
    pub regime: ShockRegime,
    #[serde(default)]
    pub shocks: ShockTable,
    /// Period evaluated by the current-utility term of the objective.
    #[serde(default = "default_utility_period")]
    pub utility_period: Period,
}

fn default_utility_period() -> Period {
    Period::Continuation
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            discount_factor: 0.95,
            risk_aversion: 1.0,
            gross_return: 1.1,
            regime: ShockRegime::Bad,
            shocks: ShockTable::default(),
            utility_period: Period::Continuation,
        }
    }
}

impl ModelParameters {
    /// Builds validated parameters with the default shock table.
    pub fn new(
        discount_factor: f64,
        risk_aversion: f64,
        gross_return: f64,
        regime: ShockRegime,
    ) -> Result<Self> {
        let params = Self {
            discount_factor,
            risk_aversion,
            gross_return,
            regime,
            ..Self::default()
        };
        params.validate()?;
        Ok(params)
    }

    /// Replaces the shock table.
    pub fn with_shocks(mut self, shocks: ShockTable) -> Self {
        self.shocks = shocks;
        self
    }

    /// Selects the period whose consumption enters current utility.
    pub fn with_utility_period(mut self, period: Period) -> Self {
        self.utility_period = period;
        self
    }

    /// Checks parameter ranges; deserialized records should be validated before use.
    pub fn validate(&self) -> Result<()> {
        let beta = self.discount_factor;
        if !(beta > 0.0 && beta < 1.0) {
            return Err(SolverError::invalid_parameter("discount_factor", beta));
        }
        if !(self.risk_aversion > 0.0) || !self.risk_aversion.is_finite() {
            return Err(SolverError::invalid_parameter(
                "risk_aversion",
                self.risk_aversion,
            ));
        }
        if !(self.gross_return > 0.0) || !self.gross_return.is_finite() {
            return Err(SolverError::invalid_parameter(
                "gross_return",
                self.gross_return,
            ));
        }
        for distribution in [&self.shocks.good, &self.shocks.bad] {
            let (w_u, w_h, w_l) = distribution.objective_weights();
            if !(w_u.is_finite() && w_h.is_finite() && w_l.is_finite()) {
                return Err(SolverError::NumericalError {
                    context: "shock table",
                });
            }
        }
        Ok(())
    }

    /// Distribution of the active regime.
    pub fn shock(&self) -> &ShockDistribution {
        self.shocks.get(self.regime)
    }
}

/// Cobb-Douglas technology of the representative firm.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FirmParameters {
    /// Capital share `alpha` in `(0, 1)`.
    pub capital_share: f64,
    /// Depreciation rate `delta`.
    pub depreciation: f64,
    /// Total factor productivity `A > 0`.
    pub productivity: f64,
}

impl Default for FirmParameters {
    fn default() -> Self {
        Self {
            capital_share: 0.3,
            depreciation: 0.1,
            productivity: 1.0,
        }
    }
}

impl FirmParameters {
    pub fn new(capital_share: f64, depreciation: f64, productivity: f64) -> Result<Self> {
        let params = Self {
            capital_share,
            depreciation,
            productivity,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        let alpha = self.capital_share;
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(SolverError::invalid_parameter("capital_share", alpha));
        }
        if !self.depreciation.is_finite() {
            return Err(SolverError::invalid_parameter(
                "depreciation",
                self.depreciation,
            ));
        }
        if !(self.productivity > 0.0) || !self.productivity.is_finite() {
            return Err(SolverError::invalid_parameter(
                "productivity",
                self.productivity,
            ));
        }
        Ok(())
    }
}

/// Elliptical labor-disutility parameters `(b, l_tilde, nu)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaborDisutility {
    /// Scale of the disutility, `b`.
    pub scale: f64,
    /// Time endowment `l_tilde`; labor must stay inside `(0, l_tilde)`.
    pub endowment: f64,
    /// Curvature `nu`.
    pub curvature: f64,
}

impl Default for LaborDisutility {
    fn default() -> Self {
        Self {
            scale: 0.501,
            endowment: 1.0,
            curvature: 1.554,
        }
    }
}

/// Sign attached to the marginal disutility of labor in the intratemporal FOC.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaborSign {
    /// `w * mu_c + mu_n`, with `mu_n` carrying its own negative sign.
    #[default]
    Plus,
    /// `w * mu_c - mu_n`.
    Minus,
}

/// What the residual evaluator does with an infeasible allocation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feasibility {
    /// Fail with `InfeasibleConsumption` or `InfeasibleLabor`.
    Reject,
    /// Below `floor` (consumption) or outside `[floor, l_tilde - floor]`
    /// (labor) the marginal utilities continue along their tangent line at the
    /// boundary. No fractional power of an infeasible value is taken, and the
    /// residuals keep growing with the size of the violation, so a root finder
    /// still sees a slope pointing back toward feasibility.
    Penalize { floor: f64 },
}

impl Default for Feasibility {
    fn default() -> Self {
        Self::Penalize { floor: 1e-4 }
    }
}

/// Preferences of an OLG household living `S` periods.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HouseholdParameters {
    /// Discount factor `beta`.
    pub discount_factor: f64,
    /// Coefficient of relative risk aversion `sigma`.
    pub risk_aversion: f64,
    /// Age-specific labor disutility weights `chi`, one per period.
    pub labor_weights: Vec<f64>,
    pub labor: LaborDisutility,
    #[serde(default)]
    pub labor_sign: LaborSign,
    #[serde(default)]
    pub feasibility: Feasibility,
}

impl HouseholdParameters {
    /// Household with unit labor weights in every period.
    pub fn new(periods: usize, discount_factor: f64, risk_aversion: f64) -> Self {
        Self {
            discount_factor,
            risk_aversion,
            labor_weights: vec![1.0; periods],
            labor: LaborDisutility::default(),
            labor_sign: LaborSign::default(),
            feasibility: Feasibility::default(),
        }
    }

    /// Number of life periods `S`.
    pub fn periods(&self) -> usize {
        self.labor_weights.len()
    }

    pub fn with_labor_sign(mut self, sign: LaborSign) -> Self {
        self.labor_sign = sign;
        self
    }

    pub fn with_feasibility(mut self, feasibility: Feasibility) -> Self {
        self.feasibility = feasibility;
        self
    }

    pub fn with_labor(mut self, labor: LaborDisutility) -> Self {
        self.labor = labor;
        self
    }

    pub fn with_labor_weights(mut self, labor_weights: Vec<f64>) -> Self {
        self.labor_weights = labor_weights;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.periods() < 2 {
            return Err(SolverError::dimension_mismatch(
                "household periods",
                2,
                self.periods(),
            ));
        }
        let beta = self.discount_factor;
        if !(beta > 0.0) || !beta.is_finite() {
            return Err(SolverError::invalid_parameter("discount_factor", beta));
        }
        if !(self.risk_aversion > 0.0) || !self.risk_aversion.is_finite() {
            return Err(SolverError::invalid_parameter(
                "risk_aversion",
                self.risk_aversion,
            ));
        }
        let labor = &self.labor;
        if !(labor.endowment > 0.0) {
            return Err(SolverError::invalid_parameter("endowment", labor.endowment));
        }
        if !(labor.curvature > 0.0) {
            return Err(SolverError::invalid_parameter("curvature", labor.curvature));
        }
        if let Feasibility::Penalize { floor } = self.feasibility {
            if !(floor > 0.0 && 2.0 * floor < labor.endowment) {
                return Err(SolverError::invalid_parameter("feasibility floor", floor));
            }
        }
        Ok(())
    }
}

/// Full parameterization of the OLG steady-state problem.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OlgParameters {
    pub household: HouseholdParameters,
    pub firm: FirmParameters,
}

impl Default for OlgParameters {
    fn default() -> Self {
        Self {
            household: HouseholdParameters::new(80, 0.8, 1.5),
            firm: FirmParameters::default(),
        }
    }
}

impl OlgParameters {
    /// Number of life periods `S`.
    pub fn periods(&self) -> usize {
        self.household.periods()
    }

    pub fn validate(&self) -> Result<()> {
        self.household.validate()?;
        self.firm.validate()
    }
}
