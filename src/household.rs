//! Household side of the OLG model: lifetime allocations and their FOC residuals.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};
use crate::model::{Feasibility, HouseholdParameters, LaborDisutility, LaborSign};

/// Lifetime savings and labor profile of one cohort.
///
/// `savings[s]` is the stock of assets entering period `s`, so `savings[0]` is
/// always zero (households are born without assets). Savings carried out of the
/// last period are implicitly zero (no bequests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CohortFields")]
pub struct CohortPath {
    savings: DVector<f64>,
    labor: DVector<f64>,
}

/// Unvalidated wire form of [`CohortPath`].
#[derive(Deserialize)]
struct CohortFields {
    savings: DVector<f64>,
    labor: DVector<f64>,
}

impl TryFrom<CohortFields> for CohortPath {
    type Error = SolverError;

    fn try_from(fields: CohortFields) -> Result<Self> {
        Self::new(fields.savings, fields.labor)
    }
}

impl CohortPath {
    /// Creates a profile after validating lengths and the zero initial wealth.
    pub fn new(savings: DVector<f64>, labor: DVector<f64>) -> Result<Self> {
        if labor.len() < 2 {
            return Err(SolverError::dimension_mismatch("cohort periods", 2, labor.len()));
        }
        if savings.len() != labor.len() {
            return Err(SolverError::dimension_mismatch(
                "savings length",
                labor.len(),
                savings.len(),
            ));
        }
        if savings[0] != 0.0 {
            return Err(SolverError::invalid_parameter("initial savings", savings[0]));
        }
        Ok(Self { savings, labor })
    }

    /// Profile with constant savings after birth and constant labor.
    pub fn uniform(periods: usize, savings: f64, labor: f64) -> Result<Self> {
        let mut b = DVector::from_element(periods, savings);
        if periods > 0 {
            b[0] = 0.0;
        }
        Self::new(b, DVector::from_element(periods, labor))
    }

    /// Rebuilds a profile from the solver's unknowns `(b[1..S], n[0..S])`.
    pub fn from_unknowns(unknowns: &DVector<f64>, periods: usize) -> Result<Self> {
        let expected = (2 * periods).saturating_sub(1);
        if periods < 2 || unknowns.len() != expected {
            return Err(SolverError::dimension_mismatch(
                "unknown vector length",
                expected,
                unknowns.len(),
            ));
        }
        let mut savings = DVector::zeros(periods);
        savings
            .rows_mut(1, periods - 1)
            .copy_from(&unknowns.rows(0, periods - 1));
        let labor = unknowns.rows(periods - 1, periods).into_owned();
        Ok(Self { savings, labor })
    }

    /// Flattens the free choices into `(b[1..S], n[0..S])`, length `2S - 1`.
    pub fn to_unknowns(&self) -> DVector<f64> {
        let periods = self.periods();
        let mut unknowns = DVector::zeros(2 * periods - 1);
        unknowns
            .rows_mut(0, periods - 1)
            .copy_from(&self.savings.rows(1, periods - 1));
        unknowns
            .rows_mut(periods - 1, periods)
            .copy_from(&self.labor);
        unknowns
    }

    /// Number of life periods `S`.
    pub fn periods(&self) -> usize {
        self.labor.len()
    }

    /// Savings entering each period.
    pub fn savings(&self) -> &DVector<f64> {
        &self.savings
    }

    /// Labor supplied in each period.
    pub fn labor(&self) -> &DVector<f64> {
        &self.labor
    }

    /// True when every free choice is zero; the Euler system is singular there.
    pub fn is_degenerate(&self) -> bool {
        self.savings.iter().skip(1).all(|b| *b == 0.0) && self.labor.iter().all(|n| *n == 0.0)
    }
}

/// Consumption from the budget identity `c[s] = (1 + r[s]) b[s] + w n[s] - b[s+1]`
/// with `b[S] = 0`. No feasibility policy is applied.
pub fn consumption(rates: &[f64], wage: f64, cohort: &CohortPath) -> Result<DVector<f64>> {
    let periods = cohort.periods();
    if rates.len() != periods {
        return Err(SolverError::dimension_mismatch(
            "interest rate path",
            periods,
            rates.len(),
        ));
    }
    let b = cohort.savings();
    let n = cohort.labor();
    Ok(DVector::from_fn(periods, |s, _| {
        let next = if s + 1 < periods { b[s + 1] } else { 0.0 };
        (1.0 + rates[s]) * b[s] + wage * n[s] - next
    }))
}

/// Marginal disutility of labor (negative for interior `n`):
/// `-chi * (b / l) * (n / l)^(nu - 1) * (1 - (n / l)^nu)^((1 - nu) / nu)`.
pub fn marginal_disutility(labor: f64, weight: f64, disutility: &LaborDisutility) -> f64 {
    let endowment = disutility.endowment;
    let nu = disutility.curvature;
    let ratio = labor / endowment;
    -(weight * (disutility.scale / endowment))
        * ratio.powf(nu - 1.0)
        * (1.0 - ratio.powf(nu)).powf((1.0 - nu) / nu)
}

/// Derivative of [`marginal_disutility`] with respect to labor:
/// `-chi * (b / l^2) * (nu - 1) * (n / l)^(nu - 2) * (1 - (n / l)^nu)^((1 - 2 nu) / nu)`.
pub fn marginal_disutility_slope(labor: f64, weight: f64, disutility: &LaborDisutility) -> f64 {
    let endowment = disutility.endowment;
    let nu = disutility.curvature;
    let ratio = labor / endowment;
    -(weight * disutility.scale / (endowment * endowment))
        * (nu - 1.0)
        * ratio.powf(nu - 2.0)
        * (1.0 - ratio.powf(nu)).powf((1.0 - 2.0 * nu) / nu)
}

/// Euler-equation and labor-supply residuals of a cohort, length `2S - 1`.
///
/// Entries `[0, S - 1)` hold `mu_c[s] - beta (1 + r[s]) mu_c[s + 1]`; entries
/// `[S - 1, 2S - 1)` hold `w mu_c[s] +/- mu_n[s]` depending on
/// [`LaborSign`]. Infeasible consumption or labor is handled by the household's
/// [`Feasibility`] policy.
pub fn residuals(
    rates: &[f64],
    wage: f64,
    cohort: &CohortPath,
    household: &HouseholdParameters,
) -> Result<DVector<f64>> {
    let periods = cohort.periods();
    if household.periods() != periods {
        return Err(SolverError::dimension_mismatch(
            "labor weights length",
            periods,
            household.periods(),
        ));
    }
    let raw = consumption(rates, wage, cohort)?;

    let sigma = household.risk_aversion;
    let beta = household.discount_factor;
    let disutility = &household.labor;
    let mut mu_c = Vec::with_capacity(periods);
    let mut mu_n = Vec::with_capacity(periods);

    for s in 0..periods {
        mu_c.push(marginal_utility(s, raw[s], sigma, household.feasibility)?);
        mu_n.push(labor_marginal(
            s,
            cohort.labor()[s],
            household.labor_weights[s],
            disutility,
            household.feasibility,
        )?);
    }

    let mut errors = DVector::zeros(2 * periods - 1);
    for s in 0..periods - 1 {
        errors[s] = mu_c[s] - beta * (1.0 + rates[s]) * mu_c[s + 1];
    }
    let offset = periods - 1;
    for s in 0..periods {
        errors[offset + s] = match household.labor_sign {
            LaborSign::Plus => wage * mu_c[s] + mu_n[s],
            LaborSign::Minus => wage * mu_c[s] - mu_n[s],
        };
    }

    if errors.iter().any(|e| e.is_nan()) {
        return Err(SolverError::NumericalError {
            context: "household residuals",
        });
    }
    Ok(errors)
}

fn marginal_utility(
    period: usize,
    consumption: f64,
    risk_aversion: f64,
    policy: Feasibility,
) -> Result<f64> {
    match policy {
        Feasibility::Reject if consumption > 0.0 => Ok(consumption.powf(-risk_aversion)),
        Feasibility::Reject => Err(SolverError::InfeasibleConsumption {
            period,
            consumption,
        }),
        Feasibility::Penalize { .. } if consumption.is_nan() => Err(SolverError::NumericalError {
            context: "consumption",
        }),
        Feasibility::Penalize { floor } if consumption < floor => {
            // Tangent line of c^(-sigma) at the floor.
            let at_floor = floor.powf(-risk_aversion);
            let slope = -risk_aversion * floor.powf(-risk_aversion - 1.0);
            Ok(at_floor + slope * (consumption - floor))
        }
        Feasibility::Penalize { .. } => Ok(consumption.powf(-risk_aversion)),
    }
}

fn labor_marginal(
    period: usize,
    labor: f64,
    weight: f64,
    disutility: &LaborDisutility,
    policy: Feasibility,
) -> Result<f64> {
    let endowment = disutility.endowment;
    match policy {
        Feasibility::Reject if labor > 0.0 && labor < endowment => {
            Ok(marginal_disutility(labor, weight, disutility))
        }
        Feasibility::Reject => Err(SolverError::InfeasibleLabor {
            period,
            labor,
            endowment,
        }),
        Feasibility::Penalize { .. } if labor.is_nan() => Err(SolverError::NumericalError {
            context: "labor supply",
        }),
        Feasibility::Penalize { floor } => {
            let edge = labor.clamp(floor, endowment - floor);
            let at_edge = marginal_disutility(edge, weight, disutility);
            if edge == labor {
                Ok(at_edge)
            } else {
                let slope = marginal_disutility_slope(edge, weight, disutility);
                Ok(at_edge + slope * (labor - edge))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    /// Two-period household at a known optimum. Savings come from the Euler
    /// equation `c0 = (beta (1 + r))^(-1/sigma) c1` combined with both budget
    /// constraints; the labor weights are backed out so that both intratemporal
    /// conditions hold at the chosen hours.
    fn two_period_optimum() -> (Vec<f64>, f64, CohortPath, HouseholdParameters) {
        let (r, w, beta, sigma): (f64, f64, f64, f64) = (0.05, 1.0, 0.96, 2.0);
        let (n0, n1) = (0.5, 0.4);
        let k = (beta * (1.0 + r)).powf(-1.0 / sigma);
        let b1 = (w * n0 - k * w * n1) / (1.0 + k * (1.0 + r));
        let c0 = w * n0 - b1;
        let c1 = (1.0 + r) * b1 + w * n1;

        let disutility = LaborDisutility::default();
        let unit_weight = |n: f64| -marginal_disutility(n, 1.0, &disutility);
        let chi = vec![
            w * c0.powf(-sigma) / unit_weight(n0),
            w * c1.powf(-sigma) / unit_weight(n1),
        ];

        let household = HouseholdParameters::new(2, beta, sigma)
            .with_labor_weights(chi)
            .with_feasibility(Feasibility::Reject);
        let cohort = CohortPath::new(
            DVector::from_vec(vec![0.0, b1]),
            DVector::from_vec(vec![n0, n1]),
        )
        .unwrap();
        (vec![r, r], w, cohort, household)
    }

    #[test]
    fn residuals_vanish_at_two_period_optimum() {
        let (rates, wage, cohort, household) = two_period_optimum();
        let errors = residuals(&rates, wage, &cohort, &household).unwrap();
        assert_eq!(errors.len(), 3);
        for error in errors.iter() {
            assert_relative_eq!(*error, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn residual_length_is_two_s_minus_one() {
        for periods in 2..=7 {
            let household = HouseholdParameters::new(periods, 0.9, 1.5);
            let cohort = CohortPath::uniform(periods, 0.05, 0.3).unwrap();
            let rates = vec![0.04; periods];
            let errors = residuals(&rates, 1.0, &cohort, &household).unwrap();
            assert_eq!(errors.len(), 2 * periods - 1);
        }
    }

    #[test]
    fn labor_sign_only_changes_intratemporal_block() {
        let periods = 4;
        let cohort = CohortPath::uniform(periods, 0.1, 0.4).unwrap();
        let rates = vec![0.03; periods];
        let plus = HouseholdParameters::new(periods, 0.9, 1.5);
        let minus = plus.clone().with_labor_sign(LaborSign::Minus);

        let e_plus = residuals(&rates, 0.9, &cohort, &plus).unwrap();
        let e_minus = residuals(&rates, 0.9, &cohort, &minus).unwrap();

        for s in 0..periods - 1 {
            assert_eq!(e_plus[s], e_minus[s]);
        }
        for s in 0..periods {
            let mu_n = marginal_disutility(0.4, 1.0, &plus.labor);
            assert!(mu_n < 0.0);
            assert_relative_eq!(
                e_plus[periods - 1 + s] - e_minus[periods - 1 + s],
                2.0 * mu_n,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn reject_policy_reports_non_positive_consumption() {
        let periods = 3;
        // Saving more than lifetime earnings drives first-period consumption negative.
        let cohort = CohortPath::new(
            DVector::from_vec(vec![0.0, 2.0, 0.1]),
            DVector::from_element(periods, 0.3),
        )
        .unwrap();
        let household =
            HouseholdParameters::new(periods, 0.9, 1.5).with_feasibility(Feasibility::Reject);
        let result = residuals(&[0.05; 3], 1.0, &cohort, &household);
        assert!(matches!(
            result,
            Err(SolverError::InfeasibleConsumption { period: 0, .. })
        ));

        let overworked = CohortPath::uniform(periods, 0.0, 1.2).unwrap();
        let result = residuals(&[0.05; 3], 1.0, &overworked, &household);
        assert!(matches!(
            result,
            Err(SolverError::InfeasibleLabor { period: 0, .. })
        ));
    }

    #[test]
    fn penalty_policy_returns_large_finite_residuals() {
        let periods = 3;
        let cohort = CohortPath::new(
            DVector::from_vec(vec![0.0, 2.0, 0.1]),
            DVector::from_vec(vec![0.3, 1.2, -0.5]),
        )
        .unwrap();
        let household = HouseholdParameters::new(periods, 0.9, 1.5)
            .with_feasibility(Feasibility::Penalize { floor: 1e-4 });
        let errors = residuals(&[0.05; 3], 1.0, &cohort, &household).unwrap();

        assert!(errors.iter().all(|e| e.is_finite()));
        // mu_c at the floor is 1e-4^(-1.5) = 1e6.
        assert!(errors[0] > 1e5);
    }

    #[test]
    fn penalty_keeps_growing_with_the_violation() {
        let periods = 3;
        let household = HouseholdParameters::new(periods, 0.9, 1.5);
        let rates = [0.05; 3];

        let shallow = CohortPath::uniform(periods, 0.5, -0.5).unwrap();
        let deep = CohortPath::uniform(periods, 0.5, -0.9).unwrap();
        let e_shallow = residuals(&rates, 1.0, &shallow, &household).unwrap();
        let e_deep = residuals(&rates, 1.0, &deep, &household).unwrap();
        for s in 0..periods {
            assert!(e_deep[periods - 1 + s] > e_shallow[periods - 1 + s]);
        }

        let labor = DVector::from_element(periods, 0.3);
        let overdrawn = |b1: f64| {
            let cohort = CohortPath::new(DVector::from_vec(vec![0.0, b1, 0.1]), labor.clone())
                .unwrap();
            residuals(&rates, 1.0, &cohort, &household).unwrap()[0]
        };
        assert!(overdrawn(3.0) > overdrawn(2.0));

        let overworked = CohortPath::uniform(periods, 0.0, 1.5).unwrap();
        let more = CohortPath::uniform(periods, 0.0, 2.0).unwrap();
        let e_over = residuals(&rates, 1.0, &overworked, &household).unwrap();
        let e_more = residuals(&rates, 1.0, &more, &household).unwrap();
        assert!(e_more[periods - 1] < e_over[periods - 1]);
    }

    #[test]
    fn penalty_is_continuous_at_the_floor() {
        let household = HouseholdParameters::new(2, 0.9, 1.5);
        let floor = 1e-4;
        let inside = marginal_utility(0, floor, 1.5, household.feasibility).unwrap();
        let below = marginal_utility(0, floor - 1e-12, 1.5, household.feasibility).unwrap();
        assert_relative_eq!(inside, below, max_relative = 1e-6);

        let disutility = LaborDisutility::default();
        let edge = labor_marginal(0, floor, 1.0, &disutility, household.feasibility).unwrap();
        let past = labor_marginal(0, floor - 1e-12, 1.0, &disutility, household.feasibility)
            .unwrap();
        assert_relative_eq!(edge, past, max_relative = 1e-6);
    }

    #[test]
    fn disutility_slope_matches_finite_difference() {
        let disutility = LaborDisutility::default();
        for n in [1e-3, 0.3, 0.9] {
            let h = 1e-6 * n;
            let numeric = (marginal_disutility(n + h, 0.7, &disutility)
                - marginal_disutility(n - h, 0.7, &disutility))
                / (2.0 * h);
            assert_relative_eq!(
                marginal_disutility_slope(n, 0.7, &disutility),
                numeric,
                max_relative = 1e-5
            );
        }
    }

    #[test]
    fn deserialization_validates_the_profile() {
        let cohort = CohortPath::uniform(3, 0.1, 0.3).unwrap();
        let json = serde_json::to_string(&cohort).unwrap();
        let loaded: CohortPath = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, cohort);

        let short_savings = r#"{"savings":[[0.0,0.1],2,null],"labor":[[0.3,0.3,0.3],3,null]}"#;
        assert!(serde_json::from_str::<CohortPath>(short_savings).is_err());

        let endowed = r#"{"savings":[[0.5,0.1,0.1],3,null],"labor":[[0.3,0.3,0.3],3,null]}"#;
        assert!(serde_json::from_str::<CohortPath>(endowed).is_err());
    }

    #[test]
    fn unknown_vector_round_trips_through_cohort_layout() {
        let unknowns = DVector::from_vec(vec![0.1, 0.2, 0.5, 0.6, 0.7]);
        let cohort = CohortPath::from_unknowns(&unknowns, 3).unwrap();
        assert_eq!(cohort.savings().as_slice(), &[0.0, 0.1, 0.2]);
        assert_eq!(cohort.labor().as_slice(), &[0.5, 0.6, 0.7]);
        assert_eq!(cohort.to_unknowns(), unknowns);

        assert!(CohortPath::uniform(4, 0.0, 0.0).unwrap().is_degenerate());
        assert!(CohortPath::from_unknowns(&unknowns, 4).is_err());
    }
}
