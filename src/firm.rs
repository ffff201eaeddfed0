//! Factor prices implied by the representative firm's first-order conditions.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};
use crate::model::FirmParameters;

/// Interest rate and wage consistent with a capital/labor pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceVector {
    pub rate: f64,
    pub wage: f64,
}

/// Net interest rate `r = alpha * A * (L / K)^(1 - alpha) - delta`.
pub fn rate(capital: f64, labor: f64, firm: &FirmParameters) -> Result<f64> {
    if !(capital > 0.0) {
        return Err(SolverError::domain("aggregate capital", capital));
    }
    if !(labor > 0.0) {
        return Err(SolverError::domain("aggregate labor", labor));
    }
    let alpha = firm.capital_share;
    Ok(alpha * firm.productivity * (labor / capital).powf(1.0 - alpha) - firm.depreciation)
}

/// Wage consistent with the rate `r`:
/// `w = (1 - alpha) * A * (alpha * A / (r + delta))^(alpha / (1 - alpha))`.
pub fn wage(rate: f64, firm: &FirmParameters) -> Result<f64> {
    let rental = rate + firm.depreciation;
    if !(rental > 0.0) {
        return Err(SolverError::domain("rental rate of capital", rental));
    }
    let alpha = firm.capital_share;
    let a = firm.productivity;
    Ok((1.0 - alpha) * a * (alpha * a / rental).powf(alpha / (1.0 - alpha)))
}

/// Both factor prices for the aggregates `(K, L)`.
pub fn prices(capital: f64, labor: f64, firm: &FirmParameters) -> Result<PriceVector> {
    let rate = rate(capital, labor, firm)?;
    let wage = wage(rate, firm)?;
    Ok(PriceVector { rate, wage })
}

/// Aggregate capital supply: the sum of savings across cohorts.
pub fn aggregate_capital(savings: &[f64]) -> f64 {
    savings.iter().sum()
}

/// Aggregate labor supply: the sum of hours across cohorts.
pub fn aggregate_labor(labor: &[f64]) -> f64 {
    labor.iter().sum()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn prices_match_closed_form() {
        let firm = FirmParameters::new(0.3, 0.1, 1.0).unwrap();
        let r = rate(10.0, 5.0, &firm).unwrap();
        // 0.3 * 0.5^0.7 - 0.1
        assert_relative_eq!(r, 0.084_671_7, epsilon = 1e-6);
        assert_relative_eq!(r, 0.3 * 0.5_f64.powf(0.7) - 0.1, epsilon = 1e-14);

        // The marginal product of labor at (K, L) is (1 - alpha) * A * (K / L)^alpha.
        let w = wage(r, &firm).unwrap();
        assert_relative_eq!(w, 0.7 * 2.0_f64.powf(0.3), epsilon = 1e-12);
        assert_relative_eq!(w, 0.861_801, epsilon = 1e-6);

        let both = prices(10.0, 5.0, &firm).unwrap();
        assert_eq!(both, PriceVector { rate: r, wage: w });
    }

    #[test]
    fn rejects_non_positive_aggregates() {
        let firm = FirmParameters::default();
        assert!(matches!(
            rate(0.0, 1.0, &firm),
            Err(SolverError::DomainError { .. })
        ));
        assert!(matches!(
            rate(1.0, -2.0, &firm),
            Err(SolverError::DomainError { .. })
        ));
        assert!(matches!(
            wage(-0.1, &firm),
            Err(SolverError::DomainError { .. })
        ));
    }

    #[test]
    fn aggregates_sum_profiles() {
        assert_eq!(aggregate_capital(&[0.0, 0.5, 1.5]), 2.0);
        assert_eq!(aggregate_labor(&[0.25, 0.25]), 0.5);
    }
}
