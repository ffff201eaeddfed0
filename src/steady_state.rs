//! Steady state of the OLG economy.
//!
//! A steady state is a lifetime savings/labor profile together with prices such
//! that (a) the profile satisfies every household FOC at those prices and (b)
//! the prices are the firm's FOC prices at the aggregates implied by the
//! profile.

use log::{debug, info, warn};
use nalgebra::DVector;

use crate::error::{Result, SolverError};
use crate::firm::{self, PriceVector};
use crate::household::{self, CohortPath};
use crate::model::OlgParameters;
use crate::options::{SteadyStateMethod, SteadyStateOptions};
use crate::solving::{RootFinder, RootSolution};

/// Outcome of a steady-state solve.
///
/// `success` mirrors the root finder's convergence flag; when it is false the
/// remaining fields describe the last iterate.
#[derive(Clone, Debug)]
pub struct SteadyState {
    /// Net interest rate `r*`.
    pub rate: f64,
    pub wage: f64,
    /// Aggregate capital `K* = sum(b)`.
    pub capital: f64,
    /// Aggregate labor `L* = sum(n)`.
    pub labor: f64,
    pub success: bool,
    /// Household FOC residuals at the reported profile, length `2S - 1`.
    pub euler_errors: DVector<f64>,
    /// Maximum absolute entry of `euler_errors`.
    pub residual_norm: f64,
    pub cohort: CohortPath,
    pub consumption: DVector<f64>,
    /// Newton steps (joint) or rate updates (price iteration).
    pub iterations: usize,
}

/// Solves for the steady state with the root finder configured in `options`.
pub fn solve(
    rate_guess: f64,
    guess: &CohortPath,
    params: &OlgParameters,
    options: &SteadyStateOptions,
) -> Result<SteadyState> {
    solve_with(rate_guess, guess, params, options, &options.newton)
}

/// Solves for the steady state with a caller-supplied root finder.
///
/// In joint mode `rate_guess` is only checked for finiteness: prices are a
/// function of the allocation at every trial point.
pub fn solve_with<R: RootFinder>(
    rate_guess: f64,
    guess: &CohortPath,
    params: &OlgParameters,
    options: &SteadyStateOptions,
    root_finder: &R,
) -> Result<SteadyState> {
    params.validate()?;
    let periods = params.periods();
    if guess.periods() != periods {
        return Err(SolverError::dimension_mismatch(
            "initial cohort periods",
            periods,
            guess.periods(),
        ));
    }
    if guess.is_degenerate() {
        return Err(SolverError::DegenerateGuess);
    }
    if !rate_guess.is_finite() {
        return Err(SolverError::invalid_parameter("rate guess", rate_guess));
    }

    match options.method {
        SteadyStateMethod::Joint => solve_joint(guess, params, root_finder),
        SteadyStateMethod::PriceIteration { damping } => {
            solve_price_iteration(rate_guess, damping, guess, params, options, root_finder)
        }
    }
}

/// Prices implied by the aggregates of a cohort profile.
pub fn market_prices(cohort: &CohortPath, params: &OlgParameters) -> Result<PriceVector> {
    let capital = firm::aggregate_capital(cohort.savings().as_slice());
    let labor = firm::aggregate_labor(cohort.labor().as_slice());
    firm::prices(capital, labor, &params.firm)
}

fn solve_joint<R: RootFinder>(
    guess: &CohortPath,
    params: &OlgParameters,
    root_finder: &R,
) -> Result<SteadyState> {
    let periods = params.periods();
    let system = |unknowns: &DVector<f64>| -> Result<DVector<f64>> {
        let cohort = CohortPath::from_unknowns(unknowns, periods)?;
        let prices = market_prices(&cohort, params)?;
        household::residuals(
            &vec![prices.rate; periods],
            prices.wage,
            &cohort,
            &params.household,
        )
    };

    let root = root_finder.find_root(system, guess.to_unknowns())?;
    let cohort = CohortPath::from_unknowns(&root.x, periods)?;
    let prices = market_prices(&cohort, params)?;
    if root.converged {
        info!(
            "steady state found after {} newton steps: r = {:.6}",
            root.iterations, prices.rate
        );
    } else {
        warn!(
            "steady state solver did not converge (residual {:.3e})",
            root.residual_norm
        );
    }
    summarize(cohort, prices, root.converged, root.iterations, root)
}

fn solve_price_iteration<R: RootFinder>(
    rate_guess: f64,
    damping: f64,
    guess: &CohortPath,
    params: &OlgParameters,
    options: &SteadyStateOptions,
    root_finder: &R,
) -> Result<SteadyState> {
    if !(damping > 0.0 && damping <= 1.0) {
        return Err(SolverError::invalid_parameter("damping", damping));
    }

    let periods = params.periods();
    let max_outer = options.max_outer_iterations.max(1);
    let mut rate = rate_guess;
    let mut unknowns = guess.to_unknowns();

    let mut outer = 0usize;
    loop {
        outer += 1;
        let wage = firm::wage(rate, &params.firm)?;
        let rates = vec![rate; periods];
        let household_system = |x: &DVector<f64>| -> Result<DVector<f64>> {
            let cohort = CohortPath::from_unknowns(x, periods)?;
            household::residuals(&rates, wage, &cohort, &params.household)
        };
        let root = root_finder.find_root(household_system, unknowns)?;
        unknowns = root.x.clone();

        let cohort = CohortPath::from_unknowns(&unknowns, periods)?;
        let capital = firm::aggregate_capital(cohort.savings().as_slice());
        let labor = firm::aggregate_labor(cohort.labor().as_slice());
        let implied = firm::rate(capital, labor, &params.firm)?;
        let gap = (implied - rate).abs();
        debug!("price iteration {outer}: r = {rate:.8}, implied r = {implied:.8}, gap {gap:.3e}");

        let finished = gap < options.outer_tolerance && root.converged;
        if finished {
            info!("steady state found after {outer} rate updates: r = {rate:.6}");
        } else if outer >= max_outer {
            warn!("rate iteration did not converge after {outer} updates (gap {gap:.3e})");
        }
        if finished || outer >= max_outer {
            return summarize(cohort, PriceVector { rate, wage }, finished, outer, root);
        }

        rate = damping * implied + (1.0 - damping) * rate;
    }
}

fn summarize(
    cohort: CohortPath,
    prices: PriceVector,
    success: bool,
    iterations: usize,
    root: RootSolution,
) -> Result<SteadyState> {
    let periods = cohort.periods();
    let consumption = household::consumption(&vec![prices.rate; periods], prices.wage, &cohort)?;
    Ok(SteadyState {
        rate: prices.rate,
        wage: prices.wage,
        capital: firm::aggregate_capital(cohort.savings().as_slice()),
        labor: firm::aggregate_labor(cohort.labor().as_slice()),
        success,
        euler_errors: root.residuals,
        residual_norm: root.residual_norm,
        cohort,
        consumption,
        iterations,
    })
}
