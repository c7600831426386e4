//! Black-76 pricing helpers.
//!
//! These are the workhorses behind the smile machinery, the calibration
//! helpers and the test scaffolding. Prices are quoted per unit notional
//! on the forward; pass `discount` to deflate.

use crate::{
    error::PricingResult,
    math::distributions::{d_plus_minus, normal_cdf, normal_pdf},
    require,
    solver::{Brent, Objective, Solver1D},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    fn sign(&self) -> f64 {
        match self {
            OptionType::Call => 1.0,
            OptionType::Put => -1.0,
        }
    }
}

/// Undiscounted Black price of a European option on a forward.
///
/// `stddev` is the total standard deviation of log-returns, i.e. σ√T.
pub fn black_formula(
    option_type: OptionType,
    strike: f64,
    forward: f64,
    stddev: f64,
    discount: f64,
) -> PricingResult<f64> {
    require!(strike >= 0.0, "strike ({strike}) must be non-negative");
    require!(forward > 0.0, "forward ({forward}) must be positive");
    require!(stddev >= 0.0, "stddev ({stddev}) must be non-negative");
    require!(discount > 0.0, "discount ({discount}) must be positive");

    let omega = option_type.sign();
    if stddev == 0.0 || strike == 0.0 {
        return Ok(discount * (omega * (forward - strike)).max(0.0));
    }
    let (d1, d2) = d_plus_minus(forward, strike, stddev);
    Ok(discount * omega * (forward * normal_cdf(omega * d1) - strike * normal_cdf(omega * d2)))
}

/// Derivative of the Black price with respect to the total standard
/// deviation.
pub fn black_vega(strike: f64, forward: f64, stddev: f64, discount: f64) -> f64 {
    if stddev == 0.0 || strike == 0.0 {
        return 0.0;
    }
    let (d1, _) = d_plus_minus(forward, strike, stddev);
    discount * forward * normal_pdf(d1)
}

/// Derivative of the Black call price with respect to the strike;
/// its negative is the undiscounted digital price.
pub fn black_strike_derivative(
    option_type: OptionType,
    strike: f64,
    forward: f64,
    stddev: f64,
    discount: f64,
) -> f64 {
    if stddev == 0.0 || strike == 0.0 {
        let intrinsic = option_type.sign() * (forward - strike);
        return if intrinsic > 0.0 {
            -option_type.sign() * discount
        } else {
            0.0
        };
    }
    let (_, d2) = d_plus_minus(forward, strike, stddev);
    match option_type {
        OptionType::Call => -discount * normal_cdf(d2),
        OptionType::Put => discount * normal_cdf(-d2),
    }
}

/// Total standard deviation implied by a Black price, found by Brent
/// search over [1e-7, 10].
pub fn black_implied_stddev(
    option_type: OptionType,
    strike: f64,
    forward: f64,
    price: f64,
    discount: f64,
) -> PricingResult<f64> {
    require!(price >= 0.0, "price ({price}) must be non-negative");
    let intrinsic = (option_type.sign() * (forward - strike)).max(0.0) * discount;
    require!(
        price >= intrinsic,
        "price ({price}) below intrinsic value ({intrinsic})"
    );

    let objective = |stddev: f64| {
        black_formula(option_type, strike, forward, stddev, discount)
            .expect("inputs validated above")
            - price
    };
    // Brenner-Subrahmanyam style seed.
    let guess = (price / discount / forward * 2.5066282746310002).clamp(1e-5, 4.0);
    let solver = Brent::default();
    solver.solve_bracketed(&Objective(objective), 1e-12, guess.clamp(1e-7, 10.0), 1e-7, 10.0)
}
