use super::smile::SmileSection;
use crate::common::{Real, Time, Volatility};
use crate::math::optimization::{EndCriteria, LevenbergMarquardt};
use crate::{error::PricingResult, require};

/// SABR parameter set (lognormal-vol quoting).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SabrParameters {
    pub alpha: Real,
    pub beta: Real,
    pub nu: Real,
    pub rho: Real,
}

impl SabrParameters {
    pub fn validate(&self) -> PricingResult<()> {
        require!(self.alpha > 0.0, "alpha ({}) must be positive", self.alpha);
        require!(
            (0.0..=1.0).contains(&self.beta),
            "beta ({}) must be in [0, 1]",
            self.beta
        );
        require!(self.nu >= 0.0, "nu ({}) must be non-negative", self.nu);
        require!(
            self.rho > -1.0 && self.rho < 1.0,
            "rho ({}) must be in (-1, 1)",
            self.rho
        );
        Ok(())
    }
}

/// Hagan's 2002 lognormal SABR volatility approximation.
pub fn sabr_volatility(
    strike: Real,
    forward: Real,
    expiry: Time,
    params: &SabrParameters,
) -> Volatility {
    let SabrParameters {
        alpha,
        beta,
        nu,
        rho,
    } = *params;
    let one_minus_beta = 1.0 - beta;
    let fk_pow = (forward * strike).powf(0.5 * one_minus_beta);
    let log_fk = (forward / strike).ln();

    let a_term = 1.0
        + (one_minus_beta * one_minus_beta / 24.0 * alpha * alpha / (fk_pow * fk_pow)
            + 0.25 * rho * beta * nu * alpha / fk_pow
            + (2.0 - 3.0 * rho * rho) / 24.0 * nu * nu)
            * expiry;

    if log_fk.abs() < 1e-10 {
        return alpha / forward.powf(one_minus_beta) * a_term;
    }

    let denominator = fk_pow
        * (1.0
            + one_minus_beta * one_minus_beta / 24.0 * log_fk * log_fk
            + one_minus_beta.powi(4) / 1920.0 * log_fk.powi(4));
    let z = nu / alpha * fk_pow * log_fk;
    let x = (((1.0 - 2.0 * rho * z + z * z).sqrt() + z - rho) / (1.0 - rho)).ln();
    let z_over_x = if z.abs() < 1e-10 { 1.0 } else { z / x };
    alpha / denominator * z_over_x * a_term
}

/// Calibrates SABR to quoted (strike, vol) pairs by Levenberg-Marquardt,
/// optionally with β pinned. The initial guess is caller supplied.
pub fn sabr_calibrate(
    strikes: &[Real],
    vols: &[Volatility],
    forward: Real,
    expiry: Time,
    guess: SabrParameters,
    fixed_beta: bool,
) -> PricingResult<SabrParameters> {
    require!(
        strikes.len() == vols.len() && strikes.len() >= 3,
        "need at least three (strike, vol) quotes, got {}",
        strikes.len()
    );
    guess.validate()?;

    // Unconstrained reparametrization: α = eᵃ, ν = eⁿ, ρ = tanh(r),
    // β = sigmoid when free.
    let to_params = move |x: &[f64]| -> SabrParameters {
        SabrParameters {
            alpha: x[0].exp(),
            beta: if fixed_beta {
                guess.beta
            } else {
                1.0 / (1.0 + (-x[3]).exp())
            },
            nu: x[1].exp(),
            rho: x[2].tanh(),
        }
    };

    let strikes = strikes.to_vec();
    let vols = vols.to_vec();
    let mut problem = move |x: &[f64]| -> PricingResult<Vec<f64>> {
        let p = to_params(x);
        Ok(strikes
            .iter()
            .zip(&vols)
            .map(|(&k, &v)| sabr_volatility(k, forward, expiry, &p) - v)
            .collect())
    };

    let mut initial = vec![
        guess.alpha.ln(),
        guess.nu.max(1e-4).ln(),
        guess.rho.atanh(),
    ];
    if !fixed_beta {
        let b = guess.beta.clamp(0.01, 0.99);
        initial.push((b / (1.0 - b)).ln());
    }

    let lm = LevenbergMarquardt::default();
    let result = lm.minimize(&mut problem, &initial, &EndCriteria::default())?;
    let calibrated = to_params(&result.parameters);
    calibrated.validate()?;
    Ok(calibrated)
}

/// Smile section generated by a SABR parameter set.
#[derive(Debug, Clone)]
pub struct SabrSmileSection {
    exercise_time: Time,
    forward: Real,
    params: SabrParameters,
}

impl SabrSmileSection {
    pub fn new(exercise_time: Time, forward: Real, params: SabrParameters) -> PricingResult<Self> {
        require!(exercise_time > 0.0, "exercise time must be positive");
        require!(forward > 0.0, "forward must be positive");
        params.validate()?;
        Ok(Self {
            exercise_time,
            forward,
            params,
        })
    }

    pub fn params(&self) -> &SabrParameters {
        &self.params
    }
}

impl SmileSection for SabrSmileSection {
    fn exercise_time(&self) -> Time {
        self.exercise_time
    }

    fn atm_level(&self) -> Real {
        self.forward
    }

    fn volatility(&self, strike: Real) -> PricingResult<Volatility> {
        Ok(sabr_volatility(
            strike.max(1e-8),
            self.forward,
            self.exercise_time,
            &self.params,
        ))
    }
}
