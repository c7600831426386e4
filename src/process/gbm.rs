use super::StochasticProcess1D;
use crate::common::{Real, Time};
use crate::{error::PricingResult, require};

/// Geometric Brownian motion dS = μ S dt + σ S dW on the price itself.
#[derive(Debug, Clone)]
pub struct GeometricBrownianMotion {
    x0: Real,
    mu: Real,
    sigma: Real,
}

impl GeometricBrownianMotion {
    pub fn new(x0: Real, mu: Real, sigma: Real) -> PricingResult<Self> {
        require!(x0 > 0.0, "initial value ({x0}) must be positive");
        require!(sigma >= 0.0, "volatility ({sigma}) must be non-negative");
        Ok(Self { x0, mu, sigma })
    }
}

impl StochasticProcess1D for GeometricBrownianMotion {
    fn x0(&self) -> Real {
        self.x0
    }

    fn drift(&self, _t: Time, x: Real) -> Real {
        self.mu * x
    }

    fn diffusion(&self, _t: Time, x: Real) -> Real {
        self.sigma * x
    }
}

/// Black-Scholes dynamics on the cumulated log-return x = ln(S/S₀), with
/// deterministic short rate r(t), dividend yield q(t) and volatility σ(t).
///
/// The log-state has Gaussian transitions, so `evolve` is exact for flat
/// coefficients and uses per-step freezing otherwise.
pub struct BlackScholesProcess {
    spot: Real,
    rate: Box<dyn Fn(Time) -> Real>,
    dividend: Box<dyn Fn(Time) -> Real>,
    volatility: Box<dyn Fn(Time) -> Real>,
}

impl BlackScholesProcess {
    pub fn new(
        spot: Real,
        rate: impl Fn(Time) -> Real + 'static,
        dividend: impl Fn(Time) -> Real + 'static,
        volatility: impl Fn(Time) -> Real + 'static,
    ) -> PricingResult<Self> {
        require!(spot > 0.0, "spot ({spot}) must be positive");
        Ok(Self {
            spot,
            rate: Box::new(rate),
            dividend: Box::new(dividend),
            volatility: Box::new(volatility),
        })
    }

    pub fn flat(spot: Real, r: Real, q: Real, sigma: Real) -> PricingResult<Self> {
        require!(sigma >= 0.0, "volatility ({sigma}) must be non-negative");
        Self::new(spot, move |_| r, move |_| q, move |_| sigma)
    }

    pub fn spot(&self) -> Real {
        self.spot
    }

    /// Price corresponding to a log-return state.
    pub fn price_from_state(&self, x: Real) -> Real {
        self.spot * x.exp()
    }
}

impl StochasticProcess1D for BlackScholesProcess {
    fn x0(&self) -> Real {
        0.0
    }

    fn drift(&self, t: Time, _x: Real) -> Real {
        let sigma = (self.volatility)(t);
        (self.rate)(t) - (self.dividend)(t) - 0.5 * sigma * sigma
    }

    fn diffusion(&self, t: Time, _x: Real) -> Real {
        (self.volatility)(t)
    }

    fn expectation(&self, t0: Time, x0: Real, dt: Time) -> Real {
        x0 + self.drift(t0, x0) * dt
    }

    fn std_deviation(&self, t0: Time, x0: Real, dt: Time) -> Real {
        self.diffusion(t0, x0) * dt.sqrt()
    }
}
