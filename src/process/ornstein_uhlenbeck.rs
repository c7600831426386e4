use super::StochasticProcess1D;
use crate::common::{Real, Time};
use crate::{error::PricingResult, require};

/// Ornstein-Uhlenbeck process dx = a (θ(t) − x) dt + σ dW with an
/// externally supplied, possibly time-dependent reversion level.
///
/// Transitions are Gaussian, so the conditional moments are exact; for a
/// time-dependent level the level is frozen at the end of the step.
pub struct OrnsteinUhlenbeck {
    x0: Real,
    speed: Real,
    sigma: Real,
    level: Box<dyn Fn(Time) -> Real>,
}

impl OrnsteinUhlenbeck {
    pub fn new(
        x0: Real,
        speed: Real,
        sigma: Real,
        level: impl Fn(Time) -> Real + 'static,
    ) -> PricingResult<Self> {
        require!(speed >= 0.0, "reversion speed ({speed}) must be non-negative");
        require!(sigma >= 0.0, "volatility ({sigma}) must be non-negative");
        Ok(Self {
            x0,
            speed,
            sigma,
            level: Box::new(level),
        })
    }

    pub fn with_constant_level(
        x0: Real,
        speed: Real,
        sigma: Real,
        level: Real,
    ) -> PricingResult<Self> {
        Self::new(x0, speed, sigma, move |_| level)
    }

    pub fn speed(&self) -> Real {
        self.speed
    }

    pub fn sigma(&self) -> Real {
        self.sigma
    }
}

impl StochasticProcess1D for OrnsteinUhlenbeck {
    fn x0(&self) -> Real {
        self.x0
    }

    fn drift(&self, t: Time, x: Real) -> Real {
        self.speed * ((self.level)(t) - x)
    }

    fn diffusion(&self, _t: Time, _x: Real) -> Real {
        self.sigma
    }

    fn expectation(&self, t0: Time, x0: Real, dt: Time) -> Real {
        let theta = (self.level)(t0 + dt);
        theta + (x0 - theta) * (-self.speed * dt).exp()
    }

    fn std_deviation(&self, t0: Time, x0: Real, dt: Time) -> Real {
        self.variance(t0, x0, dt).sqrt()
    }

    fn variance(&self, _t0: Time, _x0: Real, dt: Time) -> Real {
        if self.speed < 1e-10 {
            // Brownian limit of the exact variance.
            self.sigma * self.sigma * dt
        } else {
            self.sigma * self.sigma / (2.0 * self.speed)
                * (1.0 - (-2.0 * self.speed * dt).exp())
        }
    }
}
