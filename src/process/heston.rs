use super::StochasticProcess;
use crate::common::{Real, Time};
use crate::{error::PricingResult, require};
use tracing::warn;

/// Heston stochastic-volatility dynamics on (ln S, v):
///
///   d ln S = (μ − v/2) dt + √v dW₁
///   dv     = κ (θ − v) dt + σᵥ √v dW₂,   corr(dW₁, dW₂) = ρ
///
/// The variance step uses full truncation, so a discretized variance may
/// touch zero but never drives the square root negative.
#[derive(Debug, Clone)]
pub struct Heston {
    spot: Real,
    v0: Real,
    mu: Real,
    kappa: Real,
    theta: Real,
    vol_of_vol: Real,
    rho: Real,
}

impl Heston {
    pub fn new(
        spot: Real,
        v0: Real,
        mu: Real,
        kappa: Real,
        theta: Real,
        vol_of_vol: Real,
        rho: Real,
    ) -> PricingResult<Self> {
        require!(spot > 0.0, "spot ({spot}) must be positive");
        require!(v0 >= 0.0, "initial variance ({v0}) must be non-negative");
        require!(kappa > 0.0, "mean reversion ({kappa}) must be positive");
        require!(theta >= 0.0, "long-run variance ({theta}) must be non-negative");
        require!(vol_of_vol >= 0.0, "vol-of-vol ({vol_of_vol}) must be non-negative");
        require!((-1.0..=1.0).contains(&rho), "correlation ({rho}) must be in [-1, 1]");
        if 2.0 * kappa * theta < vol_of_vol * vol_of_vol {
            warn!(
                feller = 2.0 * kappa * theta,
                vol_of_vol_squared = vol_of_vol * vol_of_vol,
                "Feller condition violated; discretized variance will hit zero"
            );
        }
        Ok(Self {
            spot,
            v0,
            mu,
            kappa,
            theta,
            vol_of_vol,
            rho,
        })
    }

    pub fn spot(&self) -> Real {
        self.spot
    }

    pub fn price_from_state(&self, x: &[Real]) -> Real {
        x[0].exp()
    }
}

impl StochasticProcess for Heston {
    fn size(&self) -> usize {
        2
    }

    fn initial_values(&self) -> Vec<Real> {
        vec![self.spot.ln(), self.v0]
    }

    fn drift(&self, _t: Time, x: &[Real]) -> Vec<Real> {
        let v = x[1].max(0.0);
        vec![self.mu - 0.5 * v, self.kappa * (self.theta - v)]
    }

    fn evolve(&self, _t0: Time, x0: &[Real], dt: Time, dw: &[Real]) -> Vec<Real> {
        let v_plus = x0[1].max(0.0);
        let sqrt_v_dt = (v_plus * dt).sqrt();
        // Correlate the spot draw with the variance draw.
        let dw_s = self.rho * dw[1] + (1.0 - self.rho * self.rho).sqrt() * dw[0];
        let log_spot = x0[0] + (self.mu - 0.5 * v_plus) * dt + sqrt_v_dt * dw_s;
        let v = x0[1] + self.kappa * (self.theta - v_plus) * dt
            + self.vol_of_vol * sqrt_v_dt * dw[1];
        vec![log_spot, v]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process() -> Heston {
        Heston::new(100.0, 0.04, 0.05, 2.0, 0.04, 0.3, -0.7).unwrap()
    }

    #[test]
    fn deterministic_step_matches_drift() {
        let p = process();
        let x0 = p.initial_values();
        let x1 = p.evolve(0.0, &x0, 0.01, &[0.0, 0.0]);
        let drift = p.drift(0.0, &x0);
        assert!((x1[0] - (x0[0] + drift[0] * 0.01)).abs() < 1e-14);
        assert!((x1[1] - (x0[1] + drift[1] * 0.01)).abs() < 1e-14);
    }

    #[test]
    fn truncation_keeps_the_square_root_real() {
        let p = process();
        let x = p.evolve(0.0, &[100.0f64.ln(), -0.01], 0.01, &[1.0, -1.0]);
        assert!(x.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn parameter_validation() {
        assert!(Heston::new(100.0, 0.04, 0.0, -1.0, 0.04, 0.3, 0.0).is_err());
        assert!(Heston::new(100.0, 0.04, 0.0, 1.0, 0.04, 0.3, 1.5).is_err());
    }
}
