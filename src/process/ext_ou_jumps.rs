use super::{StochasticProcess, StochasticProcess1D};
use crate::common::{Real, Time};
use crate::math::distributions::normal_cdf;
use crate::process::OrnsteinUhlenbeck;
use crate::{error::PricingResult, require};

/// Ornstein-Uhlenbeck base with an exponentially decaying jump component,
/// the standard spot-power-price model:
///
///   x: OU with its own speed/level/σ
///   y: dy = −β y dt + J dN,  N Poisson(λ), J ~ Exp(η)
///
/// State is (x, y); the observable price factor is x + y. The transition
/// consumes three draws: one Gaussian for the OU part and two mapped to
/// uniforms for jump arrival and jump size, so one step draws at most one
/// jump and steps should stay small relative to 1/λ.
pub struct ExtOuWithJumps {
    ou: OrnsteinUhlenbeck,
    y0: Real,
    beta: Real,
    jump_intensity: Real,
    eta: Real,
}

impl ExtOuWithJumps {
    pub fn new(
        ou: OrnsteinUhlenbeck,
        y0: Real,
        beta: Real,
        jump_intensity: Real,
        eta: Real,
    ) -> PricingResult<Self> {
        require!(beta >= 0.0, "jump decay ({beta}) must be non-negative");
        require!(
            jump_intensity >= 0.0,
            "jump intensity ({jump_intensity}) must be non-negative"
        );
        require!(eta > 0.0, "inverse jump mean ({eta}) must be positive");
        Ok(Self {
            ou,
            y0,
            beta,
            jump_intensity,
            eta,
        })
    }

    pub fn total(&self, x: &[Real]) -> Real {
        x[0] + x[1]
    }
}

impl StochasticProcess for ExtOuWithJumps {
    fn size(&self) -> usize {
        2
    }

    fn factors(&self) -> usize {
        3
    }

    fn initial_values(&self) -> Vec<Real> {
        vec![self.ou.x0(), self.y0]
    }

    fn drift(&self, t: Time, x: &[Real]) -> Vec<Real> {
        vec![self.ou.drift(t, x[0]), -self.beta * x[1]]
    }

    fn evolve(&self, t0: Time, x0: &[Real], dt: Time, dw: &[Real]) -> Vec<Real> {
        let x = self.ou.evolve(t0, x0[0], dt, dw[0]);
        let mut y = x0[1] * (-self.beta * dt).exp();
        if self.jump_intensity > 0.0 {
            // Map the auxiliary Gaussians back to uniforms; exact inverse
            // sampling of arrival and size.
            let u1 = normal_cdf(dw[1]).clamp(f64::EPSILON, 1.0 - f64::EPSILON);
            let interarrival = -u1.ln() / self.jump_intensity;
            if interarrival < dt {
                let u2 = normal_cdf(dw[2]).clamp(f64::EPSILON, 1.0 - f64::EPSILON);
                y += -u2.ln() / self.eta;
            }
        }
        vec![x, y]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{GaussianRng, InverseCumulativeGaussianRng, LecuyerUniformRng};

    fn process(intensity: Real) -> ExtOuWithJumps {
        let ou = OrnsteinUhlenbeck::with_constant_level(3.0, 1.0, 0.2, 3.0).unwrap();
        ExtOuWithJumps::new(ou, 0.0, 5.0, intensity, 4.0).unwrap()
    }

    #[test]
    fn no_jumps_means_pure_decay() {
        let p = process(0.0);
        let x = p.evolve(0.0, &[3.0, 1.0], 0.1, &[0.0, -3.0, 0.0]);
        assert!((x[1] - (-0.5f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn jump_frequency_tracks_intensity() {
        let p = process(2.0);
        let mut g = InverseCumulativeGaussianRng::new(LecuyerUniformRng::new(42));
        let dt = 0.01;
        let mut jumps = 0;
        let n = 20_000;
        for _ in 0..n {
            let draws = [g.next_gaussian(), g.next_gaussian(), g.next_gaussian()];
            let x = p.evolve(0.0, &[3.0, 0.0], dt, &draws);
            if x[1] > 0.0 {
                jumps += 1;
            }
        }
        let observed = jumps as f64 / (n as f64 * dt);
        assert!(
            (observed - 2.0).abs() < 0.2,
            "observed intensity {observed}, expected 2.0"
        );
    }

    #[test]
    fn state_and_factor_counts() {
        let p = process(1.0);
        assert_eq!(p.size(), 2);
        assert_eq!(p.factors(), 3);
        assert_eq!(p.initial_values(), vec![3.0, 0.0]);
    }
}
