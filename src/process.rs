//! Stochastic process contracts.
//!
//! A process exposes its drift and diffusion, plus closed-form conditional
//! moments where they exist; `evolve` defaults to the locally Gaussian
//! step `expectation + std_deviation · ε` and is overridden by processes
//! with an exact transition law.

pub mod array;
pub mod ext_ou_jumps;
pub mod gbm;
pub mod geman_roncoroni;
pub mod heston;
pub mod ornstein_uhlenbeck;

pub use array::StochasticProcessArray;
pub use ext_ou_jumps::ExtOuWithJumps;
pub use gbm::{BlackScholesProcess, GeometricBrownianMotion};
pub use geman_roncoroni::GemanRoncoroni;
pub use heston::Heston;
pub use ornstein_uhlenbeck::OrnsteinUhlenbeck;

use crate::common::{Real, Time};

/// One-dimensional Itô process.
pub trait StochasticProcess1D {
    /// State at t = 0.
    fn x0(&self) -> Real;

    fn drift(&self, t: Time, x: Real) -> Real;

    fn diffusion(&self, t: Time, x: Real) -> Real;

    /// Conditional expectation of the state after `dt`. Euler by default.
    fn expectation(&self, t0: Time, x0: Real, dt: Time) -> Real {
        self.apply(x0, self.drift(t0, x0) * dt)
    }

    /// Conditional standard deviation after `dt`. Euler by default.
    fn std_deviation(&self, t0: Time, x0: Real, dt: Time) -> Real {
        self.diffusion(t0, x0) * dt.sqrt()
    }

    fn variance(&self, t0: Time, x0: Real, dt: Time) -> Real {
        let sd = self.std_deviation(t0, x0, dt);
        sd * sd
    }

    /// Advances the state by `dt` given a standard normal draw.
    fn evolve(&self, t0: Time, x0: Real, dt: Time, dw: Real) -> Real {
        self.expectation(t0, x0, dt) + self.std_deviation(t0, x0, dt) * dw
    }

    /// Applies a state-space increment; processes working in transformed
    /// coordinates override this.
    fn apply(&self, x0: Real, dx: Real) -> Real {
        x0 + dx
    }
}

/// Vector-valued process.
///
/// `factors` may exceed `size` when the transition law consumes auxiliary
/// draws (e.g. jump arrival and size).
pub trait StochasticProcess {
    fn size(&self) -> usize;

    fn factors(&self) -> usize {
        self.size()
    }

    fn initial_values(&self) -> Vec<Real>;

    fn drift(&self, t: Time, x: &[Real]) -> Vec<Real>;

    /// Advances the state by `dt` given `factors()` iid standard normal
    /// draws.
    fn evolve(&self, t0: Time, x0: &[Real], dt: Time, dw: &[Real]) -> Vec<Real>;
}
