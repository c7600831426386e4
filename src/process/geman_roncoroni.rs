use super::{ExtOuWithJumps, StochasticProcess};
use crate::common::{Real, Time};

/// Power-price dynamics in the Geman-Roncoroni spirit: the log price is a
/// deterministic seasonal component plus a mean-reverting diffusive
/// factor plus a spiky, fast-decaying jump factor.
///
///   ln S(t) = μ(t) + x(t) + y(t)
///
/// with (x, y) the [`ExtOuWithJumps`] pair. The state carries only the
/// stochastic factors; the seasonal shape enters through
/// [`Self::log_price`].
pub struct GemanRoncoroni {
    core: ExtOuWithJumps,
    seasonal: Box<dyn Fn(Time) -> Real>,
}

impl GemanRoncoroni {
    pub fn new(core: ExtOuWithJumps, seasonal: impl Fn(Time) -> Real + 'static) -> Self {
        Self {
            core,
            seasonal: Box::new(seasonal),
        }
    }

    pub fn seasonal(&self, t: Time) -> Real {
        (self.seasonal)(t)
    }

    /// ln S(t) for a simulated state.
    pub fn log_price(&self, t: Time, x: &[Real]) -> Real {
        self.seasonal(t) + self.core.total(x)
    }

    pub fn price(&self, t: Time, x: &[Real]) -> Real {
        self.log_price(t, x).exp()
    }
}

impl StochasticProcess for GemanRoncoroni {
    fn size(&self) -> usize {
        self.core.size()
    }

    fn factors(&self) -> usize {
        self.core.factors()
    }

    fn initial_values(&self) -> Vec<Real> {
        self.core.initial_values()
    }

    fn drift(&self, t: Time, x: &[Real]) -> Vec<Real> {
        self.core.drift(t, x)
    }

    fn evolve(&self, t0: Time, x0: &[Real], dt: Time, dw: &[Real]) -> Vec<Real> {
        self.core.evolve(t0, x0, dt, dw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::OrnsteinUhlenbeck;
    use std::f64::consts::PI;

    fn process() -> GemanRoncoroni {
        let ou = OrnsteinUhlenbeck::with_constant_level(0.0, 4.0, 0.5, 0.0).unwrap();
        let core = ExtOuWithJumps::new(ou, 0.0, 20.0, 8.0, 2.5).unwrap();
        GemanRoncoroni::new(core, |t| 3.0 + 0.3 * (2.0 * PI * t).cos())
    }

    #[test]
    fn seasonality_shapes_the_deterministic_price() {
        let p = process();
        let x0 = p.initial_values();
        // Winter peak vs spring trough of the seasonal shape.
        let winter = p.log_price(0.0, &x0);
        let spring = p.log_price(0.25, &x0);
        assert!((winter - 3.3).abs() < 1e-12);
        assert!((spring - 3.0).abs() < 1e-9);
        assert!(p.price(0.0, &x0) > p.price(0.25, &x0));
    }

    #[test]
    fn stochastic_factors_ride_on_the_seasonal() {
        let p = process();
        let x = p.evolve(0.0, &p.initial_values(), 1.0 / 365.0, &[0.0, -3.0, 0.0]);
        assert_eq!(x.len(), 2);
        assert!((p.log_price(0.5, &x) - (p.seasonal(0.5) + x[0] + x[1])).abs() < 1e-15);
    }
}
