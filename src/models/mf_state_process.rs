use crate::common::{Real, Time};
use crate::process::StochasticProcess1D;
use crate::{error::PricingResult, require};

/// Driving state of the Markov-functional model: a zero-drift Gaussian
/// process with piecewise-constant volatility σ(t) (right-continuous in
/// the step times) and mean reversion a entering through the e^{a·t}
/// scaling of the diffusion.
///
/// The conditional variance over [t₀, t₀+Δ] is
/// Σ σᵢ²·(e^{2a·tᵢ₊₁} − e^{2a·tᵢ})/(2a) over the sub-intervals, with the
/// flat-σ² limit at a = 0.
#[derive(Debug, Clone)]
pub struct MfStateProcess {
    reversion: Real,
    times: Vec<Time>,
    vols: Vec<Real>,
}

impl MfStateProcess {
    pub fn new(reversion: Real, times: Vec<Time>, vols: Vec<Real>) -> PricingResult<Self> {
        require!(
            vols.len() == times.len() + 1,
            "need one volatility per interval: {} times, {} vols",
            times.len(),
            vols.len()
        );
        require!(
            times.windows(2).all(|w| w[0] < w[1]),
            "volatility step times must be increasing"
        );
        require!(
            times.iter().all(|&t| t > 0.0),
            "volatility step times must be positive"
        );
        require!(
            vols.iter().all(|&v| v >= 0.0),
            "volatilities must be non-negative"
        );
        Ok(Self {
            reversion,
            times,
            vols,
        })
    }

    /// σ at time t; the step at a boundary belongs to the right interval.
    fn sigma(&self, t: Time) -> Real {
        let idx = self.times.partition_point(|&x| x <= t);
        self.vols[idx]
    }

    pub fn times(&self) -> &[Time] {
        &self.times
    }

    pub fn vols(&self) -> &[Real] {
        &self.vols
    }

    pub fn set_vols(&mut self, vols: Vec<Real>) -> PricingResult<()> {
        require!(
            vols.len() == self.vols.len(),
            "expected {} volatilities, got {}",
            self.vols.len(),
            vols.len()
        );
        self.vols = vols;
        Ok(())
    }

    /// ∫ σ(u)² e^{2au} du over one sub-interval.
    fn piece_variance(&self, sigma: Real, from: Time, to: Time) -> Real {
        if to <= from {
            return 0.0;
        }
        let a = self.reversion;
        if a.abs() < 1e-12 {
            sigma * sigma * (to - from)
        } else {
            sigma * sigma * ((2.0 * a * to).exp() - (2.0 * a * from).exp()) / (2.0 * a)
        }
    }
}

impl StochasticProcess1D for MfStateProcess {
    fn x0(&self) -> Real {
        0.0
    }

    fn drift(&self, _t: Time, _x: Real) -> Real {
        0.0
    }

    fn diffusion(&self, t: Time, _x: Real) -> Real {
        self.sigma(t) * (self.reversion * t).exp()
    }

    fn expectation(&self, _t0: Time, x0: Real, _dt: Time) -> Real {
        x0
    }

    fn std_deviation(&self, t0: Time, x0: Real, dt: Time) -> Real {
        self.variance(t0, x0, dt).sqrt()
    }

    fn variance(&self, t0: Time, _x0: Real, dt: Time) -> Real {
        let end = t0 + dt;
        let mut total = 0.0;
        let mut left = t0;
        for (i, &step) in self.times.iter().enumerate() {
            if step <= left {
                continue;
            }
            if step >= end {
                break;
            }
            total += self.piece_variance(self.vols[i], left, step);
            left = step;
        }
        total + self.piece_variance(self.sigma(left), left, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: Real = 1e-10;

    #[test]
    fn single_interval_variance_is_linear() {
        let p = MfStateProcess::new(0.0, vec![], vec![1.0]).unwrap();
        assert!((p.variance(0.0, 0.0, 1.0) - 1.0).abs() < TOL);
        assert!((p.variance(0.0, 0.0, 2.0) - 2.0).abs() < TOL);
    }

    #[test]
    fn piecewise_diffusion_is_right_continuous() {
        let p = MfStateProcess::new(0.0, vec![1.0, 2.0], vec![1.0, 2.0, 3.0]).unwrap();
        assert!((p.diffusion(0.0, 0.0) - 1.0).abs() < TOL);
        assert!((p.diffusion(0.99, 0.0) - 1.0).abs() < TOL);
        assert!((p.diffusion(1.0, 0.0) - 2.0).abs() < TOL);
        assert!((p.diffusion(1.9, 0.0) - 2.0).abs() < TOL);
        assert!((p.diffusion(2.0, 0.0) - 3.0).abs() < TOL);
        assert!((p.diffusion(5.0, 0.0) - 3.0).abs() < TOL);
    }

    #[test]
    fn piecewise_variance_accumulates() {
        let p = MfStateProcess::new(0.0, vec![1.0, 2.0], vec![1.0, 2.0, 3.0]).unwrap();
        assert!((p.variance(0.0, 0.0, 0.0) - 0.0).abs() < TOL);
        assert!((p.variance(0.0, 0.0, 0.5) - 0.5).abs() < TOL);
        assert!((p.variance(0.0, 0.0, 1.0) - 1.0).abs() < TOL);
        assert!((p.variance(0.0, 0.0, 1.5) - 3.0).abs() < TOL);
        assert!((p.variance(0.0, 0.0, 3.0) - 14.0).abs() < TOL);
        assert!((p.variance(0.0, 0.0, 5.0) - 32.0).abs() < TOL);
        assert!((p.variance(1.2, 0.0, 1.0) - 5.0).abs() < TOL);
    }

    #[test]
    fn reversion_weights_the_variance() {
        let p = MfStateProcess::new(0.01, vec![1.0, 2.0], vec![1.0, 2.0, 3.0]).unwrap();
        assert!((p.variance(0.0, 0.0, 0.5) - 0.502508354208).abs() < 1e-10);
        assert!((p.variance(0.0, 0.0, 1.0) - 1.01006700134).abs() < 1e-10);
        assert!((p.variance(0.0, 0.0, 1.5) - 3.06070578669).abs() < 1e-10);
        assert!((p.variance(0.0, 0.0, 3.0) - 14.5935513933).abs() < 1e-9);
        assert!((p.variance(0.0, 0.0, 5.0) - 34.0940185819).abs() < 1e-9);
        assert!((p.variance(1.2, 0.0, 1.0) - 5.18130257358).abs() < 1e-10);
    }

    #[test]
    fn martingale_expectation() {
        let p = MfStateProcess::new(0.02, vec![1.0], vec![0.01, 0.02]).unwrap();
        assert_eq!(p.expectation(0.5, 0.123, 2.0), 0.123);
        assert_eq!(p.drift(0.5, 0.123), 0.0);
    }
}
