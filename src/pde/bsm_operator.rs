use super::TridiagonalOperator;
use crate::common::{Real, Time};
use crate::{error::PricingResult, require};

/// Uniform log-spot grid with the current spot exactly on a node, wide
/// enough to keep boundary effects away from both spot and strike.
///
/// Returns the log-price nodes and the spacing.
pub fn bsm_log_grid(
    spot: Real,
    strike: Real,
    sigma: Real,
    maturity: Time,
    points: usize,
) -> PricingResult<(Vec<Real>, Real)> {
    require!(points >= 10, "grid needs at least 10 points, got {points}");
    require!(spot > 0.0 && strike > 0.0, "spot and strike must be positive");
    let center = spot.ln();
    let span = 4.0 * sigma * maturity.sqrt();
    let half_width = span.max(0.5 * (center - (0.2 * strike).ln()).abs()) + 0.5;
    let dx = 2.0 * half_width / (points - 1) as Real;
    let anchor = (points - 1) / 2;
    let grid = (0..points)
        .map(|i| center + (i as isize - anchor as isize) as Real * dx)
        .collect();
    Ok((grid, dx))
}

/// Black-Scholes generator on a uniform log-spot grid:
/// L = ½σ²∂ₓₓ + (r − q − σ²/2)∂ₓ − r.
#[derive(Debug, Clone, Copy)]
pub struct BsmOperator {
    pub sigma: Real,
    pub rate: Real,
    pub dividend: Real,
}

impl BsmOperator {
    pub fn new(sigma: Real, rate: Real, dividend: Real) -> PricingResult<Self> {
        require!(sigma > 0.0, "volatility ({sigma}) must be positive");
        Ok(Self {
            sigma,
            rate,
            dividend,
        })
    }

    pub fn build(&self, size: usize, dx: Real) -> PricingResult<TridiagonalOperator> {
        require!(dx > 0.0, "grid spacing must be positive");
        let sigma2 = self.sigma * self.sigma;
        let nu = self.rate - self.dividend - 0.5 * sigma2;
        let pd = 0.5 * sigma2 / (dx * dx) - 0.5 * nu / dx;
        let pm = -sigma2 / (dx * dx) - self.rate;
        let pu = 0.5 * sigma2 / (dx * dx) + 0.5 * nu / dx;
        TridiagonalOperator::new(vec![pd; size], vec![pm; size], vec![pu; size])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    #[test]
    fn grid_brackets_spot_and_strike() {
        let (grid, dx) = bsm_log_grid(100.0, 100.0, 0.3, 1.0, 100).unwrap();
        assert_eq!(grid.len(), 100);
        assert!(dx > 0.0);
        let s_min = grid[0].exp();
        let s_max = grid[99].exp();
        assert!(s_min < 100.0 && s_max > 100.0);
        assert!(s_min < 50.0 && s_max > 200.0);
    }

    #[test]
    fn operator_kills_the_discounted_forward()
    {
        // V(x) = e^x · e^{-q τ}-style payoffs are eigenfunctions: for
        // V = e^x, L V = (r − q − r)·V + ... more directly, check
        // L e^x = −q e^x when applied away from the boundary.
        let op = BsmOperator::new(0.2, 0.05, 0.01).unwrap();
        let dx = 0.01;
        let tri = op.build(200, dx).unwrap();
        let grid: Vec<Real> = (0..200).map(|i| i as Real * dx).collect();
        let values = Array1::from_iter(grid.iter().map(|&x| x.exp()));
        let image = tri.apply_to(&values);
        // Interior nodes only; discrete second difference of e^x carries
        // an O(dx²) error.
        for i in 50..150 {
            let expected = -0.01 * values[i];
            assert!(
                (image[i] - expected).abs() < 1e-4 * values[i],
                "node {i}: {} vs {}",
                image[i],
                expected
            );
        }
    }
}
