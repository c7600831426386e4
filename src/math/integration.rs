//! Quadrature rules used by the curve adapters and the calibration core.

use crate::{error::PricingResult, require};
use std::f64::consts::PI;

/// Composite trapezoidal rule with `n` intervals.
pub fn trapezoid<F: Fn(f64) -> f64>(f: F, a: f64, b: f64, n: usize) -> f64 {
    if n == 0 || a == b {
        return 0.0;
    }
    let h = (b - a) / n as f64;
    let mut sum = 0.5 * (f(a) + f(b));
    for i in 1..n {
        sum += f(a + i as f64 * h);
    }
    sum * h
}

/// Gauss-Hermite quadrature of order `n`.
///
/// Abscissae are the roots of the physicists' Hermite polynomial H_n,
/// found by Newton iteration on the normalized three-term recurrence;
/// weights follow from the derivative at the root. The rule integrates
/// ∫ e^(-x²) f(x) dx exactly for polynomials up to degree 2n-1.
#[derive(Debug, Clone)]
pub struct GaussHermite {
    abscissae: Vec<f64>,
    weights: Vec<f64>,
}

impl GaussHermite {
    pub fn new(n: usize) -> PricingResult<Self> {
        require!(n >= 2, "Gauss-Hermite order must be at least 2");

        let mut x = vec![0.0; n];
        let mut w = vec![0.0; n];
        let m = n.div_ceil(2);
        let pim4 = 1.0 / PI.powf(0.25);
        let nf = n as f64;

        let mut z = 0.0;
        for i in 0..m {
            z = match i {
                0 => (2.0 * nf + 1.0).sqrt() - 1.85575 * (2.0 * nf + 1.0).powf(-1.0 / 6.0),
                1 => z - 1.14 * nf.powf(0.426) / z,
                2 => 1.86 * z - 0.86 * x[0],
                3 => 1.91 * z - 0.91 * x[1],
                _ => 2.0 * z - x[i - 2],
            };
            let mut pp = 0.0;
            for _ in 0..100 {
                let mut p1 = pim4;
                let mut p2 = 0.0;
                for j in 1..=n {
                    let p3 = p2;
                    p2 = p1;
                    let jf = j as f64;
                    p1 = z * (2.0 / jf).sqrt() * p2 - ((jf - 1.0) / jf).sqrt() * p3;
                }
                pp = (2.0 * nf).sqrt() * p2;
                let dz = p1 / pp;
                z -= dz;
                if dz.abs() < 1e-14 {
                    break;
                }
            }
            x[i] = z;
            x[n - 1 - i] = -z;
            w[i] = 2.0 / (pp * pp);
            w[n - 1 - i] = w[i];
        }

        Ok(Self {
            abscissae: x,
            weights: w,
        })
    }

    pub fn abscissae(&self) -> &[f64] {
        &self.abscissae
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// ∫ e^(-x²) f(x) dx.
    pub fn integrate<F: FnMut(f64) -> f64>(&self, mut f: F) -> f64 {
        self.abscissae
            .iter()
            .zip(&self.weights)
            .map(|(&x, &w)| w * f(x))
            .sum()
    }

    /// E[f(Z)] for standard normal Z, by change of variable z = √2 x.
    pub fn gaussian_expectation<F: FnMut(f64) -> f64>(&self, mut f: F) -> f64 {
        self.integrate(|x| f(std::f64::consts::SQRT_2 * x)) / PI.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trapezoid_integrates_linear_exactly() {
        let v = trapezoid(|x| 2.0 * x + 1.0, 0.0, 2.0, 4);
        assert!((v - 6.0).abs() < 1e-14);
    }

    #[test]
    fn hermite_weights_sum_to_sqrt_pi() {
        for n in [4, 16, 32, 64] {
            let gh = GaussHermite::new(n).unwrap();
            let total: f64 = gh.weights().iter().sum();
            assert!((total - PI.sqrt()).abs() < 1e-10, "order {n}");
        }
    }

    #[test]
    fn gaussian_moments() {
        let gh = GaussHermite::new(32).unwrap();
        assert!(gh.gaussian_expectation(|z| z).abs() < 1e-12);
        assert!((gh.gaussian_expectation(|z| z * z) - 1.0).abs() < 1e-12);
        assert!((gh.gaussian_expectation(|z| z * z * z * z) - 3.0).abs() < 1e-10);
    }

    #[test]
    fn lognormal_mean() {
        // E[exp(σZ)] = exp(σ²/2)
        let gh = GaussHermite::new(32).unwrap();
        let sigma: f64 = 0.4;
        let v = gh.gaussian_expectation(|z| (sigma * z).exp());
        assert!((v - (0.5 * sigma * sigma).exp()).abs() < 1e-12);
    }
}
